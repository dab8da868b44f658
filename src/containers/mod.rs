pub mod mappable_collection;
pub mod pileup;
pub mod read_map;

pub use mappable_collection::MappableCollection;
pub use pileup::ReadPileup;
pub use read_map::{ReadMap, SampleId};
