use std::io::stdout;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use log::error;

use octopus::cli::{Cli, Command};
use octopus::errors::Error;
use octopus::io::reads::ReadReader;
use octopus::processing::{self, PipelineConfig};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Some(Command::ShellCompletion { shell }) = cli.command {
        let mut command = Cli::command();
        let name = command.get_name().to_string();
        generate(shell, &mut command, name, &mut stdout());
        return ExitCode::SUCCESS;
    }

    if cli.threads > 0 {
        if let Err(err) = rayon::ThreadPoolBuilder::new().num_threads(cli.threads).build_global() {
            error!("failed to configure thread pool: {err}");
            return ExitCode::FAILURE;
        }
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("octopus failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> octopus::Result<()> {
    let reference_path = cli.reference.clone().ok_or_else(|| Error::Config("--reference is required".to_string()))?;
    let output_path = cli.output.clone().ok_or_else(|| Error::Config("--output is required".to_string()))?;

    let read_reader = ReadReader::from_paths(&cli.reads)?;
    let samples_from_reads = read_reader.sample_names();
    let caller_config = cli.build_caller_config(&samples_from_reads)?;

    let config = PipelineConfig {
        reference_path,
        read_paths: cli.reads.clone(),
        output_path,
        as_bcf: cli.bcf,
        candidate_config: Default::default(),
        max_included: cli.max_included,
        indicator_policy: cli.indicator_policy.into(),
        extension_policy: cli.extension_policy.into(),
        max_haplotypes: caller_config.max_haplotypes,
        phaser: octopus::phasing::PhaserConfig { min_phase_score: caller_config.min_phase_score, ..Default::default() },
        refcall_type: caller_config.refcall_type,
        call_sites_only: caller_config.call_sites_only,
        caller_config,
    };

    processing::run(&config)
}
