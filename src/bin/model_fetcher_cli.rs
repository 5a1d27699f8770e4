use anyhow::Result;
use model_fetcher::{
    cli::{self, FetchArgs},
    credentials::CredentialResolver,
    hf_loader::HuggingFaceLoader,
    logging::LogConfig,
};
use std::{io::IsTerminal, process::ExitCode};

// cargo run --bin model_fetcher_cli -- microsoft/DialoGPT-medium --download-dir ./my-models --verbose

pub fn main() -> Result<ExitCode> {
    let args = FetchArgs::from_matches(&cli::command().get_matches())?;

    let dispatch = LogConfig::new(args.verbose).dispatch();
    cli::install_interrupt_handler(&dispatch)?;

    let code = tracing::dispatcher::with_default(&dispatch, || {
        cli::run(
            &args,
            &CredentialResolver::default(),
            &HuggingFaceLoader::new().with_progress(std::io::stderr().is_terminal()),
        )
    });
    Ok(ExitCode::from(code))
}
