use crate::{
    credentials::CredentialResolver,
    fetch::{fetch_model, FetchOutcome, FetchRequest, DEFAULT_REVISION},
    hf_loader::{HuggingFaceLoader, SnapshotFetcher},
};
use anyhow::Context;
use clap::{builder::NonEmptyStringValueParser, value_parser, Arg, ArgAction, ArgMatches, Command};
use std::{
    io::{self, Write},
    path::PathBuf,
};
use tracing::Dispatch;

pub const DEFAULT_DOWNLOAD_DIR: &str = "./models";
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_INTERRUPTED: u8 = 130;

const EXAMPLES: &str = "Examples:
  model_fetcher_cli microsoft/DialoGPT-medium
  model_fetcher_cli RedHatAI/Magistral-Small-2506-FP8 --download-dir ./my-models
  model_fetcher_cli microsoft/DialoGPT-medium --revision v1.0";

pub fn command() -> Command {
    Command::new("model_fetcher_cli")
        .version(clap::crate_version!())
        .about("Download models from Hugging Face Hub")
        .after_help(EXAMPLES)
        .arg(
            Arg::new("model_id")
                .help("Hugging Face model ID (e.g., 'microsoft/DialoGPT-medium')")
                .required(true)
                .value_parser(NonEmptyStringValueParser::new()),
        )
        .arg(
            Arg::new("download_dir")
                .help("Directory to download the model to")
                .long("download-dir")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_DOWNLOAD_DIR),
        )
        .arg(
            Arg::new("revision")
                .help("Model revision/branch to download")
                .long("revision")
                .default_value(DEFAULT_REVISION),
        )
        .arg(
            Arg::new("token")
                .help("Hugging Face token (overrides environment and .env file)")
                .long("token")
                .required(false),
        )
        .arg(
            Arg::new("verbose")
                .help("Enable verbose logging")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue),
        )
}

#[derive(Clone)]
pub struct FetchArgs {
    pub model_id: String,
    pub download_dir: PathBuf,
    pub revision: String,
    pub token: Option<String>,
    pub verbose: bool,
}

impl FetchArgs {
    pub fn from_matches(matches: &ArgMatches) -> crate::Result<Self> {
        let model_id = matches
            .get_one::<String>("model_id")
            .ok_or_else(|| crate::anyhow!("model_id is required"))?;
        let download_dir = matches
            .get_one::<PathBuf>("download_dir")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR));
        let revision = matches
            .get_one::<String>("revision")
            .map(String::as_str)
            .unwrap_or(DEFAULT_REVISION);
        Ok(Self {
            model_id: model_id.to_owned(),
            download_dir,
            revision: revision.to_owned(),
            token: matches.get_one::<String>("token").map(|token| token.to_owned()),
            verbose: matches.get_flag("verbose"),
        })
    }
}

/// Runs one download and returns the process exit code.
pub fn run<F: SnapshotFetcher + ?Sized>(
    args: &FetchArgs,
    resolver: &CredentialResolver,
    fetcher: &F,
) -> u8 {
    let request = match build_request(args, resolver) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!("Unexpected error: {:#}", e);
            return EXIT_FAILURE;
        }
    };

    match fetch_model(&request, fetcher) {
        Ok(outcome) => {
            if let Err(e) = write_banner(&mut io::stdout().lock(), &request, &outcome) {
                tracing::warn!("Could not print download banner: {}", e);
            }
            EXIT_SUCCESS
        }
        Err(e) => {
            e.report();
            EXIT_FAILURE
        }
    }
}

fn build_request(args: &FetchArgs, resolver: &CredentialResolver) -> crate::Result<FetchRequest> {
    let credential = resolver.resolve(args.token.as_deref());
    let download_dir = std::path::absolute(&args.download_dir)
        .with_context(|| format!("invalid download directory {}", args.download_dir.display()))?;
    FetchRequest::new(
        &args.model_id,
        download_dir,
        Some(&args.revision),
        credential,
    )
}

pub fn write_banner(
    out: &mut impl Write,
    request: &FetchRequest,
    outcome: &FetchOutcome,
) -> io::Result<()> {
    let rule = "=".repeat(60);
    let downloaded_to = HuggingFaceLoader::canonicalize_local_path(&outcome.downloaded_path)
        .unwrap_or_else(|_| outcome.downloaded_path.display().to_string());
    writeln!(out)?;
    writeln!(out, "{}", rule)?;
    writeln!(out, "MODEL DOWNLOAD COMPLETED SUCCESSFULLY!")?;
    writeln!(out, "{}", rule)?;
    writeln!(out, "Model ID: {}", request.model_id())?;
    writeln!(out, "Downloaded to: {}", downloaded_to)?;
    writeln!(out, "Download directory: {}", request.target_dir().display())?;
    writeln!(
        out,
        "Model page: {}",
        HuggingFaceLoader::model_url_from_repo(request.model_id())
    )?;
    writeln!(out, "{}", rule)
}

/// Ctrl-C logs through `dispatch` and exits with [`EXIT_INTERRUPTED`].
pub fn install_interrupt_handler(dispatch: &Dispatch) -> crate::Result<()> {
    let dispatch = dispatch.clone();
    ctrlc::set_handler(move || {
        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!("Download interrupted by user")
        });
        std::process::exit(i32::from(EXIT_INTERRUPTED));
    })
    .context("failed to install Ctrl-C handler")
}
