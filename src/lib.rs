pub mod cli;
pub mod credentials;
pub mod fetch;
pub mod hf_loader;
pub mod logging;
pub mod summary;

pub(crate) use anyhow::{anyhow, bail, Result};

pub use credentials::{Credential, CredentialResolver, CredentialSource};
pub use fetch::{fetch_model, sanitize_model_id, FetchError, FetchOutcome, FetchRequest};
pub use hf_loader::{HuggingFaceLoader, SnapshotFetcher};
pub use logging::LogConfig;
pub use summary::{FetchSummary, SampleFile};
