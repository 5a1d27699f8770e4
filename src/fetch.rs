use crate::{
    credentials::{Credential, TOKEN_SETTINGS_URL},
    hf_loader::SnapshotFetcher,
    summary::FetchSummary,
};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_REVISION: &str = "main";
pub const MODEL_SEARCH_URL: &str = "https://huggingface.co/models";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Model '{0}' not found. Please check the model ID.")]
    NotFound(String),
    #[error("Access denied to model '{0}'.")]
    AccessDenied(String),
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error downloading model: {0}")]
    Hub(String),
}

impl FetchError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Logs the error along with what the user can do about it.
    pub fn report(&self) {
        tracing::error!("{}", self);
        match self {
            FetchError::NotFound(_) => {
                tracing::error!("You can search for models at: {}", MODEL_SEARCH_URL)
            }
            FetchError::AccessDenied(_) => {
                tracing::error!("This model might be private. You may need a HuggingFace token.");
                tracing::error!("Get a token at: {}", TOKEN_SETTINGS_URL);
            }
            FetchError::Io { .. } | FetchError::Hub(_) => (),
        }
    }
}

/// Replaces path separators so the identifier names a single directory.
pub fn sanitize_model_id(model_id: &str) -> String {
    model_id.replace(['/', '\\'], "_")
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    model_id: String,
    target_dir: PathBuf,
    revision: String,
    credential: Option<Credential>,
}

impl FetchRequest {
    pub fn new(
        model_id: &str,
        target_dir: impl Into<PathBuf>,
        revision: Option<&str>,
        credential: Option<Credential>,
    ) -> crate::Result<Self> {
        let model_id = model_id.trim();
        if model_id.is_empty() {
            crate::bail!("model identifier must not be empty")
        }
        Ok(Self {
            model_id: model_id.to_string(),
            target_dir: target_dir.into(),
            revision: revision.unwrap_or(DEFAULT_REVISION).to_string(),
            credential,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn model_path(&self) -> PathBuf {
        self.target_dir.join(sanitize_model_id(&self.model_id))
    }
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub downloaded_path: PathBuf,
    pub summary: FetchSummary,
}

pub fn fetch_model<F: SnapshotFetcher + ?Sized>(
    request: &FetchRequest,
    fetcher: &F,
) -> Result<FetchOutcome, FetchError> {
    tracing::info!("Starting download of model: {}", request.model_id());
    tracing::info!("Target directory: {}", request.target_dir().display());
    tracing::info!("Revision: {}", request.revision());

    let model_path = request.model_path();
    std::fs::create_dir_all(&model_path).map_err(|e| FetchError::io(&model_path, e))?;
    tracing::debug!("Prepared {}", model_path.display());

    let downloaded_path = fetcher.fetch_snapshot(
        request.model_id(),
        &model_path,
        request.credential().map(Credential::token),
        request.revision(),
    )?;
    tracing::info!("Successfully downloaded to: {}", downloaded_path.display());

    let summary = FetchSummary::from_dir(&downloaded_path, &model_path)
        .map_err(|e| FetchError::io(&model_path, e))?;
    summary.log();

    Ok(FetchOutcome {
        downloaded_path,
        summary,
    })
}
