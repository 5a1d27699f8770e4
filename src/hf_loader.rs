use crate::fetch::FetchError;
use hf_hub::{
    api::sync::{ApiBuilder, ApiError, ApiRepo},
    Repo, RepoType,
};
use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};

// See src/bin/model_fetcher_cli.rs for cli instructions.
// Files are fetched into the hub cache ("~/.cache/huggingface/hub/" by default) and then hard
// linked (or copied, across filesystems) into the destination directory.

pub const HF_BASE_URL: &str = "https://huggingface.co";

/// Fetches every file of one revision of a model into `dest`.
pub trait SnapshotFetcher {
    fn fetch_snapshot(
        &self,
        model_id: &str,
        dest: &Path,
        token: Option<&str>,
        revision: &str,
    ) -> Result<PathBuf, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HuggingFaceLoader {
    pub with_progress: bool,
}

impl Default for HuggingFaceLoader {
    fn default() -> Self {
        Self {
            with_progress: true,
        }
    }
}

impl HuggingFaceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, with_progress: bool) -> Self {
        self.with_progress = with_progress;
        self
    }

    fn repo(
        &self,
        model_id: &str,
        token: Option<&str>,
        revision: &str,
    ) -> Result<ApiRepo, ApiError> {
        let api = ApiBuilder::new()
            .with_progress(self.with_progress)
            .with_token(token.map(str::to_owned))
            .build()?;
        Ok(api.repo(Repo::with_revision(
            model_id.to_owned(),
            RepoType::Model,
            revision.to_owned(),
        )))
    }

    pub fn canonicalize_local_path(local_path: &Path) -> crate::Result<String> {
        Ok(local_path
            .canonicalize()
            .map_err(|e| crate::anyhow!(e))?
            .display()
            .to_string())
    }

    pub fn model_url_from_repo(repo_id: &str) -> String {
        format!("{}/{}", HF_BASE_URL, repo_id)
    }
}

impl SnapshotFetcher for HuggingFaceLoader {
    fn fetch_snapshot(
        &self,
        model_id: &str,
        dest: &Path,
        token: Option<&str>,
        revision: &str,
    ) -> Result<PathBuf, FetchError> {
        let repo = self
            .repo(model_id, token, revision)
            .map_err(|e| classify_api_error(model_id, e))?;
        let info = repo.info().map_err(|e| classify_api_error(model_id, e))?;
        tracing::debug!("{} has {} files at {}", model_id, info.siblings.len(), revision);

        for sibling in &info.siblings {
            let relative_path = checked_relative_path(&sibling.rfilename)?;
            let cached = repo
                .get(&sibling.rfilename)
                .map_err(|e| classify_api_error(model_id, e))?;
            materialize(&cached, &dest.join(relative_path))?;
        }
        Ok(dest.to_path_buf())
    }
}

/// Maps a hub failure onto the error kinds the CLI reports.
pub fn classify_api_error(model_id: &str, err: ApiError) -> FetchError {
    let kind = match &err {
        ApiError::RequestError(request_error) => match &**request_error {
            ureq::Error::Status(status, response) => {
                status_kind(*status, response.header(HF_ERROR_CODE_HEADER))
            }
            ureq::Error::Transport(_) => HubFailure::Other,
        },
        _ => HubFailure::Other,
    };
    match kind {
        HubFailure::NotFound => FetchError::NotFound(model_id.to_string()),
        HubFailure::AccessDenied => FetchError::AccessDenied(model_id.to_string()),
        HubFailure::Other => FetchError::Hub(err.to_string()),
    }
}

const HF_ERROR_CODE_HEADER: &str = "X-Error-Code";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HubFailure {
    NotFound,
    AccessDenied,
    Other,
}

// The hub answers 401 for missing repos when no token is sent. The error code header
// tells the two apart.
fn status_kind(status: u16, error_code: Option<&str>) -> HubFailure {
    match (status, error_code) {
        (_, Some("RepoNotFound" | "RevisionNotFound" | "EntryNotFound")) => HubFailure::NotFound,
        (_, Some("GatedRepo")) => HubFailure::AccessDenied,
        (404, _) => HubFailure::NotFound,
        (401 | 403, _) => HubFailure::AccessDenied,
        _ => HubFailure::Other,
    }
}

fn checked_relative_path(rfilename: &str) -> Result<&Path, FetchError> {
    let path = Path::new(rfilename);
    if path
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        Ok(path)
    } else {
        Err(FetchError::Hub(format!(
            "refusing to write repository file outside the destination: {}",
            rfilename
        )))
    }
}

/// Places the cached blob at `target`, hard linked when the filesystem allows it.
/// Anything already at `target` is replaced unless it is that very blob.
fn materialize(cached: &Path, target: &Path) -> Result<(), FetchError> {
    // The cache hands out symlinks into its blob store.
    let blob = fs::canonicalize(cached).map_err(|e| FetchError::io(cached, e))?;
    if is_same_file(&blob, target) {
        tracing::debug!("Up to date: {}", target.display());
        return Ok(());
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| FetchError::io(parent, e))?;
    }
    match fs::remove_file(target) {
        Ok(()) => (),
        Err(e) if e.kind() == io::ErrorKind::NotFound => (),
        Err(e) => return Err(FetchError::io(target, e)),
    }
    if let Err(e) = fs::hard_link(&blob, target) {
        tracing::debug!("Hard link failed ({}), copying {}", e, target.display());
        fs::copy(&blob, target).map_err(|e| FetchError::io(target, e))?;
    }
    tracing::debug!("Wrote {}", target.display());
    Ok(())
}

#[cfg(unix)]
fn is_same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_same_file(_a: &Path, _b: &Path) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(raw_response: &str) -> ApiError {
        let response: ureq::Response = raw_response.parse().unwrap();
        let status = response.status();
        ApiError::RequestError(Box::new(ureq::Error::Status(status, response)))
    }

    #[test]
    fn classifies_http_status() {
        let classify = |raw: &str| classify_api_error("org/x", status_error(raw));
        assert!(matches!(
            classify("HTTP/1.1 404 Not Found\r\n\r\n"),
            FetchError::NotFound(id) if id == "org/x"
        ));
        assert!(matches!(
            classify("HTTP/1.1 401 Unauthorized\r\n\r\n"),
            FetchError::AccessDenied(_)
        ));
        assert!(matches!(
            classify("HTTP/1.1 403 Forbidden\r\n\r\n"),
            FetchError::AccessDenied(_)
        ));
        assert!(matches!(
            classify("HTTP/1.1 500 Internal Server Error\r\n\r\n"),
            FetchError::Hub(_)
        ));
    }

    #[test]
    fn error_code_header_refines_status() {
        let classify = |raw: &str| classify_api_error("org/x", status_error(raw));
        assert!(matches!(
            classify("HTTP/1.1 401 Unauthorized\r\nX-Error-Code: RepoNotFound\r\n\r\n"),
            FetchError::NotFound(_)
        ));
        assert!(matches!(
            classify("HTTP/1.1 403 Forbidden\r\nX-Error-Code: GatedRepo\r\n\r\n"),
            FetchError::AccessDenied(_)
        ));
        assert_eq!(status_kind(404, Some("RevisionNotFound")), HubFailure::NotFound);
    }

    #[test]
    fn non_status_errors_are_generic() {
        let err = ApiError::IoError(io::Error::other("disk on fire"));
        match classify_api_error("org/x", err) {
            FetchError::Hub(message) => assert!(message.contains("disk on fire")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_escaping_paths() {
        assert!(checked_relative_path("config.json").is_ok());
        assert!(checked_relative_path("onnx/model.onnx").is_ok());
        assert!(checked_relative_path("../outside").is_err());
        assert!(checked_relative_path("/etc/passwd").is_err());
        assert!(checked_relative_path("a/./b").is_ok());
    }

    #[test]
    fn materialize_places_cached_file() {
        let dir = tempfile::tempdir().unwrap();
        let cached = dir.path().join("blob");
        fs::write(&cached, b"weights").unwrap();
        let target = dir.path().join("dest").join("nested").join("model.bin");

        materialize(&cached, &target).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"weights");
        // Second run is a no-op.
        materialize(&cached, &target).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"weights");
    }

    #[test]
    fn stale_file_of_same_size_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let cached = dir.path().join("blob");
        fs::write(&cached, br#"{"a":2}"#).unwrap();
        let target = dir.path().join("dest").join("config.json");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, br#"{"a":1}"#).unwrap();

        materialize(&cached, &target).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), r#"{"a":2}"#);
    }

    #[test]
    fn stale_file_of_other_size_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let cached = dir.path().join("blob");
        fs::write(&cached, b"weights").unwrap();
        let target = dir.path().join("model.bin");
        fs::write(&target, b"w").unwrap();

        materialize(&cached, &target).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"weights");
    }

    #[cfg(unix)]
    #[test]
    fn materialize_links_through_cache_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let blob = dir.path().join("blobs").join("abc123");
        fs::create_dir_all(blob.parent().unwrap()).unwrap();
        fs::write(&blob, b"shard").unwrap();
        let cached = dir.path().join("snapshot-model.bin");
        std::os::unix::fs::symlink(&blob, &cached).unwrap();
        let target = dir.path().join("dest").join("model.bin");

        materialize(&cached, &target).unwrap();
        assert!(fs::symlink_metadata(&target).unwrap().file_type().is_file());
        assert!(is_same_file(&blob, &target));
        assert_eq!(fs::read(&target).unwrap(), b"shard");
    }

    #[test]
    fn progress_is_configurable() {
        assert!(HuggingFaceLoader::new().with_progress);
        assert!(!HuggingFaceLoader::new().with_progress(false).with_progress);
    }

    #[test]
    fn model_url() {
        assert_eq!(
            HuggingFaceLoader::model_url_from_repo("org/model"),
            "https://huggingface.co/org/model"
        );
    }
}
