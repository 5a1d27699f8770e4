use std::{fmt, path::PathBuf};

pub const DEFAULT_TOKEN_ENV_VAR: &str = "HF_TOKEN";
pub const DEFAULT_DOTENV_FILE: &str = ".env";
pub const TOKEN_SETTINGS_URL: &str = "https://huggingface.co/settings/tokens";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    CommandLine,
    Environment,
    DotenvFile,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::CommandLine => write!(f, "command line argument"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::DotenvFile => write!(f, ".env file"),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    source: CredentialSource,
}

impl Credential {
    pub fn new(token: &str, source: CredentialSource) -> Self {
        Self {
            token: token.to_string(),
            source,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Finds a hub token: command line first, then the environment, then a dotenv file.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    pub env_var: String,
    pub dotenv_path: PathBuf,
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self {
            env_var: DEFAULT_TOKEN_ENV_VAR.to_string(),
            dotenv_path: PathBuf::from(DEFAULT_DOTENV_FILE),
        }
    }
}

impl CredentialResolver {
    pub fn new(env_var: &str, dotenv_path: impl Into<PathBuf>) -> Self {
        Self {
            env_var: env_var.to_string(),
            dotenv_path: dotenv_path.into(),
        }
    }

    pub fn resolve(&self, cli_token: Option<&str>) -> Option<Credential> {
        let credential = self.find(cli_token);
        match &credential {
            Some(credential) => {
                tracing::info!("Using {} from {}", self.env_var, credential.source())
            }
            None => {
                tracing::warn!("No {} found in environment or .env file", self.env_var);
                tracing::warn!(
                    "Some models may require authentication. Get a token at: {}",
                    TOKEN_SETTINGS_URL
                );
            }
        }
        credential
    }

    fn find(&self, cli_token: Option<&str>) -> Option<Credential> {
        if let Some(token) = cli_token.filter(|t| !t.is_empty()) {
            return Some(Credential::new(token, CredentialSource::CommandLine));
        }
        if let Ok(token) = std::env::var(&self.env_var) {
            if !token.is_empty() {
                return Some(Credential::new(&token, CredentialSource::Environment));
            }
        }
        self.token_from_dotenv()
            .map(|token| Credential::new(&token, CredentialSource::DotenvFile))
    }

    // Reads the file without loading it into the process environment.
    fn token_from_dotenv(&self) -> Option<String> {
        let entries = match dotenv::from_path_iter(&self.dotenv_path) {
            Ok(entries) => entries,
            Err(_) => return None,
        };
        tracing::debug!("Looking for {} in {}", self.env_var, self.dotenv_path.display());
        for entry in entries {
            match entry {
                Ok((key, value)) if key == self.env_var && !value.is_empty() => {
                    return Some(value)
                }
                Ok(_) => continue,
                Err(e) => tracing::debug!("Skipping unparsable .env line: {}", e),
            }
        }
        None
    }
}
