//! Where the provider API key comes from.
//!
//! Sources are consulted in order: a key file saved by the user, an external
//! key command (a password manager or similar), and finally the environment.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

pub const KEY_PREFIX: &str = "AIza";
pub const KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];
const APP_DIR: &str = "emotion-council";
const KEY_FILE_NAME: &str = "gemini_api_key";

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("no API key found (tried {tried})")]
    NotFound { tried: String },
    #[error("API key must start with \"AIza\"")]
    InvalidFormat,
    #[error("key command `{command}` failed: {message}")]
    Command { command: String, message: String },
    #[error("key file error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait CredentialSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` means this source has nothing to offer, not that it failed.
    async fn load(&self) -> Result<Option<SecretString>, CredentialError>;
}

fn non_empty(raw: &str) -> Option<SecretString> {
    let key = raw.trim();
    (!key.is_empty()).then(|| SecretString::from(key.to_string()))
}

/// A single file holding the key, written by `key set`.
#[derive(Debug, Clone)]
pub struct KeyFile {
    path: PathBuf,
}

impl KeyFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_CONFIG_HOME/emotion-council/gemini_api_key`, falling back to
    /// `$HOME/.config/...`.
    pub fn default_path(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
        let base = lookup("XDG_CONFIG_HOME")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                lookup("HOME")
                    .filter(|dir| !dir.is_empty())
                    .map(|home| Path::new(&home).join(".config"))
            })?;
        Some(base.join(APP_DIR).join(KEY_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn save(&self, key: &str) -> Result<(), CredentialError> {
        let key = key.trim();
        if !key.starts_with(KEY_PREFIX) {
            return Err(CredentialError::InvalidFormat);
        }
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        // Owner-only from the first byte; `mode` only applies to new files.
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&self.path).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600)).await?;
        }
        file.write_all(key.as_bytes()).await?;
        file.flush().await?;
        tracing::info!(path = %self.path.display(), "API key saved");
        Ok(())
    }

    /// Returns whether a key was actually removed.
    pub async fn clear(&self) -> Result<bool, CredentialError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "API key removed");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CredentialSource for KeyFile {
    fn name(&self) -> &'static str {
        "key file"
    }

    async fn load(&self) -> Result<Option<SecretString>, CredentialError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(non_empty(&contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Runs a command and takes the first line of its stdout as the key.
#[derive(Debug, Clone)]
pub struct KeyCommand {
    program: String,
    args: Vec<String>,
}

impl KeyCommand {
    /// Splits on whitespace; no shell quoting is interpreted.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut words = command_line.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl CredentialSource for KeyCommand {
    fn name(&self) -> &'static str {
        "key command"
    }

    async fn load(&self) -> Result<Option<SecretString>, CredentialError> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CredentialError::Command {
                command: self.display(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(CredentialError::Command {
                command: self.display(),
                message: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().and_then(non_empty))
    }
}

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// `GEMINI_API_KEY`, then `API_KEY`.
#[derive(Clone)]
pub struct EnvKey {
    lookup: Lookup,
}

impl EnvKey {
    pub fn from_env() -> Self {
        Self::with_lookup(|name| std::env::var(name).ok())
    }

    pub fn with_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            lookup: Arc::new(lookup),
        }
    }
}

#[async_trait]
impl CredentialSource for EnvKey {
    fn name(&self) -> &'static str {
        "environment"
    }

    async fn load(&self) -> Result<Option<SecretString>, CredentialError> {
        Ok(KEY_ENV_VARS
            .into_iter()
            .find_map(|var| (self.lookup)(var).as_deref().and_then(non_empty)))
    }
}

#[derive(Default)]
pub struct CredentialResolver {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl CredentialResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl CredentialSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// First key any source produces. A failing source is logged and skipped.
    pub async fn resolve(&self) -> Result<SecretString, CredentialError> {
        self.find()
            .await
            .map(|(_, key)| key)
            .ok_or_else(|| CredentialError::NotFound {
                tried: self.tried(),
            })
    }

    /// Name of the source that would answer right now, if any.
    pub async fn status(&self) -> Option<&'static str> {
        self.find().await.map(|(name, _)| name)
    }

    async fn find(&self) -> Option<(&'static str, SecretString)> {
        for source in &self.sources {
            match source.load().await {
                Ok(Some(key)) if !key.expose_secret().is_empty() => {
                    tracing::debug!(source = source.name(), "API key resolved");
                    return Some((source.name(), key));
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(source = source.name(), "skipping credential source: {}", e),
            }
        }
        None
    }

    fn tried(&self) -> String {
        self.sources
            .iter()
            .map(|source| source.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
