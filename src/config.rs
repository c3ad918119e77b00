use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::Deserialize;

use crate::error::ChebiError;

pub const DOWNLOAD_DIR_ENV: &str = "LIBCHEBI_DOWNLOAD_DIR";
pub const BUCKET_ENV: &str = "LIBCHEBI_BUCKET";
pub const BUCKET_PREFIX_ENV: &str = "LIBCHEBI_BUCKET_PREFIX";
pub const BUCKET_TOKEN_ENV: &str = "LIBCHEBI_BUCKET_TOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    File,
    Bucket,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChebiConfig {
    #[serde(default)]
    pub download_dir: Option<Utf8PathBuf>,
    #[serde(default = "default_auto_update")]
    pub auto_update: bool,
    #[serde(default = "default_backend")]
    pub backend: Backend,
    #[serde(default)]
    pub bucket: Option<BucketConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketConfig {
    pub name: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub token: Option<String>,
}

fn default_auto_update() -> bool {
    true
}

fn default_backend() -> Backend {
    Backend::File
}

impl Default for ChebiConfig {
    fn default() -> Self {
        Self {
            download_dir: None,
            auto_update: true,
            backend: Backend::File,
            bucket: None,
        }
    }
}

impl ChebiConfig {
    /// Configuration resolved from the environment. `LIBCHEBI_BUCKET` flips
    /// the backend to object storage.
    pub fn from_env() -> Self {
        let download_dir = std::env::var(DOWNLOAD_DIR_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(Utf8PathBuf::from);
        let bucket = std::env::var(BUCKET_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(|name| BucketConfig {
                name,
                prefix: std::env::var(BUCKET_PREFIX_ENV)
                    .unwrap_or_default()
                    .trim_matches('/')
                    .to_string(),
                token: std::env::var(BUCKET_TOKEN_ENV).ok(),
            });
        Self {
            download_dir,
            auto_update: true,
            backend: if bucket.is_some() {
                Backend::Bucket
            } else {
                Backend::File
            },
            bucket,
        }
    }

    pub fn with_download_dir(mut self, dir: Utf8PathBuf) -> Self {
        self.download_dir = Some(dir);
        self
    }

    pub fn with_auto_update(mut self, auto_update: bool) -> Self {
        self.auto_update = auto_update;
        self
    }

    /// Preference order: explicit path, then environment, then `~/libChEBI`.
    pub fn resolve_download_dir(&self) -> Result<Utf8PathBuf, ChebiError> {
        if let Some(dir) = &self.download_dir {
            return Ok(dir.clone());
        }
        BaseDirs::new()
            .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.home_dir().join("libChEBI")).ok())
            .ok_or_else(|| ChebiError::Config("unable to resolve download directory".to_string()))
    }
}
