use std::{
  ffi::{OsStr, OsString},
  path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::debug;

/// Environment variable selecting the directory all volumes are created under.
pub const PATH_VAR: &str = "PROVISIONER_PATH";

/// Environment variable overriding the provisioner name.
pub const NAME_VAR: &str = "PROVISIONER_NAME";

pub const DEFAULT_BASE_PATH: &str = "/persistentvolumes";

pub const DEFAULT_NAME: &str = "cluster.local/hostpath-provisioner";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
  #[error("PROVISIONER_PATH must be an absolute path, got {}", .0.display())]
  RelativeBasePath(PathBuf),

  #[error("PROVISIONER_NAME is not valid unicode: {0:?}")]
  InvalidName(OsString),
}

/// Process-wide provisioner settings. Built once at startup and shared by
/// reference; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  base_path: PathBuf,
  name: String,
}

impl Config {
  pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
    let base_path = base_path.into();
    if !base_path.is_absolute() {
      return Err(ConfigError::RelativeBasePath(base_path));
    }

    Ok(Config {
      base_path,
      name: DEFAULT_NAME.to_owned(),
    })
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  /// Reads [`PATH_VAR`] and [`NAME_VAR`] from the process environment.
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_vars(std::env::vars_os())
  }

  /// Like [`Config::from_env`], over an arbitrary set of variables. Unset and
  /// empty variables fall back to their defaults.
  pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
  where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: Into<OsString>,
  {
    let mut base_path = None;
    let mut name = None;

    for (k, v) in vars {
      let v = v.into();
      if v.is_empty() {
        continue;
      }

      match k.as_ref().to_str() {
        Some(PATH_VAR) => base_path = Some(PathBuf::from(v)),
        Some(NAME_VAR) => name = Some(v.into_string().map_err(ConfigError::InvalidName)?),
        _ => (),
      }
    }

    let config = Config::new(base_path.unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_PATH)))?
      .with_name(name.unwrap_or_else(|| DEFAULT_NAME.to_owned()));

    debug!(?config, "loaded provisioner configuration");
    Ok(config)
  }

  /// Directory every volume lives under.
  #[inline]
  pub fn base_path(&self) -> &Path {
    &self.base_path
  }

  #[inline]
  pub fn name(&self) -> &str {
    &self.name
  }
}
