use crate::error::{required, ObjectError};
use k8s_openapi::api::storage::v1::StorageClass as KubeStorageClass;
use std::{collections::BTreeMap, convert::TryFrom, fmt, str::FromStr};

pub const SUB_PATH: &str = "subPath";
pub const NAMING_STRATEGY: &str = "namingStrategy";
pub const ON_DELETE: &str = "onDelete";

/// What happens to a volume once its claim is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReclaimPolicy {
  Retain,
  Delete,
  Recycle,
}

impl Default for ReclaimPolicy {
  /// Kubernetes defaults dynamically provisioned volumes to `Delete`.
  #[inline]
  fn default() -> Self {
    ReclaimPolicy::Delete
  }
}

impl ReclaimPolicy {
  pub fn as_str(&self) -> &'static str {
    match self {
      ReclaimPolicy::Retain => "Retain",
      ReclaimPolicy::Delete => "Delete",
      ReclaimPolicy::Recycle => "Recycle",
    }
  }
}

impl fmt::Display for ReclaimPolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ReclaimPolicy {
  type Err = ObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(match s {
      "Retain" => ReclaimPolicy::Retain,
      "Delete" => ReclaimPolicy::Delete,
      "Recycle" => ReclaimPolicy::Recycle,
      other => return Err(ObjectError::invalid("reclaimPolicy", other)),
    })
  }
}

/// How volume directories are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamingStrategy {
  /// `<namespace>-<claim>`. A re-created claim gets the same directory back.
  Static,
  /// `<namespace>-<claim>-<uid>`. Every claim instance gets its own directory.
  Unique,
}

impl NamingStrategy {
  /// `"static"` selects [`NamingStrategy::Static`]; anything else, including
  /// an absent parameter, selects [`NamingStrategy::Unique`].
  pub fn from_parameter(value: Option<&str>) -> Self {
    match value {
      Some("static") => NamingStrategy::Static,
      _ => NamingStrategy::Unique,
    }
  }
}

/// What the provisioner does with a directory when its volume is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeletePolicy {
  /// Remove the directory tree.
  Delete,
  /// Move the directory to `<base>/<volume>-archived`.
  Archive,
  /// Leave the directory where it is.
  Retain,
}

impl DeletePolicy {
  /// `"delete"` and `"archive"` select their variants; anything else,
  /// including an absent parameter, keeps the data.
  pub fn from_parameter(value: Option<&str>) -> Self {
    match value {
      Some("delete") => DeletePolicy::Delete,
      Some("archive") => DeletePolicy::Archive,
      _ => DeletePolicy::Retain,
    }
  }
}

/// The opaque `parameters` map of a storage class, with typed accessors for
/// the keys this provisioner understands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters(BTreeMap<String, String>);

impl Parameters {
  #[inline]
  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.get(key).map(String::as_str)
  }

  /// Directory below the base path that holds this class's volumes.
  #[inline]
  pub fn sub_path(&self) -> Option<&str> {
    self.get(SUB_PATH)
  }

  #[inline]
  pub fn naming_strategy(&self) -> NamingStrategy {
    NamingStrategy::from_parameter(self.get(NAMING_STRATEGY))
  }

  #[inline]
  pub fn delete_policy(&self) -> DeletePolicy {
    DeletePolicy::from_parameter(self.get(ON_DELETE))
  }
}

impl AsRef<BTreeMap<String, String>> for Parameters {
  #[inline]
  fn as_ref(&self) -> &BTreeMap<String, String> {
    &self.0
  }
}

impl From<BTreeMap<String, String>> for Parameters {
  #[inline]
  fn from(v: BTreeMap<String, String>) -> Self {
    Parameters(v)
  }
}

impl<K: Into<String>, V: Into<String>> std::iter::FromIterator<(K, V)> for Parameters {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Parameters(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageClass {
  name: String,
  parameters: Parameters,
  reclaim_policy: ReclaimPolicy,
  mount_options: Vec<String>,
}

impl StorageClass {
  pub fn new(name: impl Into<String>, parameters: Parameters) -> Self {
    StorageClass {
      name: name.into(),
      parameters,
      reclaim_policy: ReclaimPolicy::default(),
      mount_options: Vec::new(),
    }
  }

  pub fn with_reclaim_policy(mut self, reclaim_policy: ReclaimPolicy) -> Self {
    self.reclaim_policy = reclaim_policy;
    self
  }

  pub fn with_mount_options<I>(mut self, mount_options: I) -> Self
  where
    I: IntoIterator,
    I::Item: Into<String>,
  {
    self.mount_options = mount_options.into_iter().map(Into::into).collect();
    self
  }

  #[inline]
  pub fn name(&self) -> &str {
    &self.name
  }

  #[inline]
  pub fn parameters(&self) -> &Parameters {
    &self.parameters
  }

  #[inline]
  pub fn reclaim_policy(&self) -> ReclaimPolicy {
    self.reclaim_policy
  }

  #[inline]
  pub fn mount_options(&self) -> &[String] {
    &self.mount_options
  }
}

impl TryFrom<&KubeStorageClass> for StorageClass {
  type Error = ObjectError;

  fn try_from(value: &KubeStorageClass) -> Result<Self, Self::Error> {
    let name = required(value.metadata.name.as_ref(), "StorageClass.metadata.name")?;
    let parameters = value.parameters.clone().unwrap_or_default().into();
    let reclaim_policy = match value.reclaim_policy.as_deref() {
      None | Some("") => ReclaimPolicy::default(),
      Some(v) => v.parse()?,
    };
    let mount_options = value.mount_options.clone().unwrap_or_default();

    Ok(StorageClass {
      name,
      parameters,
      reclaim_policy,
      mount_options,
    })
  }
}
