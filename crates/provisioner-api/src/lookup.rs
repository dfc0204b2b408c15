use crate::{error::ObjectError, storage_class::StorageClass};
use async_trait::async_trait;
use k8s_openapi::api::storage::v1::StorageClass as KubeStorageClass;
use std::convert::TryFrom;
use thiserror::Error;
use tracing::debug;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LookupError {
  #[error("storage class {0} not found")]
  NotFound(String),

  #[error("storage class {name} is invalid: {source}")]
  Invalid {
    name: String,
    #[source]
    source: ObjectError,
  },

  #[error(transparent)]
  Api(#[from] kube::Error),
}

impl LookupError {
  /// API failures are usually transient; a missing or malformed storage class
  /// needs an operator to fix it first.
  pub fn is_retriable(&self) -> bool {
    matches!(self, LookupError::Api(_))
  }
}

/// Source of storage class definitions, consulted when a volume is deleted.
#[async_trait]
pub trait StorageClassLookup: Send + Sync + 'static {
  async fn storage_class(&self, name: &str) -> Result<StorageClass, LookupError>;
}

#[async_trait]
impl StorageClassLookup for kube::Api<KubeStorageClass> {
  async fn storage_class(&self, name: &str) -> Result<StorageClass, LookupError> {
    let sc = self.get_opt(name).await?;
    convert(name, sc.as_ref())
  }
}

fn convert(name: &str, sc: Option<&KubeStorageClass>) -> Result<StorageClass, LookupError> {
  let sc = sc.ok_or_else(|| LookupError::NotFound(name.to_owned()))?;

  debug!(name, provisioner = %sc.provisioner, "fetched storage class");
  StorageClass::try_from(sc).map_err(|source| LookupError::Invalid {
    name: name.to_owned(),
    source,
  })
}
