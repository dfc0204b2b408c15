use crate::{
  claim::ClaimRequest,
  error::ObjectError,
  lookup::LookupError,
  storage_class::StorageClass,
  volume::VolumeDescriptor,
  Identity,
};
use async_trait::async_trait;
use k8s_openapi::api::{core::v1::PersistentVolumeClaim, storage::v1::StorageClass as KubeStorageClass};
use std::{convert::TryFrom, io, path::PathBuf};
use thiserror::Error;

/// Progress reported back to the controller together with a provision result.
///
/// Host path volumes are created synchronously, so every call ends
/// [`Finished`](ProvisioningState::Finished).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisioningState {
  /// The operation is complete, successful or not. The controller must not
  /// expect the provisioner to make further progress on its own.
  Finished,
}

/// Everything a provision call gets to see.
#[derive(Debug, Clone)]
pub struct ProvisionOptions {
  claim: ClaimRequest,
  storage_class: StorageClass,
}

impl ProvisionOptions {
  #[inline]
  pub fn new(claim: ClaimRequest, storage_class: StorageClass) -> Self {
    ProvisionOptions {
      claim,
      storage_class,
    }
  }

  /// Builds the options from the objects the controller watches.
  pub fn from_kube(
    claim: &PersistentVolumeClaim,
    storage_class: &KubeStorageClass,
  ) -> Result<Self, ObjectError> {
    Ok(ProvisionOptions {
      claim: ClaimRequest::try_from(claim)?,
      storage_class: StorageClass::try_from(storage_class)?,
    })
  }

  #[inline]
  pub fn claim(&self) -> &ClaimRequest {
    &self.claim
  }

  #[inline]
  pub fn storage_class(&self) -> &StorageClass {
    &self.storage_class
  }
}

#[async_trait]
pub trait Provisioner: Identity {
  /// Creates the backing storage for a claim and describes it as a volume.
  ///
  /// Called by the controller once for every unbound claim whose storage
  /// class names this provisioner. The returned state tells the controller
  /// whether the work is complete; errors carry their own state through
  /// [`ProvisionError::state`].
  async fn provision(
    &self,
    options: ProvisionOptions,
  ) -> Result<(VolumeDescriptor, ProvisioningState), ProvisionError>;

  /// Releases the backing storage of a volume whose claim is gone.
  ///
  /// This operation MUST be idempotent. If the storage no longer exists the
  /// provisioner MUST report success.
  async fn delete(&self, volume: &VolumeDescriptor) -> Result<(), DeleteError>;
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProvisionError {
  #[error("claim Selector is not supported")]
  SelectorNotSupported,

  #[error("{0} must be set in storage class")]
  MissingParameter(&'static str),

  /// The `subPath` would place the volume outside of the base directory.
  #[error("subPath {0:?} must be a relative path below the base directory")]
  InvalidSubPath(String),

  /// The claim was not scheduled to a node, so there is nothing to pin the
  /// volume to.
  #[error("claim {0} has no selected node")]
  NoSelectedNode(String),

  #[error("unable to create directory {} for new volume: {source}", .path.display())]
  CreateDirectory {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("unable to change permission for new directory {}: {source}", .path.display())]
  SetPermissions {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

impl ProvisionError {
  /// Every provision failure is final from the provisioner's point of view;
  /// retrying is left to the controller.
  #[inline]
  pub fn state(&self) -> ProvisioningState {
    ProvisioningState::Finished
  }
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DeleteError {
  #[error("failed to obtain storage class for volume {volume}: {source}")]
  StorageClass {
    volume: String,
    #[source]
    source: LookupError,
  },

  #[error("unable to remove directory {}: {source}", .path.display())]
  RemoveDirectory {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("unable to archive directory {} to {}: {source}", .from.display(), .to.display())]
  ArchiveDirectory {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: io::Error,
  },
}

impl DeleteError {
  /// Whether calling [`Provisioner::delete`] again may succeed without any
  /// change to the cluster's objects.
  pub fn is_retriable(&self) -> bool {
    match self {
      DeleteError::StorageClass { source, .. } => source.is_retriable(),
      DeleteError::RemoveDirectory { .. } => true,
      DeleteError::ArchiveDirectory { .. } => true,
    }
  }
}
