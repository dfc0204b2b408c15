use crate::{config::Config, dispatch::run, naming::generate_name};
use async_trait::async_trait;
use provisioner_api::{
  annotations::{lookup_first, SELECTED_NODE_KEYS},
  storage_class::SUB_PATH,
  DeleteError, DeletePolicy, Identity, NodeAffinity, ProvisionError, ProvisionOptions,
  Provisioner, ProvisioningState, StorageClassLookup, VolumeDescriptor,
};
use std::{
  fs::{self, DirBuilder, Permissions},
  io,
  os::unix::fs::{DirBuilderExt, PermissionsExt},
  path::{Component, Path, PathBuf},
};
use tracing::{debug, error, info, instrument};

/// Permission bits of every volume directory. Pods run with arbitrary UIDs,
/// so the directory has to be world writable.
pub const VOLUME_MODE: u32 = 0o777;

const ARCHIVE_SUFFIX: &str = "-archived";

/// Provisions volumes as plain directories below [`Config::base_path`].
///
/// Volumes are laid out as `<base>/<subPath>/<name>`; archived volumes are
/// moved to `<base>/<name>-archived`.
pub struct HostPathProvisioner<L> {
  config: Config,
  storage_classes: L,
}

impl<L: StorageClassLookup> HostPathProvisioner<L> {
  pub fn new(config: Config, storage_classes: L) -> Self {
    HostPathProvisioner {
      config,
      storage_classes,
    }
  }

  #[inline]
  pub fn config(&self) -> &Config {
    &self.config
  }

  #[inline]
  pub fn storage_classes(&self) -> &L {
    &self.storage_classes
  }

  /// Where a volume called `name` goes for a storage class with `sub_path`.
  pub fn volume_path(&self, sub_path: &str, name: &str) -> Result<PathBuf, ProvisionError> {
    let relative = Path::new(sub_path);
    let contained = relative
      .components()
      .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

    if sub_path.is_empty() || !contained {
      return Err(ProvisionError::InvalidSubPath(sub_path.to_owned()));
    }

    Ok(self.config.base_path().join(relative).join(name))
  }

  /// Where a volume called `name` is moved by the `archive` delete policy.
  pub fn archive_path(&self, name: &str) -> PathBuf {
    self
      .config
      .base_path()
      .join(format!("{}{}", name, ARCHIVE_SUFFIX))
  }

  async fn provision_volume(&self, options: ProvisionOptions) -> Result<VolumeDescriptor, ProvisionError> {
    let claim = options.claim();
    if claim.selector().is_some() {
      return Err(ProvisionError::SelectorNotSupported);
    }

    info!("new provision detected");
    debug!(?options);

    let storage_class = options.storage_class();
    let parameters = storage_class.parameters();
    let sub_path = parameters
      .sub_path()
      .ok_or(ProvisionError::MissingParameter(SUB_PATH))?;

    let name = generate_name(
      claim.namespace(),
      claim.name(),
      claim.uid(),
      parameters.naming_strategy(),
    );
    let host_path = self.volume_path(sub_path, &name)?;

    // An empty annotation is no better than a missing one.
    let node_affinity = lookup_first(claim.annotations(), SELECTED_NODE_KEYS)
      .and_then(|node| NodeAffinity::new(node).ok())
      .ok_or_else(|| ProvisionError::NoSelectedNode(format!("{}/{}", claim.namespace(), claim.name())))?;
    info!(volume = %name, node = %node_affinity.node_name(), "create persistent volume");

    info!(path = %host_path.display(), "create host directory ({:o})", VOLUME_MODE);
    create_volume_dir(host_path.clone()).await?;

    let volume = VolumeDescriptor::builder(name, host_path)
      .storage_class_name(storage_class.name())
      .reclaim_policy(storage_class.reclaim_policy())
      .mount_options(storage_class.mount_options().to_vec())
      .access_modes(claim.access_modes().to_vec())
      .capacity(claim.capacity().cloned())
      .node_affinity(node_affinity);

    debug!(?volume, "new persistent volume");
    Ok(volume)
  }

  async fn delete_volume(&self, volume: &VolumeDescriptor) -> Result<(), DeleteError> {
    let storage_class = self
      .storage_classes
      .storage_class(volume.storage_class_name())
      .await
      .map_err(|source| DeleteError::StorageClass {
        volume: volume.name().to_owned(),
        source,
      })?;

    let host_path = volume.host_path().clone();
    if !path_exists(host_path.clone()).await {
      info!(path = %host_path.display(), "path does not exist, deletion skipped");
      return Ok(());
    }

    let policy = storage_class.parameters().delete_policy();
    match policy {
      DeletePolicy::Delete => {
        let path = host_path.clone();
        run(move || fs::remove_dir_all(path))
          .await
          .map_err(|source| DeleteError::RemoveDirectory {
            path: host_path.clone(),
            source,
          })?;

        info!(?policy, path = %host_path.display(), "deleted volume directory");
      }
      DeletePolicy::Archive => {
        let archive_path = self.archive_path(volume.name());
        let (from, to) = (host_path.clone(), archive_path.clone());
        run(move || fs::rename(from, to))
          .await
          .map_err(|source| DeleteError::ArchiveDirectory {
            from: host_path.clone(),
            to: archive_path.clone(),
            source,
          })?;

        info!(?policy, path = %host_path.display(), archive = %archive_path.display(), "archived volume directory");
      }
      DeletePolicy::Retain => {
        info!(?policy, path = %host_path.display(), "retaining volume directory");
      }
    }

    Ok(())
  }
}

impl<L: StorageClassLookup> Identity for HostPathProvisioner<L> {
  #[inline]
  fn name(&self) -> &str {
    self.config.name()
  }
}

#[async_trait]
impl<L: StorageClassLookup> Provisioner for HostPathProvisioner<L> {
  #[instrument(
    name = "Provisioner.provision",
    skip(self, options),
    fields(
      namespace = %options.claim().namespace(),
      claim = %options.claim().name(),
      storage_class = %options.storage_class().name()
    )
  )]
  async fn provision(
    &self,
    options: ProvisionOptions,
  ) -> Result<(VolumeDescriptor, ProvisioningState), ProvisionError> {
    match self.provision_volume(options).await {
      Ok(volume) => Ok((volume, ProvisioningState::Finished)),
      Err(err) => {
        error!(state = ?err.state(), "provision failed: {}", err);
        Err(err)
      }
    }
  }

  #[instrument(name = "Provisioner.delete", skip(self, volume), fields(volume = %volume.name()))]
  async fn delete(&self, volume: &VolumeDescriptor) -> Result<(), DeleteError> {
    self.delete_volume(volume).await.map_err(|err| {
      error!(retriable = err.is_retriable(), "delete failed: {}", err);
      err
    })
  }
}

/// Creates `path` and its parents, then sets [`VOLUME_MODE`] explicitly since
/// the mode given to `mkdir` is filtered through the process umask.
async fn create_volume_dir(path: PathBuf) -> Result<(), ProvisionError> {
  let target = path.clone();
  run(move || {
    DirBuilder::new()
      .recursive(true)
      .mode(VOLUME_MODE)
      .create(target)
  })
  .await
  .map_err(|source| ProvisionError::CreateDirectory {
    path: path.clone(),
    source,
  })?;

  let target = path.clone();
  run(move || fs::set_permissions(target, Permissions::from_mode(VOLUME_MODE)))
    .await
    .map_err(|source| ProvisionError::SetPermissions { path, source })
}

/// Only a definite "not found" counts as absent; any other stat failure is
/// left for the actual delete operation to report.
async fn path_exists(path: PathBuf) -> bool {
  match run(move || fs::metadata(path)).await {
    Ok(_) => true,
    Err(e) => e.kind() != io::ErrorKind::NotFound,
  }
}
