use futures::executor::block_on;
use hostpath_provisioner::{
  api::{
    AccessMode, DeleteError, FakeStorageClasses, LookupError, NodeAffinity, Parameters,
    Provisioner, StorageClass, VolumeDescriptor,
  },
  Config, HostPathProvisioner,
};
use std::{fs, path::Path};
use tempfile::TempDir;
use test_case::test_case;

const VOLUME: &str = "team-a-logs-pvc-abc123";

fn provisioner(base: &Path, on_delete: Option<&str>) -> HostPathProvisioner<FakeStorageClasses> {
  let mut parameters = vec![("subPath", "data")];
  if let Some(policy) = on_delete {
    parameters.push(("onDelete", policy));
  }

  let sc = StorageClass::new("hostpath", parameters.into_iter().collect::<Parameters>());
  HostPathProvisioner::new(Config::new(base).unwrap(), FakeStorageClasses::new(vec![sc]))
}

fn volume(base: &Path) -> VolumeDescriptor {
  VolumeDescriptor::builder(VOLUME, base.join("data").join(VOLUME))
    .storage_class_name("hostpath")
    .access_modes(vec![AccessMode::ReadWriteOnce])
    .node_affinity(NodeAffinity::new("node-a").unwrap())
}

fn populate(volume: &VolumeDescriptor) {
  fs::create_dir_all(volume.host_path().join("nested")).unwrap();
  fs::write(volume.host_path().join("nested").join("file"), b"payload").unwrap();
}

#[test]
fn delete_policy_removes_tree() {
  let base = TempDir::new().unwrap();
  let provisioner = provisioner(base.path(), Some("delete"));
  let volume = volume(base.path());
  populate(&volume);

  block_on(provisioner.delete(&volume)).expect("deleted");

  assert!(!volume.host_path().exists());
  assert!(base.path().join("data").exists());
}

#[test]
fn archive_policy_moves_directory() {
  let base = TempDir::new().unwrap();
  let provisioner = provisioner(base.path(), Some("archive"));
  let volume = volume(base.path());
  populate(&volume);

  block_on(provisioner.delete(&volume)).expect("archived");

  let archived = base.path().join(format!("{}-archived", VOLUME));
  assert!(!volume.host_path().exists());
  assert_eq!(
    fs::read(archived.join("nested").join("file")).unwrap(),
    b"payload"
  );
}

#[test_case(None ; "unset")]
#[test_case(Some("retain") ; "retain")]
#[test_case(Some("Delete") ; "wrong case")]
#[test_case(Some("") ; "empty")]
fn other_policies_keep_directory(on_delete: Option<&str>) {
  let base = TempDir::new().unwrap();
  let provisioner = provisioner(base.path(), on_delete);
  let volume = volume(base.path());
  populate(&volume);

  block_on(provisioner.delete(&volume)).expect("retained");

  assert_eq!(
    fs::read(volume.host_path().join("nested").join("file")).unwrap(),
    b"payload"
  );
  assert!(!base.path().join(format!("{}-archived", VOLUME)).exists());
}

#[test_case(Some("delete") ; "delete")]
#[test_case(Some("archive") ; "archive")]
#[test_case(None ; "retain")]
fn missing_directory_is_already_deleted(on_delete: Option<&str>) {
  let base = TempDir::new().unwrap();
  let provisioner = provisioner(base.path(), on_delete);

  block_on(provisioner.delete(&volume(base.path()))).expect("nothing to delete");

  assert_eq!(fs::read_dir(base.path()).unwrap().count(), 0);
}

#[test]
fn missing_storage_class_is_an_error() {
  let base = TempDir::new().unwrap();
  let provisioner = HostPathProvisioner::new(
    Config::new(base.path()).unwrap(),
    FakeStorageClasses::default(),
  );
  let volume = volume(base.path());
  populate(&volume);

  let err = block_on(provisioner.delete(&volume)).unwrap_err();

  assert!(
    matches!(
      &err,
      DeleteError::StorageClass { volume, source: LookupError::NotFound(_) } if volume == VOLUME
    ),
    "{}",
    err
  );
  assert!(!err.is_retriable());
  assert!(volume.host_path().exists());
}

#[test]
fn archive_onto_existing_archive_fails() {
  let base = TempDir::new().unwrap();
  let provisioner = provisioner(base.path(), Some("archive"));
  let volume = volume(base.path());
  populate(&volume);

  let archived = base.path().join(format!("{}-archived", VOLUME));
  fs::create_dir_all(archived.join("previous")).unwrap();

  let err = block_on(provisioner.delete(&volume)).unwrap_err();

  assert!(matches!(err, DeleteError::ArchiveDirectory { .. }), "{}", err);
  assert!(err.is_retriable());
  assert!(volume.host_path().exists());
}

#[test]
fn provisioned_volume_round_trips_through_delete() {
  use hostpath_provisioner::api::{annotations::SELECTED_NODE, ClaimRequest, ProvisionOptions};
  use k8s_openapi::{
    api::core::v1::{PersistentVolume, PersistentVolumeClaim},
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
  };
  use std::convert::TryFrom;

  let base = TempDir::new().unwrap();
  let provisioner = provisioner(base.path(), Some("delete"));
  let pvc = PersistentVolumeClaim {
    metadata: ObjectMeta {
      namespace: Some("team-a".into()),
      name: Some("logs-pvc".into()),
      uid: Some("abc123".into()),
      annotations: Some(
        vec![(SELECTED_NODE.to_owned(), "node-a".to_owned())]
          .into_iter()
          .collect(),
      ),
      ..Default::default()
    },
    ..Default::default()
  };

  let sc = StorageClass::new("hostpath", vec![("subPath", "data")].into_iter().collect());
  let options = ProvisionOptions::new(ClaimRequest::try_from(&pvc).unwrap(), sc);
  let (volume, _) = block_on(provisioner.provision(options)).expect("provisioned");
  assert!(volume.host_path().is_dir());

  // The controller stores the volume and hands it back on release.
  let pv = PersistentVolume::from(volume);
  let volume = VolumeDescriptor::try_from(&pv).expect("valid volume");
  block_on(provisioner.delete(&volume)).expect("deleted");

  assert!(!base.path().join("data").join(VOLUME).exists());
}

#[test]
fn delete_uses_current_storage_class() {
  let base = TempDir::new().unwrap();
  let classes = FakeStorageClasses::new(vec![StorageClass::new(
    "hostpath",
    vec![("subPath", "data"), ("onDelete", "delete")]
      .into_iter()
      .collect(),
  )]);
  let provisioner = HostPathProvisioner::new(Config::new(base.path()).unwrap(), classes);
  let volume = volume(base.path());
  populate(&volume);

  // The class changed after the volume was provisioned.
  provisioner.storage_classes().insert(StorageClass::new(
    "hostpath",
    vec![("subPath", "data"), ("onDelete", "archive")]
      .into_iter()
      .collect(),
  ));

  block_on(provisioner.delete(&volume)).expect("archived");

  assert!(!volume.host_path().exists());
  assert!(base.path().join(format!("{}-archived", VOLUME)).is_dir());
}
