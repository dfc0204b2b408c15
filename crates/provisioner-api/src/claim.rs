use crate::error::{required, ObjectError};
use k8s_openapi::{
  api::core::v1::PersistentVolumeClaim,
  apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::LabelSelector},
};
use std::{collections::BTreeMap, convert::TryFrom, fmt, str::FromStr};

/// Resource name of the storage request in a claim and of the capacity in a volume.
pub const STORAGE_RESOURCE: &str = "storage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
  /// Can be mounted as read/write by a single node.
  ReadWriteOnce,
  /// Can be mounted as read-only by many nodes.
  ReadOnlyMany,
  /// Can be mounted as read/write by many nodes.
  ReadWriteMany,
  /// Can be mounted as read/write by a single pod.
  ReadWriteOncePod,
}

impl AccessMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      AccessMode::ReadWriteOnce => "ReadWriteOnce",
      AccessMode::ReadOnlyMany => "ReadOnlyMany",
      AccessMode::ReadWriteMany => "ReadWriteMany",
      AccessMode::ReadWriteOncePod => "ReadWriteOncePod",
    }
  }
}

impl fmt::Display for AccessMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for AccessMode {
  type Err = ObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(match s {
      "ReadWriteOnce" => AccessMode::ReadWriteOnce,
      "ReadOnlyMany" => AccessMode::ReadOnlyMany,
      "ReadWriteMany" => AccessMode::ReadWriteMany,
      "ReadWriteOncePod" => AccessMode::ReadWriteOncePod,
      other => return Err(ObjectError::invalid("accessModes", other)),
    })
  }
}

pub(crate) fn parse_access_modes(modes: Option<&Vec<String>>) -> Result<Vec<AccessMode>, ObjectError> {
  modes
    .map(|v| v.iter().map(|m| m.parse()).collect())
    .unwrap_or_else(|| Ok(Vec::new()))
}

/// A request for storage, as seen by the provisioner.
#[derive(Debug, Clone)]
pub struct ClaimRequest {
  namespace: String,
  name: String,
  uid: String,
  capacity: Option<Quantity>,
  access_modes: Vec<AccessMode>,
  selector: Option<LabelSelector>,
  annotations: BTreeMap<String, String>,
}

impl ClaimRequest {
  #[inline]
  pub fn namespace(&self) -> &str {
    &self.namespace
  }

  #[inline]
  pub fn name(&self) -> &str {
    &self.name
  }

  /// The UID the API server assigned to this claim instance. Differs between
  /// two claims that reuse the same namespace and name.
  #[inline]
  pub fn uid(&self) -> &str {
    &self.uid
  }

  /// The requested `storage` capacity, if any.
  #[inline]
  pub fn capacity(&self) -> Option<&Quantity> {
    self.capacity.as_ref()
  }

  #[inline]
  pub fn access_modes(&self) -> &[AccessMode] {
    &self.access_modes
  }

  /// Label selector restricting which existing volumes may bind the claim.
  #[inline]
  pub fn selector(&self) -> Option<&LabelSelector> {
    self.selector.as_ref()
  }

  #[inline]
  pub fn annotations(&self) -> &BTreeMap<String, String> {
    &self.annotations
  }
}

impl TryFrom<&PersistentVolumeClaim> for ClaimRequest {
  type Error = ObjectError;

  fn try_from(value: &PersistentVolumeClaim) -> Result<Self, Self::Error> {
    let meta = &value.metadata;
    let namespace = required(meta.namespace.as_ref(), "PersistentVolumeClaim.metadata.namespace")?;
    let name = required(meta.name.as_ref(), "PersistentVolumeClaim.metadata.name")?;
    let uid = required(meta.uid.as_ref(), "PersistentVolumeClaim.metadata.uid")?;
    let annotations = meta.annotations.clone().unwrap_or_default();

    let spec = value.spec.as_ref();
    let access_modes = parse_access_modes(spec.and_then(|s| s.access_modes.as_ref()))?;
    let selector = spec.and_then(|s| s.selector.clone());
    let capacity = spec
      .and_then(|s| s.resources.as_ref())
      .and_then(|r| r.requests.as_ref())
      .and_then(|r| r.get(STORAGE_RESOURCE))
      .cloned();

    Ok(ClaimRequest {
      namespace,
      name,
      uid,
      capacity,
      access_modes,
      selector,
      annotations,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use k8s_openapi::{
    api::core::v1::{PersistentVolumeClaimSpec, VolumeResourceRequirements},
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
  };
  use test_case::test_case;

  fn claim(namespace: Option<&str>, name: Option<&str>, uid: Option<&str>) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
      metadata: ObjectMeta {
        namespace: namespace.map(Into::into),
        name: name.map(Into::into),
        uid: uid.map(Into::into),
        ..Default::default()
      },
      spec: Some(PersistentVolumeClaimSpec {
        access_modes: Some(vec!["ReadWriteOnce".into()]),
        resources: Some(VolumeResourceRequirements {
          requests: Some(
            vec![(STORAGE_RESOURCE.to_owned(), Quantity("1Gi".into()))]
              .into_iter()
              .collect(),
          ),
          ..Default::default()
        }),
        ..Default::default()
      }),
      ..Default::default()
    }
  }

  #[test]
  fn converts_claim() {
    let request = ClaimRequest::try_from(&claim(Some("team-a"), Some("logs-pvc"), Some("abc123")))
      .expect("valid claim");

    assert_eq!(request.namespace(), "team-a");
    assert_eq!(request.name(), "logs-pvc");
    assert_eq!(request.uid(), "abc123");
    assert_eq!(request.capacity(), Some(&Quantity("1Gi".into())));
    assert_eq!(request.access_modes(), &[AccessMode::ReadWriteOnce]);
    assert!(request.selector().is_none());
    assert!(request.annotations().is_empty());
  }

  #[test_case(None, Some("logs"), Some("abc") => ObjectError::MissingField("PersistentVolumeClaim.metadata.namespace") ; "missing namespace")]
  #[test_case(Some("ns"), Some(""), Some("abc") => ObjectError::MissingField("PersistentVolumeClaim.metadata.name") ; "empty name")]
  #[test_case(Some("ns"), Some("logs"), None => ObjectError::MissingField("PersistentVolumeClaim.metadata.uid") ; "missing uid")]
  fn rejects_incomplete_metadata(
    namespace: Option<&str>,
    name: Option<&str>,
    uid: Option<&str>,
  ) -> ObjectError {
    ClaimRequest::try_from(&claim(namespace, name, uid)).unwrap_err()
  }

  #[test]
  fn rejects_unknown_access_mode() {
    let mut pvc = claim(Some("ns"), Some("logs"), Some("abc"));
    pvc.spec.as_mut().unwrap().access_modes = Some(vec!["WriteSometimes".into()]);

    assert_eq!(
      ClaimRequest::try_from(&pvc).unwrap_err(),
      ObjectError::invalid("accessModes", "WriteSometimes")
    );
  }

  #[test]
  fn claim_without_spec_has_no_capacity() {
    let mut pvc = claim(Some("ns"), Some("logs"), Some("abc"));
    pvc.spec = None;

    let request = ClaimRequest::try_from(&pvc).expect("valid claim");
    assert!(request.capacity().is_none());
    assert!(request.access_modes().is_empty());
  }
}
