use crate::{
  claim::{parse_access_modes, AccessMode, STORAGE_RESOURCE},
  error::{required, ObjectError},
  storage_class::ReclaimPolicy,
};
use k8s_openapi::{
  api::core::v1::{
    HostPathVolumeSource, NodeSelector, NodeSelectorRequirement, NodeSelectorTerm,
    PersistentVolume, PersistentVolumeSpec, VolumeNodeAffinity,
  },
  apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::ObjectMeta},
};
use std::{convert::TryFrom, path::PathBuf};

/// Well-known node label holding the node's hostname.
pub const HOSTNAME_LABEL: &str = "kubernetes.io/hostname";

const OPERATOR_IN: &str = "In";

/// Restricts a volume to exactly one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeAffinity {
  node_name: String,
}

impl NodeAffinity {
  /// Fails with [`ObjectError::MissingField`] for an empty node name, which
  /// would produce a selector no node can ever satisfy.
  pub fn new(node_name: impl Into<String>) -> Result<Self, ObjectError> {
    let node_name = node_name.into();
    if node_name.is_empty() {
      return Err(ObjectError::MissingField("NodeAffinity.node_name"));
    }

    Ok(NodeAffinity { node_name })
  }

  #[inline]
  pub fn node_name(&self) -> &str {
    &self.node_name
  }
}

impl From<NodeAffinity> for VolumeNodeAffinity {
  fn from(value: NodeAffinity) -> Self {
    VolumeNodeAffinity {
      required: Some(NodeSelector {
        node_selector_terms: vec![NodeSelectorTerm {
          match_expressions: Some(vec![NodeSelectorRequirement {
            key: HOSTNAME_LABEL.to_owned(),
            operator: OPERATOR_IN.to_owned(),
            values: Some(vec![value.node_name]),
          }]),
          match_fields: None,
        }],
      }),
    }
  }
}

impl TryFrom<&VolumeNodeAffinity> for NodeAffinity {
  type Error = ObjectError;

  fn try_from(value: &VolumeNodeAffinity) -> Result<Self, Self::Error> {
    const FIELD: &str = "PersistentVolume.spec.nodeAffinity";

    let terms = value
      .required
      .as_ref()
      .map(|r| r.node_selector_terms.as_slice())
      .unwrap_or_default();

    let requirement = match terms {
      [term] => match term.match_expressions.as_deref() {
        Some([requirement]) => requirement,
        _ => return Err(ObjectError::invalid(FIELD, format!("{:?}", value))),
      },
      _ => return Err(ObjectError::invalid(FIELD, format!("{:?}", value))),
    };

    match (requirement.key.as_str(), requirement.operator.as_str(), requirement.values.as_deref()) {
      (HOSTNAME_LABEL, OPERATOR_IN, Some([node])) => NodeAffinity::new(node.clone()),
      _ => Err(ObjectError::invalid(FIELD, format!("{:?}", value))),
    }
  }
}

/// A provisioned volume, bound to one directory on one node.
///
/// Produced by a provision call, handed back unchanged to the delete call.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeDescriptor {
  name: String,
  storage_class_name: String,
  reclaim_policy: ReclaimPolicy,
  access_modes: Vec<AccessMode>,
  mount_options: Vec<String>,
  capacity: Option<Quantity>,
  host_path: PathBuf,
  node_affinity: NodeAffinity,
}

impl VolumeDescriptor {
  pub fn builder(name: impl Into<String>, host_path: impl Into<PathBuf>) -> VolumeDescriptorBuilder {
    VolumeDescriptorBuilder {
      name: name.into(),
      host_path: host_path.into(),
      storage_class_name: String::new(),
      reclaim_policy: ReclaimPolicy::default(),
      access_modes: Vec::new(),
      mount_options: Vec::new(),
      capacity: None,
    }
  }

  #[inline]
  pub fn name(&self) -> &str {
    &self.name
  }

  /// The storage class the volume was provisioned from. Its parameters are
  /// consulted again at deletion time.
  #[inline]
  pub fn storage_class_name(&self) -> &str {
    &self.storage_class_name
  }

  #[inline]
  pub fn reclaim_policy(&self) -> ReclaimPolicy {
    self.reclaim_policy
  }

  #[inline]
  pub fn access_modes(&self) -> &[AccessMode] {
    &self.access_modes
  }

  #[inline]
  pub fn mount_options(&self) -> &[String] {
    &self.mount_options
  }

  #[inline]
  pub fn capacity(&self) -> Option<&Quantity> {
    self.capacity.as_ref()
  }

  #[inline]
  pub fn host_path(&self) -> &PathBuf {
    &self.host_path
  }

  #[inline]
  pub fn node_affinity(&self) -> &NodeAffinity {
    &self.node_affinity
  }
}

#[derive(Debug)]
pub struct VolumeDescriptorBuilder {
  name: String,
  host_path: PathBuf,
  storage_class_name: String,
  reclaim_policy: ReclaimPolicy,
  access_modes: Vec<AccessMode>,
  mount_options: Vec<String>,
  capacity: Option<Quantity>,
}

impl VolumeDescriptorBuilder {
  pub fn storage_class_name(mut self, v: impl Into<String>) -> Self {
    self.storage_class_name = v.into();
    self
  }

  pub fn reclaim_policy(mut self, v: ReclaimPolicy) -> Self {
    self.reclaim_policy = v;
    self
  }

  pub fn access_modes(mut self, v: impl Into<Vec<AccessMode>>) -> Self {
    self.access_modes = v.into();
    self
  }

  pub fn mount_options(mut self, v: impl Into<Vec<String>>) -> Self {
    self.mount_options = v.into();
    self
  }

  pub fn capacity(mut self, v: Option<Quantity>) -> Self {
    self.capacity = v;
    self
  }

  /// Node affinity is the one mandatory field, so it finishes the builder.
  pub fn node_affinity(self, node_affinity: NodeAffinity) -> VolumeDescriptor {
    VolumeDescriptor {
      name: self.name,
      storage_class_name: self.storage_class_name,
      reclaim_policy: self.reclaim_policy,
      access_modes: self.access_modes,
      mount_options: self.mount_options,
      capacity: self.capacity,
      host_path: self.host_path,
      node_affinity,
    }
  }
}

impl From<VolumeDescriptor> for PersistentVolume {
  fn from(value: VolumeDescriptor) -> Self {
    let capacity = value
      .capacity
      .map(|q| vec![(STORAGE_RESOURCE.to_owned(), q)].into_iter().collect());
    let access_modes = value
      .access_modes
      .iter()
      .map(|m| m.as_str().to_owned())
      .collect();
    let mount_options = match value.mount_options {
      v if v.is_empty() => None,
      v => Some(v),
    };
    let storage_class_name = match value.storage_class_name {
      v if v.is_empty() => None,
      v => Some(v),
    };

    PersistentVolume {
      metadata: ObjectMeta {
        name: Some(value.name),
        ..Default::default()
      },
      spec: Some(PersistentVolumeSpec {
        persistent_volume_reclaim_policy: Some(value.reclaim_policy.as_str().to_owned()),
        access_modes: Some(access_modes),
        mount_options,
        capacity,
        storage_class_name,
        host_path: Some(HostPathVolumeSource {
          path: value.host_path.to_string_lossy().into_owned(),
          type_: None,
        }),
        node_affinity: Some(value.node_affinity.into()),
        ..Default::default()
      }),
      ..Default::default()
    }
  }
}

impl TryFrom<&PersistentVolume> for VolumeDescriptor {
  type Error = ObjectError;

  fn try_from(value: &PersistentVolume) -> Result<Self, Self::Error> {
    let name = required(value.metadata.name.as_ref(), "PersistentVolume.metadata.name")?;
    let spec = value
      .spec
      .as_ref()
      .ok_or(ObjectError::MissingField("PersistentVolume.spec"))?;

    let host_path = spec
      .host_path
      .as_ref()
      .map(|h| PathBuf::from(&h.path))
      .filter(|p| !p.as_os_str().is_empty())
      .ok_or(ObjectError::MissingField("PersistentVolume.spec.hostPath"))?;

    let node_affinity = spec
      .node_affinity
      .as_ref()
      .ok_or(ObjectError::MissingField("PersistentVolume.spec.nodeAffinity"))
      .and_then(NodeAffinity::try_from)?;

    let reclaim_policy = match spec.persistent_volume_reclaim_policy.as_deref() {
      None | Some("") => ReclaimPolicy::default(),
      Some(v) => v.parse()?,
    };

    Ok(VolumeDescriptor {
      name,
      storage_class_name: spec.storage_class_name.clone().unwrap_or_default(),
      reclaim_policy,
      access_modes: parse_access_modes(spec.access_modes.as_ref())?,
      mount_options: spec.mount_options.clone().unwrap_or_default(),
      capacity: spec
        .capacity
        .as_ref()
        .and_then(|c| c.get(STORAGE_RESOURCE))
        .cloned(),
      host_path,
      node_affinity,
    })
  }
}
