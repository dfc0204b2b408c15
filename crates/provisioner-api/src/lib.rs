pub mod annotations;
pub mod claim;
pub mod provisioner;
pub mod storage_class;
pub mod volume;

mod error;
mod fake;
mod lookup;

pub use claim::{AccessMode, ClaimRequest};
pub use error::ObjectError;
pub use fake::FakeStorageClasses;
pub use lookup::{LookupError, StorageClassLookup};
pub use provisioner::*;
pub use storage_class::{DeletePolicy, NamingStrategy, Parameters, ReclaimPolicy, StorageClass};
pub use volume::{NodeAffinity, VolumeDescriptor};

pub trait Identity: Send + Sync + 'static {
  /// The name the provisioner registers under. Storage classes select the
  /// provisioner through their `provisioner` field, so it SHOULD follow the
  /// `<domain>/<name>` convention, e.g. `cluster.local/hostpath-provisioner`.
  fn name(&self) -> &str;

  /// Provisioner version. Value of this field is opaque to the controller.
  #[inline]
  fn version(&self) -> &str {
    env!("CARGO_PKG_VERSION")
  }
}
