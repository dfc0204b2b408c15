cfg_if::cfg_if! {
  if #[cfg(unix)] {
    mod provisioner;
    pub use provisioner::*;
  } else {
    compile_error!("Only cfg(unix) is supported at this time")
  }
}

mod config;
mod dispatch;
mod naming;

pub use config::*;
pub use naming::generate_name;
pub use provisioner_api as api;

use provisioner_api::{FakeStorageClasses, Provisioner};
use static_assertions::assert_impl_all;

assert_impl_all!(HostPathProvisioner<FakeStorageClasses>: Provisioner, Send, Sync);
