use crate::{
  lookup::{LookupError, StorageClassLookup},
  storage_class::StorageClass,
};
use async_trait::async_trait;
use std::{collections::HashMap, sync::RwLock};
use tracing::info;

/// In-memory [`StorageClassLookup`] for tests and for embedding without an
/// API server.
#[derive(Debug, Default)]
pub struct FakeStorageClasses(RwLock<HashMap<String, StorageClass>>);

impl FakeStorageClasses {
  pub fn new(classes: impl IntoIterator<Item = StorageClass>) -> Self {
    let classes = classes
      .into_iter()
      .map(|sc| (sc.name().to_owned(), sc))
      .collect();

    Self(RwLock::new(classes))
  }

  pub fn insert(&self, storage_class: StorageClass) {
    info!("Fake storage classes: added {}", storage_class.name());
    self
      .0
      .write()
      .unwrap()
      .insert(storage_class.name().to_owned(), storage_class);
  }

  pub fn remove(&self, name: &str) -> Option<StorageClass> {
    self.0.write().unwrap().remove(name)
  }
}

#[async_trait]
impl StorageClassLookup for FakeStorageClasses {
  async fn storage_class(&self, name: &str) -> Result<StorageClass, LookupError> {
    self
      .0
      .read()
      .unwrap()
      .get(name)
      .cloned()
      .ok_or_else(|| LookupError::NotFound(name.to_owned()))
  }
}
