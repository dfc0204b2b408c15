use thiserror::Error;

/// A Kubernetes object handed to the provisioner could not be turned into
/// its typed counterpart.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectError {
  #[error("{0} is missing")]
  MissingField(&'static str),

  #[error("{field} has invalid value {value:?}")]
  InvalidField { field: &'static str, value: String },
}

impl ObjectError {
  pub(crate) fn invalid(field: &'static str, value: impl Into<String>) -> Self {
    ObjectError::InvalidField {
      field,
      value: value.into(),
    }
  }
}

#[inline]
pub(crate) fn required(v: Option<&String>, field: &'static str) -> Result<String, ObjectError> {
  match v {
    Some(v) if !v.is_empty() => Ok(v.clone()),
    _ => Err(ObjectError::MissingField(field)),
  }
}
