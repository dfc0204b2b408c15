use provisioner_api::NamingStrategy;

/// Name of the volume, and of its directory, for a claim.
///
/// With [`NamingStrategy::Static`] the name only depends on the claim's
/// namespace and name, so a claim that is deleted and re-created binds to the
/// same directory again. Otherwise the claim UID is appended, which makes the
/// name unique per claim instance.
pub fn generate_name(
  namespace: &str,
  claim_name: &str,
  volume_uid: &str,
  strategy: NamingStrategy,
) -> String {
  match strategy {
    NamingStrategy::Static => [namespace, claim_name].join("-"),
    NamingStrategy::Unique => [namespace, claim_name, volume_uid].join("-"),
  }
}
