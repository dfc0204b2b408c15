use std::collections::BTreeMap;

/// Annotation set by the scheduler on a claim once a pod using it has been
/// placed on a node (`WaitForFirstConsumer` binding).
pub const SELECTED_NODE: &str = "volume.kubernetes.io/selected-node";

/// Pre-GA spelling of [`SELECTED_NODE`], still honoured for older clusters.
pub const ALPHA_SELECTED_NODE: &str = "volume.alpha.kubernetes.io/selected-node";

/// Keys consulted, in order, to find the node a claim was scheduled to.
pub const SELECTED_NODE_KEYS: &[&str] = &[SELECTED_NODE, ALPHA_SELECTED_NODE];

/// Looks up the first key of `keys` present in `annotations`.
///
/// Earlier keys win, so aliases should be listed from current to legacy.
/// Returns `None` when none of the keys is present.
pub fn lookup_first<'a>(
  annotations: &'a BTreeMap<String, String>,
  keys: &[&str],
) -> Option<&'a str> {
  keys
    .iter()
    .find_map(|k| annotations.get(*k))
    .map(String::as_str)
}

#[cfg(test)]
mod tests {
  use super::*;
  use test_case::test_case;

  fn annotations(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
      .iter()
      .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
      .collect()
  }

  #[test_case(&[(SELECTED_NODE, "node-a")] => Some(String::from("node-a")) ; "current key")]
  #[test_case(&[(ALPHA_SELECTED_NODE, "node-b")] => Some(String::from("node-b")) ; "legacy key")]
  #[test_case(&[(ALPHA_SELECTED_NODE, "node-b"), (SELECTED_NODE, "node-a")] => Some(String::from("node-a")) ; "current key wins")]
  #[test_case(&[("unrelated", "x")] => None ; "no alias present")]
  #[test_case(&[] => None ; "empty")]
  fn selected_node(pairs: &[(&str, &str)]) -> Option<String> {
    let annotations = annotations(pairs);
    lookup_first(&annotations, SELECTED_NODE_KEYS).map(str::to_owned)
  }
}
