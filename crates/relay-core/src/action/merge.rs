//! Action registry merge.
//!
//! Names are unique after merging. When two sources declare the same name,
//! the first one wins, with precedence configured, then chain-derived, then
//! remotely discovered, then client-declared.

use std::collections::HashSet;

use relay_types::action::ActionDescriptor;

use super::Action;

/// Merge server-side actions into one list with unique names.
pub fn merge_actions(local: Vec<Action>, chain: Vec<Action>, remote: Vec<Action>) -> Vec<Action> {
    dedupe_by_name(local.into_iter().chain(chain).chain(remote), |a| &a.name)
}

/// Drop descriptors whose name was already seen, keeping the first.
///
/// Callers pass server descriptors followed by client descriptors.
pub fn flatten_no_duplicates(
    descriptors: impl IntoIterator<Item = ActionDescriptor>,
) -> Vec<ActionDescriptor> {
    dedupe_by_name(descriptors, |d| &d.name)
}

fn dedupe_by_name<T>(items: impl IntoIterator<Item = T>, name: impl Fn(&T) -> &String) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if seen.insert(name(&item).clone()) {
            out.push(item);
        } else {
            tracing::debug!(action = %name(&item), "duplicate action name dropped");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn action(name: &str, description: &str) -> Action {
        Action::new(name, description, vec![], |_| async { Ok(json!(null)) })
    }

    fn descriptor(name: &str, description: &str) -> ActionDescriptor {
        ActionDescriptor::new(name, description, json!({"type": "object"}))
    }

    #[test]
    fn test_merge_keeps_first_by_source_precedence() {
        let merged = merge_actions(
            vec![action("search", "local"), action("notify", "local")],
            vec![action("search", "chain"), action("summarize", "chain")],
            vec![action("summarize", "remote"), action("lookup", "remote")],
        );

        let pairs: Vec<(&str, &str)> = merged
            .iter()
            .map(|a| (a.name.as_str(), a.description.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("search", "local"),
                ("notify", "local"),
                ("summarize", "chain"),
                ("lookup", "remote"),
            ]
        );
    }

    #[test]
    fn test_merge_dedupes_within_one_source() {
        let merged = merge_actions(vec![action("a", "1"), action("a", "2")], vec![], vec![]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].description, "1");
    }

    #[test]
    fn test_merge_empty_sources() {
        assert!(merge_actions(vec![], vec![], vec![]).is_empty());
    }

    #[test]
    fn test_flatten_prefers_server_over_client() {
        let server = vec![descriptor("search", "server")];
        let client = vec![descriptor("search", "client"), descriptor("highlight", "client")];

        let flat = flatten_no_duplicates(server.into_iter().chain(client));
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].description, "server");
        assert_eq!(flat[1].name, "highlight");
    }

    #[test]
    fn test_flatten_names_are_unique() {
        let flat = flatten_no_duplicates(
            ["a", "b", "a", "c", "b"]
                .into_iter()
                .map(|n| descriptor(n, "")),
        );
        let names: Vec<&str> = flat.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
