//! Patch builder: partitions a user-supplied state map into a root merge
//! patch (`metadata`, `spec`) and a status merge patch (`status`), grounded
//! on `utils.NewPatchData` (`pkg/utils/patch.go`).

use serde_json::{Map, Value};

/// Raw JSON bodies for a root merge-patch and a status-subresource
/// merge-patch. Either slot may be absent when the corresponding section
/// was not present in `state`.
#[derive(Debug, Clone, Default)]
pub struct PatchData {
    pub root: Option<Value>,
    pub status: Option<Value>,
}

impl PatchData {
    pub fn new(state: &Value) -> Self {
        let Some(state) = state.as_object() else {
            return PatchData::default();
        };

        let mut root = Map::new();
        if let Some(v) = state.get("metadata") {
            root.insert("metadata".to_string(), v.clone());
        }
        if let Some(v) = state.get("spec") {
            root.insert("spec".to_string(), v.clone());
        }

        let status = state.get("status").map(|v| {
            let mut m = Map::new();
            m.insert("status".to_string(), v.clone());
            Value::Object(m)
        });

        PatchData {
            root: (!root.is_empty()).then(|| Value::Object(root)),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partitions_metadata_and_spec_into_root() {
        let state = json!({"metadata": {"labels": {"a": "b"}}, "spec": {"replicas": 2}});
        let patch = PatchData::new(&state);
        assert_eq!(
            patch.root.unwrap(),
            json!({"metadata": {"labels": {"a": "b"}}, "spec": {"replicas": 2}})
        );
        assert!(patch.status.is_none());
    }

    #[test]
    fn status_only_in_status_patch() {
        let state = json!({"status": {"phase": "Running"}});
        let patch = PatchData::new(&state);
        assert!(patch.root.is_none());
        assert_eq!(patch.status.unwrap(), json!({"status": {"phase": "Running"}}));
    }

    #[test]
    fn empty_state_yields_no_patches() {
        let patch = PatchData::new(&json!({}));
        assert!(patch.root.is_none());
        assert!(patch.status.is_none());
    }

    #[test]
    fn unrelated_keys_are_dropped() {
        let state = json!({"foo": "bar"});
        let patch = PatchData::new(&state);
        assert!(patch.root.is_none());
        assert!(patch.status.is_none());
    }
}
