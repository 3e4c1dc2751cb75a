//! Deep structural "is-subset" comparison, grounded on `utils.IsSubset`
//! (`pkg/utils/object_handler.go`).
//!
//! `is_subset(obj, sub)` is true when, for every key in `sub`: a `null`
//! value requires the key to be absent from `obj`; a mapping requires both
//! sides to be mappings and recurses; a list only requires `obj[key]` to
//! also be a list (element comparison is not required); scalars compare
//! equal after integer widening.

use serde_json::Value;

pub fn is_subset(obj: &Value, sub: &Value) -> bool {
    let (Some(obj), Some(sub)) = (obj.as_object(), sub.as_object()) else {
        return false;
    };

    for (key, sub_val) in sub {
        let obj_val = obj.get(key);

        if sub_val.is_null() {
            if obj_val.is_some() {
                return false;
            }
            continue;
        }

        let Some(obj_val) = obj_val else {
            return false;
        };

        match sub_val {
            Value::Object(_) => {
                if !obj_val.is_object() || !is_subset(obj_val, sub_val) {
                    return false;
                }
            }
            Value::Array(_) => {
                if !obj_val.is_array() {
                    return false;
                }
            }
            Value::Number(n) if n.is_i64() || n.is_u64() => {
                let sub_int = if n.is_i64() { n.as_i64() } else { n.as_u64().map(|u| u as i64) };
                let obj_int = obj_val.as_i64().or_else(|| obj_val.as_u64().map(|u| u as i64));
                if sub_int != obj_int {
                    return false;
                }
            }
            _ => {
                if obj_val != sub_val {
                    return false;
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn idempotent_for_any_value() {
        let x = json!({"a": 1, "b": {"c": [1,2,3]}});
        assert!(is_subset(&x, &x));
    }

    #[test]
    fn empty_subset_always_matches() {
        let x = json!({"a": 1, "b": 2});
        assert!(is_subset(&x, &json!({})));
    }

    #[test]
    fn empty_object_matches_only_empty_or_null_subset() {
        assert!(is_subset(&json!({}), &json!({})));
        assert!(is_subset(&json!({}), &json!({"missing": null})));
        assert!(!is_subset(&json!({}), &json!({"present": 1})));
    }

    #[test]
    fn null_requires_absence() {
        assert!(is_subset(&json!({"a": 1}), &json!({"b": null})));
        assert!(!is_subset(&json!({"a": 1}), &json!({"a": null})));
    }

    #[test]
    fn integer_widening_compares_equal() {
        let obj = json!({"replicas": 2i64});
        let sub = json!({"replicas": 2u64});
        assert!(is_subset(&obj, &sub));
    }

    #[test]
    fn list_only_checks_type() {
        let obj = json!({"items": [1, 2, 3]});
        let sub = json!({"items": [9, 9]});
        assert!(is_subset(&obj, &sub));
        assert!(!is_subset(&json!({"items": "nope"}), &sub));
    }

    #[test]
    fn nested_map_recurses() {
        let obj = json!({"spec": {"replicas": 2, "extra": true}});
        let sub = json!({"spec": {"replicas": 2}});
        assert!(is_subset(&obj, &sub));
        assert!(!is_subset(&obj, &json!({"spec": {"replicas": 3}})));
    }
}
