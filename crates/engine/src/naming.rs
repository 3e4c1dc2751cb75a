//! Name generation: renders `nameFormat` once per instance with an
//! injected, process-wide monotonic `_ENUM_` counter (spec §4.1, invariant
//! 4), grounded on `utils.GenerateNames` (`pkg/utils/utils.go`).

use crate::error::Result;
use handlebars::Handlebars;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};

static ENUM_COUNTER: AtomicI64 = AtomicI64::new(0);

/// Resets the process-wide `_ENUM_` counter. Exposed for test isolation
/// only; production code never calls this (spec §9: a process-wide atomic
/// is acceptable for single-process runs).
#[cfg(test)]
pub fn reset_counter() {
    ENUM_COUNTER.store(0, Ordering::SeqCst);
}

fn next_enum() -> i64 {
    ENUM_COUNTER.fetch_add(1, Ordering::SeqCst) + 1
}

/// Renders `pattern` `n` times, injecting a fresh `_ENUM_` value into
/// `params` before each render. Returns `n` blank names if `pattern` is
/// empty (unused by callers that require a name format).
pub fn generate_names(pattern: &str, n: usize, params: &mut Value) -> Result<Vec<String>> {
    let mut names = Vec::with_capacity(n);
    if pattern.is_empty() {
        return Ok(vec![String::new(); n]);
    }

    let mut hb = Handlebars::new();
    hb.set_strict_mode(false);
    hb.register_template_string("name", pattern)?;

    for _ in 0..n {
        if let Value::Object(map) = params {
            map.insert("_ENUM_".to_string(), Value::from(next_enum()));
        }
        names.push(hb.render("name", params)?);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    #[test]
    #[serial]
    fn names_are_pairwise_distinct() {
        reset_counter();
        let mut params = json!({});
        let names = generate_names("job{{_ENUM_}}", 5, &mut params).unwrap();
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    #[serial]
    fn counter_is_monotonic_across_calls() {
        reset_counter();
        let mut params = json!({});
        let first = generate_names("job{{_ENUM_}}", 1, &mut params).unwrap();
        let second = generate_names("job{{_ENUM_}}", 1, &mut params).unwrap();
        assert_ne!(first[0], second[0]);
    }
}
