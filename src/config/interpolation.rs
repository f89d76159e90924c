//! `${path}` interpolation resolution.
//!
//! A string that is exactly one reference takes the referenced value with
//! its type; references embedded in longer strings are substituted as text.
//! Unknown references are left verbatim.

use serde_json::Value;

use super::lookup;

/// Nesting limit for references that point at other references.
const MAX_DEPTH: usize = 16;

/// Resolve every interpolation in `value` against `root`.
pub(super) fn resolve(value: &Value, root: &Value) -> Value {
    resolve_at(value, root, 0)
}

fn resolve_at(value: &Value, root: &Value, depth: usize) -> Value {
    match value {
        Value::String(s) => resolve_str(s, root, depth),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve_at(item, root, depth))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_at(v, root, depth)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn resolve_str(s: &str, root: &Value, depth: usize) -> Value {
    if depth >= MAX_DEPTH || !s.contains("${") {
        return Value::String(s.to_string());
    }

    if let Some(path) = whole_reference(s) {
        return match lookup(root, path) {
            Some(target) => resolve_at(target, root, depth + 1),
            None => Value::String(s.to_string()),
        };
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return Value::String(out);
        };
        let path = &after[..end];
        match lookup(root, path).map(|target| resolve_at(target, root, depth + 1)) {
            Some(Value::String(text)) => out.push_str(&text),
            Some(other) => out.push_str(&other.to_string()),
            None => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Value::String(out)
}

fn whole_reference(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("${")?.strip_suffix('}')?;
    (!inner.contains('}') && !inner.contains("${")).then_some(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whole_reference_keeps_type() {
        let root = json!({"a": {"b": 3}, "c": "${a.b}"});
        assert_eq!(resolve(&root, &root)["c"], json!(3));
    }

    #[test]
    fn test_embedded_reference_is_text() {
        let root = json!({"dir": "/logs", "run": 7, "out": "${dir}/run_${run}"});
        assert_eq!(resolve(&root, &root)["out"], json!("/logs/run_7"));
    }

    #[test]
    fn test_missing_reference_left_verbatim() {
        let root = json!({"out": "${nope.x}/a", "whole": "${nope}"});
        let resolved = resolve(&root, &root);
        assert_eq!(resolved["out"], json!("${nope.x}/a"));
        assert_eq!(resolved["whole"], json!("${nope}"));
    }

    #[test]
    fn test_chained_reference() {
        let root = json!({"a": "${b}", "b": "${c}", "c": true});
        assert_eq!(resolve(&root, &root)["a"], json!(true));
    }

    #[test]
    fn test_cycle_terminates() {
        let root = json!({"a": "${b}", "b": "${a}"});
        let resolved = resolve(&root, &root);
        assert!(resolved["a"].as_str().unwrap().starts_with("${"));
    }

    #[test]
    fn test_unterminated_reference() {
        let root = json!({"a": "x ${b"});
        assert_eq!(resolve(&root, &root)["a"], json!("x ${b"));
    }
}
