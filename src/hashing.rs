//! Hashing - SHA-256 Fingerprints
//!
//! A build engine compares fingerprints between runs to notice that a
//! tool's schema or rendered command line changed.

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

use crate::rules::Rule;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    to_string(&sort_value(&v))
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), sort_value(v))).collect())
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// Fingerprint of a rule's full schema. Property order is significant.
pub fn rule_fingerprint(rule: &Rule) -> Result<String, serde_json::Error> {
    Ok(sha256_hex(canonical_json(rule)?.as_bytes()))
}

/// command_fingerprint = sha256(rule name + ":" + command line)
pub fn command_fingerprint(rule_name: &str, command_line: &str) -> String {
    sha256_hex(format!("{}:{}", rule_name, command_line).as_bytes())
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Property, PropertyKind};
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": 3});
        assert_eq!(canonical_json(&obj).unwrap(), r#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn test_rule_fingerprint_tracks_declaration_order() {
        let program = Property::new("Program", PropertyKind::Boolean);
        let debug = Property::new("Debug", PropertyKind::Boolean);
        let a = Rule::new("mem", "/", vec![program.clone(), debug.clone()]).unwrap();
        let b = Rule::new("mem", "/", vec![debug, program]).unwrap();

        assert_eq!(rule_fingerprint(&a).unwrap(), rule_fingerprint(&a.clone()).unwrap());
        assert_ne!(rule_fingerprint(&a).unwrap(), rule_fingerprint(&b).unwrap());
    }

    #[test]
    fn test_command_fingerprint() {
        let h1 = command_fingerprint("mem", "/P a.cs");
        assert_eq!(h1, command_fingerprint("mem", "/P a.cs"));
        assert_ne!(h1, command_fingerprint("mem", "/P b.cs"));
        assert_eq!(h1.len(), 64);
    }
}
