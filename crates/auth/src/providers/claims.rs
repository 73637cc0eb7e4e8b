//! JSON claim flattening shared by the providers.

use oidping_core::auth::ClaimSet;
use serde_json::{Map, Value};

/// Protocol claims that carry no identity information.
const PROTOCOL_CLAIMS: [&str; 12] = [
    "nonce", "aud", "azp", "acr", "iss", "iat", "nbf", "exp", "at_hash", "c_hash", "auth_time",
    "sid",
];

/// Add every identity claim in `object` whose type is not already in `set`.
///
/// Arrays become one claim per element; `null` and nested objects are skipped.
pub(crate) fn push_json_claims(set: &mut ClaimSet, object: Map<String, Value>) {
    for (claim_type, value) in object {
        if PROTOCOL_CLAIMS.contains(&claim_type.as_str()) || set.contains(&claim_type) {
            continue;
        }
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(v) = scalar(item) {
                        set.push(claim_type.clone(), v);
                    }
                }
            }
            other => {
                if let Some(v) = scalar(other) {
                    set.push(claim_type, v);
                }
            }
        }
    }
}

fn scalar(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn arrays_become_repeated_claims() {
        let mut set = ClaimSet::new();
        push_json_claims(&mut set, object(json!({ "role": ["admin", "reader"] })));
        assert_eq!(set.all("role"), vec!["admin", "reader"]);
    }

    #[test]
    fn protocol_claims_are_dropped() {
        let mut set = ClaimSet::new();
        push_json_claims(
            &mut set,
            object(json!({ "nonce": "n", "aud": "client", "exp": 1, "email": "a@b.c" })),
        );
        assert!(!set.contains("nonce"));
        assert!(!set.contains("aud"));
        assert_eq!(set.first("email"), Some("a@b.c"));
    }

    #[test]
    fn existing_claims_win() {
        let mut set = ClaimSet::new().with("sub", "from-token");
        push_json_claims(&mut set, object(json!({ "sub": "other", "email_verified": true })));
        assert_eq!(set.all("sub"), vec!["from-token"]);
        assert_eq!(set.first("email_verified"), Some("true"));
    }
}
