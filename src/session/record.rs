//! The single place that understands the persisted session record.
//!
//! Current shape: the login response `data` object plus `_expiresAt`
//! (epoch milliseconds), i.e. `{token, user, ..., _expiresAt}`. Older builds
//! persisted the whole response, so `token` and `user` may sit under `data`.
//! Each field prefers the flat location and falls back to the nested one.

use serde_json::{Map, Value};

/// Key under which the session record is stored.
pub const STORAGE_KEY: &str = "session";
/// Field carrying the absolute expiry in the persisted record.
pub const EXPIRES_AT_FIELD: &str = "_expiresAt";

/// Canonical view of a persisted record.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionRecord {
    pub token: String,
    pub user: Value,
    pub expires_at: Option<i64>,
}

/// Parses a raw record. Corrupt JSON, non-objects, and records without a
/// usable token all read as "no session".
#[must_use]
pub fn parse(raw: &str) -> Option<SessionRecord> {
    let value: Value = serde_json::from_str(raw).ok()?;
    from_value(&value)
}

/// Normalises an already-decoded record or login payload.
#[must_use]
pub fn from_value(value: &Value) -> Option<SessionRecord> {
    let object = value.as_object()?;
    let nested = object.get("data").and_then(Value::as_object);

    let token = token_in(object).or_else(|| nested.and_then(token_in))?;
    let user = user_in(object)
        .or_else(|| nested.and_then(user_in))
        .cloned()
        .unwrap_or(Value::Null);
    let expires_at = object.get(EXPIRES_AT_FIELD).and_then(millis);

    Some(SessionRecord {
        token,
        user,
        expires_at,
    })
}

/// Builds the record to persist: the original payload plus `_expiresAt`.
#[must_use]
pub fn build(payload: &Map<String, Value>, expires_at: i64) -> Value {
    let mut record = payload.clone();
    record.insert(EXPIRES_AT_FIELD.to_string(), Value::from(expires_at));
    Value::Object(record)
}

/// The token exactly as stored; a blank one counts as missing.
fn token_in(object: &Map<String, Value>) -> Option<String> {
    object
        .get("token")
        .and_then(Value::as_str)
        .filter(|token| !token.trim().is_empty())
        .map(str::to_string)
}

fn user_in(object: &Map<String, Value>) -> Option<&Value> {
    object.get("user").filter(|user| !user.is_null())
}

#[allow(clippy::cast_possible_truncation)]
fn millis(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|v| v.is_finite())
            .map(|v| v.floor() as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_shape() {
        let record = parse(r#"{"token":"t1","user":{"name":"Ada"},"_expiresAt":1000}"#);
        assert_eq!(
            record,
            Some(SessionRecord {
                token: "t1".to_string(),
                user: json!({"name": "Ada"}),
                expires_at: Some(1000),
            })
        );
    }

    #[test]
    fn nested_shape_is_accepted() {
        let record = parse(r#"{"success":true,"data":{"token":"t2","user":{"id":7}}}"#);
        assert_eq!(
            record,
            Some(SessionRecord {
                token: "t2".to_string(),
                user: json!({"id": 7}),
                expires_at: None,
            })
        );
    }

    #[test]
    fn flat_fields_win_over_nested() {
        let record = parse(r#"{"token":"flat","data":{"token":"nested","user":{"id":1}}}"#)
            .map(|r| (r.token, r.user));
        assert_eq!(record, Some(("flat".to_string(), json!({"id": 1}))));
    }

    #[test]
    fn corrupt_or_tokenless_records_are_absent() {
        assert_eq!(parse("{not json"), None);
        assert_eq!(parse("[]"), None);
        assert_eq!(parse(r#"{"user":{}}"#), None);
        assert_eq!(parse(r#"{"token":""}"#), None);
        assert_eq!(parse(r#"{"token":42}"#), None);
    }

    #[test]
    fn non_numeric_expiry_is_ignored() {
        let record = parse(r#"{"token":"t","_expiresAt":"tomorrow"}"#);
        assert_eq!(record.and_then(|r| r.expires_at), None);
    }

    #[test]
    fn build_keeps_extra_fields() {
        let payload = json!({"token": "t", "user": {"id": 1}, "role": "ADMIN"});
        let Some(payload) = payload.as_object() else {
            panic!("payload is an object");
        };
        let record = build(payload, 5000);
        assert_eq!(record["role"], "ADMIN");
        assert_eq!(record[EXPIRES_AT_FIELD], 5000);
        assert_eq!(from_value(&record).and_then(|r| r.expires_at), Some(5000));
    }
}
