//! Typed accessors over the open key/value `data` object of a command request.
//!
//! Absent and `null` values are "missing". A value of the wrong JSON type, an
//! unparsable UUID, or a non-integral number is "invalid".

use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::SecurityError;

pub type Payload = Map<String, Value>;

fn present<'a>(data: &'a Payload, key: &str) -> Option<&'a Value> {
    data.get(key).filter(|v| !v.is_null())
}

pub fn optional_string(data: &Payload, key: &str) -> Result<Option<String>, SecurityError> {
    match present(data, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(SecurityError::invalid(format!("{} must be a string", key))),
    }
}

/// Required non-empty string; an empty string counts as missing.
pub fn required_string(data: &Payload, key: &str) -> Result<String, SecurityError> {
    match optional_string(data, key)? {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(SecurityError::missing(key)),
    }
}

/// Optional UUID; an empty string counts as not populated.
pub fn optional_uuid(data: &Payload, key: &str) -> Result<Option<Uuid>, SecurityError> {
    match optional_string(data, key)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => Uuid::parse_str(s.trim())
            .map(Some)
            .map_err(|_| SecurityError::invalid(format!("{} is not a valid UUID: {}", key, s))),
    }
}

pub fn required_uuid(data: &Payload, key: &str) -> Result<Uuid, SecurityError> {
    optional_uuid(data, key)?.ok_or_else(|| SecurityError::missing(key))
}

pub fn optional_integer(data: &Payload, key: &str) -> Result<Option<i64>, SecurityError> {
    let Some(value) = present(data, key) else {
        return Ok(None);
    };
    let not_integer = || SecurityError::invalid(format!("{} must be an integer", key));
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(i))
            } else {
                // JSON clients often send 3.0 for 3
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                        Ok(Some(f as i64))
                    }
                    _ => Err(not_integer()),
                }
            }
        }
        _ => Err(not_integer()),
    }
}

pub fn required_integer(data: &Payload, key: &str) -> Result<i64, SecurityError> {
    optional_integer(data, key)?.ok_or_else(|| SecurityError::missing(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_and_null_strings_are_missing() {
        let data = payload(json!({ "title": "", "other": null }));
        assert!(matches!(required_string(&data, "title"), Err(SecurityError::MissingData(_))));
        assert!(matches!(required_string(&data, "other"), Err(SecurityError::MissingData(_))));
        assert!(matches!(required_string(&data, "absent"), Err(SecurityError::MissingData(_))));
    }

    #[test]
    fn wrong_types_are_invalid() {
        let data = payload(json!({ "title": 7, "level": "3", "projectId": "nope" }));
        assert!(matches!(required_string(&data, "title"), Err(SecurityError::InvalidData(_))));
        assert!(matches!(required_integer(&data, "level"), Err(SecurityError::InvalidData(_))));
        assert!(matches!(required_uuid(&data, "projectId"), Err(SecurityError::InvalidData(_))));
    }

    #[test]
    fn integral_floats_are_accepted() {
        let data = payload(json!({ "a": 3.0, "b": 2.5, "c": 4 }));
        assert_eq!(required_integer(&data, "a").unwrap(), 3);
        assert!(matches!(required_integer(&data, "b"), Err(SecurityError::InvalidData(_))));
        assert_eq!(required_integer(&data, "c").unwrap(), 4);
    }

    #[test]
    fn blank_uuid_is_not_populated() {
        let id = Uuid::new_v4();
        let data = payload(json!({ "userId": "", "teamId": id.to_string() }));
        assert_eq!(optional_uuid(&data, "userId").unwrap(), None);
        assert_eq!(optional_uuid(&data, "teamId").unwrap(), Some(id));
    }
}
