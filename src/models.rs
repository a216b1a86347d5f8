use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============ Lead Records ============

/// A lead row as stored in the table: an ordered JSON object.
///
/// Callers may send fields beyond the known columns; they are passed through
/// to storage untouched, so the record stays dynamically typed.
pub type Lead = Map<String, Value>;

/// Column names the service reads or writes.
pub mod fields {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const PHONE: &str = "phone";
    pub const EMAIL: &str = "email";
    pub const PARTY: &str = "party";
    pub const STATUS: &str = "status";
    pub const TAG: &str = "tag";
    pub const LAST_CONNECTED: &str = "lastconnected";

    /// Fields every create/update payload must carry with a non-empty value.
    pub const REQUIRED: [&str; 4] = [NAME, PHONE, EMAIL, PARTY];
}

pub const DEFAULT_STATUS: &str = "Connected";
pub const DEFAULT_TAG: &str = "Lead";

/// Returns true when a JSON value counts as "empty" for required-field checks.
///
/// Absent keys, `null`, `false`, numeric zero, `""`, `[]` and `{}` are all
/// treated the same way.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
    }
}

/// Fills in creation-time defaults without overwriting anything the caller sent.
///
/// `lastconnected` is only added when the key is missing entirely.
pub fn apply_creation_defaults(lead: &mut Lead, now: DateTime<Utc>) {
    if !lead.contains_key(fields::LAST_CONNECTED) {
        lead.insert(
            fields::LAST_CONNECTED.to_string(),
            Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, false)),
        );
    }
    if !lead.contains_key(fields::STATUS) {
        lead.insert(
            fields::STATUS.to_string(),
            Value::String(DEFAULT_STATUS.to_string()),
        );
    }
    if !lead.contains_key(fields::TAG) {
        lead.insert(fields::TAG.to_string(), Value::String(DEFAULT_TAG.to_string()));
    }
}

// ============ API Responses ============

/// Body of `GET /api/leads`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadsResponse {
    pub leads: Vec<Lead>,
}

/// Body wrapping a single lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadResponse {
    pub lead: Lead,
}

/// Plain message body, used for delete confirmations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_is_blank_follows_truthiness() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&json!(null))));
        assert!(is_blank(Some(&json!(""))));
        assert!(is_blank(Some(&json!(0))));
        assert!(is_blank(Some(&json!(0.0))));
        assert!(is_blank(Some(&json!(false))));
        assert!(is_blank(Some(&json!([]))));
        assert!(is_blank(Some(&json!({}))));

        assert!(!is_blank(Some(&json!(" "))));
        assert!(!is_blank(Some(&json!(7))));
        assert!(!is_blank(Some(&json!(true))));
        assert!(!is_blank(Some(&json!(["x"]))));
    }

    #[test]
    fn test_creation_defaults_fill_missing_fields() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();
        let mut lead = json!({ "name": "Asha" }).as_object().cloned().unwrap();

        apply_creation_defaults(&mut lead, now);

        assert_eq!(lead["status"], json!("Connected"));
        assert_eq!(lead["tag"], json!("Lead"));
        assert_eq!(lead["lastconnected"], json!("2024-05-01T10:30:00.000000+00:00"));
    }

    #[test]
    fn test_creation_defaults_keep_caller_values() {
        let mut lead = json!({
            "status": "Cold",
            "tag": "Prospect",
            "lastconnected": null
        })
        .as_object()
        .cloned()
        .unwrap();

        apply_creation_defaults(&mut lead, Utc::now());

        assert_eq!(lead["status"], json!("Cold"));
        assert_eq!(lead["tag"], json!("Prospect"));
        assert_eq!(lead["lastconnected"], json!(null));
    }
}
