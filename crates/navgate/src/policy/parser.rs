//! Parsing of untyped policy documents.
//!
//! A document is checked against the policy schema before anything is
//! deserialized, so a malformed document is rejected as a whole and the
//! caller gets the full list of problems in one pass.

use serde::Serialize;
use serde_json::Value;

use super::schema::Policy;
use super::validator;
use crate::error::{FieldError, PolicyValidationError};

/// Outcome of [`validate`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Whether the document conforms to the schema
    pub valid: bool,
    /// `path: message` strings, present only when invalid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

/// Parse and validate a policy document.
pub fn parse(raw: &Value) -> Result<Policy, PolicyValidationError> {
    let errors = validator::check(raw);
    if !errors.is_empty() {
        return Err(PolicyValidationError::new(errors));
    }

    serde_json::from_value(raw.clone())
        .map_err(|e| PolicyValidationError::new(vec![FieldError::root(e.to_string())]))
}

/// Parse and validate a policy from JSON text.
pub fn parse_str(text: &str) -> Result<Policy, PolicyValidationError> {
    let raw: Value = serde_json::from_str(text).map_err(|e| {
        PolicyValidationError::new(vec![FieldError::root(format!("Invalid JSON: {e}"))])
    })?;
    parse(&raw)
}

/// Validate a policy document without failing.
pub fn validate(raw: &Value) -> ValidationReport {
    match parse(raw) {
        Ok(_) => ValidationReport {
            valid: true,
            errors: None,
        },
        Err(e) => ValidationReport {
            valid: false,
            errors: Some(e.messages()),
        },
    }
}

/// Policy version accessor.
pub fn get_version(policy: &Policy) -> &str {
    policy.version()
}

/// Destination identifiers, in document order.
pub fn list_destination_ids(policy: &Policy) -> Vec<&str> {
    policy.destination_ids()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::policy::FilterModeLevel;

    fn valid_policy() -> Value {
        json!({
            "version": "1.0.0",
            "filterModeDefault": "safe",
            "destinations": {
                "photos": {
                    "start": "https://www.example.com/direct/inbox/",
                    "allow": ["/direct/", "/compose/"],
                    "block": ["/explore/", "/reels/"],
                    "dom": { "hide": ["a[href=\"/explore\"]"] },
                    "quickActions": {
                        "dm": "https://www.example.com/direct/inbox/",
                        "compose": "https://www.example.com/p/create/"
                    }
                }
            }
        })
    }

    #[test]
    fn test_parse_valid_policy() {
        let policy = parse(&valid_policy()).expect("valid policy");
        assert_eq!(policy.version, "1.0.0");
        assert_eq!(policy.filter_mode_default, Some(FilterModeLevel::Safe));
        let photos = policy.destination("photos").unwrap();
        assert_eq!(photos.allow, vec!["/direct/", "/compose/"]);
        assert_eq!(
            photos.dom.as_ref().unwrap().hide,
            vec!["a[href=\"/explore\"]"]
        );
        assert_eq!(photos.quick_actions.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_rejects_missing_destinations() {
        let err = parse(&json!({ "version": "1.0.0" })).unwrap_err();
        assert_eq!(err.errors, vec![FieldError::new("destinations", "Required")]);
    }

    #[test]
    fn test_parse_rejects_missing_start() {
        let err = parse(&json!({
            "version": "1.0.0",
            "destinations": { "photos": { "allow": [], "block": [] } }
        }))
        .unwrap_err();
        assert_eq!(
            err.errors,
            vec![FieldError::new("destinations.photos.start", "Required")]
        );
    }

    #[test]
    fn test_parse_rejects_relative_start() {
        let err = parse(&json!({
            "version": "1.0.0",
            "destinations": {
                "photos": { "start": "/direct/inbox/", "allow": [], "block": [] }
            }
        }))
        .unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].path, "destinations.photos.start");
        assert!(err.errors[0].message.starts_with("Invalid url"));
    }

    #[test]
    fn test_parse_collects_every_violation() {
        let err = parse(&json!({
            "version": 3,
            "filterModeDefault": "strict",
            "destinations": {
                "photos": {
                    "start": "https://www.example.com/",
                    "allow": "/direct/",
                    "block": ["/explore", 7],
                    "dom": { "hide": "nav", "script": false },
                    "filterModes": { "safe": { "blockUrls": [1] } },
                    "quickActions": { "dm": 1 }
                },
                "broken": []
            }
        }))
        .unwrap_err();

        let paths: Vec<&str> = err.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "version",
                "filterModeDefault",
                "destinations.photos.allow",
                "destinations.photos.block.1",
                "destinations.photos.dom.hide",
                "destinations.photos.dom.script",
                "destinations.photos.filterModes.safe.blockUrls.0",
                "destinations.photos.quickActions.dm",
                "destinations.broken",
            ]
        );
        assert_eq!(err.errors[0].message, "Expected string, received number");
    }

    #[test]
    fn test_parse_ignores_unknown_keys_and_null_optionals() {
        let policy = parse(&json!({
            "version": "2",
            "signature": "ignored",
            "destinations": {
                "chat": {
                    "start": "https://chat.example.com/",
                    "allow": [],
                    "block": [],
                    "dom": null,
                    "extra": true
                }
            }
        }))
        .expect("valid policy");
        assert!(policy.destination("chat").unwrap().dom.is_none());
    }

    fn with_destination_field(key: &str, value: Value) -> Value {
        let mut raw = valid_policy();
        raw["destinations"]["photos"][key] = value;
        raw
    }

    #[test]
    fn test_null_dom_lists_parse_as_empty() {
        for key in ["hide", "disableAnchorsTo"] {
            let raw = with_destination_field("dom", json!({ key: null }));
            let policy = parse(&raw).unwrap_or_else(|e| panic!("dom.{key}: {e}"));
            let dom = policy.destination("photos").unwrap().dom.clone().unwrap();
            assert!(dom.hide.is_empty() && dom.disable_anchors_to.is_empty());
        }
    }

    #[test]
    fn test_null_filter_mode_lists_parse_as_empty() {
        for key in ["blockUrls", "hideSelectors", "scriptlets"] {
            let raw = with_destination_field("filterModes", json!({ "safe": { key: null } }));
            let policy = parse(&raw).unwrap_or_else(|e| panic!("filterModes.safe.{key}: {e}"));
            let mode = policy
                .destination("photos")
                .unwrap()
                .filter_mode("safe")
                .cloned()
                .unwrap();
            assert_eq!(mode, crate::policy::FilterMode::default());
        }
    }

    #[test]
    fn test_wrong_list_type_reports_field_path() {
        let raw = with_destination_field("dom", json!({ "hide": "nav" }));
        let err = parse(&raw).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].path, "destinations.photos.dom.hide");
    }

    #[test]
    fn test_parse_str_reports_malformed_json() {
        let err = parse_str("{ not json").unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].path, "");
        assert!(err.errors[0].message.starts_with("Invalid JSON"));
    }

    #[test]
    fn test_validate_agrees_with_parse() {
        let report = validate(&valid_policy());
        assert!(report.valid);
        assert!(report.errors.is_none());

        let invalid = json!({ "version": "1.0.0" });
        let report = validate(&invalid);
        assert!(!report.valid);
        assert_eq!(report.errors, Some(vec!["destinations: Required".to_string()]));
        assert!(parse(&invalid).is_err());
    }

    #[test]
    fn test_accessors() {
        let policy = parse(&valid_policy()).unwrap();
        assert_eq!(get_version(&policy), "1.0.0");
        assert_eq!(list_destination_ids(&policy), vec!["photos"]);
    }
}
