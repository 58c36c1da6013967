//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Document keys and leftover policy used by the builtin serializers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct YomlConfig {
    /// Key naming the concrete type of a mapping.
    pub type_key: String,
    /// Key holding the literal in the wrapped form `{type: int, value: 3}`.
    pub value_key: String,
    /// Key of the catch-all fields bucket.
    pub fields_key: String,
    /// Fail a read that leaves mapping keys unconsumed. When false the keys
    /// are dropped with a warning.
    pub reject_unconsumed_keys: bool,
}

impl Default for YomlConfig {
    fn default() -> Self {
        YomlConfig {
            type_key: "type".to_string(),
            value_key: "value".to_string(),
            fields_key: "fields".to_string(),
            reject_unconsumed_keys: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: YomlConfig =
            serde_json::from_str(r#"{"fieldsKey": "attrs", "rejectUnconsumedKeys": false}"#)
                .unwrap();
        assert_eq!(cfg.type_key, "type");
        assert_eq!(cfg.fields_key, "attrs");
        assert!(!cfg.reject_unconsumed_keys);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<YomlConfig>(r#"{"typeKeys": "t"}"#).is_err());
    }
}
