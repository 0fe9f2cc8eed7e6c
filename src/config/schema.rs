//! KDL schema definition for config.kdl.
//!
//! This module provides:
//! - The `RoteiroConfig` struct representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Validation and key-based get/set for the `rot config` commands

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Maximum accepted value for `default-duration-months`.
pub const MAX_DEFAULT_DURATION: u32 = 36;

/// Workspace preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// output-format "human"  // or "json"
/// default-user "ana@example.com"
/// default-product "web"
/// default-duration-months 3
/// action-log-enabled #true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoteiroConfig {
    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Email of the user commands act as when `--as` is not given
    pub default_user: Option<String>,

    /// Product tag applied to new items created without `--product`
    pub default_product: Option<String>,

    /// Duration given to new items created with a start date but no duration
    pub default_duration_months: Option<u32>,

    /// Whether commands are appended to action.log
    pub action_log_enabled: Option<bool>,
}

impl RoteiroConfig {
    /// Keys understood by `get`/`set`.
    pub const KEYS: [&'static str; 5] = [
        "output-format",
        "default-user",
        "default-product",
        "default-duration-months",
        "action-log-enabled",
    ];

    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(months) = self.default_duration_months {
            if months == 0 || months > MAX_DEFAULT_DURATION {
                return Err(format!(
                    "default-duration-months must be 1-{}, got {}",
                    MAX_DEFAULT_DURATION, months
                ));
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document. Unknown nodes and ill-typed values are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(s) = first_string(doc, "output-format") {
            config.output_format = OutputFormat::parse(&s);
        }
        config.default_user = first_string(doc, "default-user");
        config.default_product = first_string(doc, "default-product");

        if let Some(i) = first_value(doc, "default-duration-months").and_then(|v| v.as_integer()) {
            if (1..=MAX_DEFAULT_DURATION as i128).contains(&i) {
                config.default_duration_months = Some(i as u32);
            }
        }

        if let Some(b) = first_value(doc, "action-log-enabled").and_then(|v| v.as_bool()) {
            config.action_log_enabled = Some(b);
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref format) = self.output_format {
            push_node(&mut doc, "output-format", KdlValue::String(format.as_str().to_string()));
        }
        if let Some(ref user) = self.default_user {
            push_node(&mut doc, "default-user", KdlValue::String(user.clone()));
        }
        if let Some(ref product) = self.default_product {
            push_node(&mut doc, "default-product", KdlValue::String(product.clone()));
        }
        if let Some(months) = self.default_duration_months {
            push_node(&mut doc, "default-duration-months", KdlValue::Integer(months as i128));
        }
        if let Some(enabled) = self.action_log_enabled {
            push_node(&mut doc, "action-log-enabled", KdlValue::Bool(enabled));
        }

        doc
    }

    /// Read a value by key, formatted as a string.
    pub fn get(&self, key: &str) -> Result<Option<String>, String> {
        let value = match key {
            "output-format" => self.output_format.as_ref().map(|f| f.as_str().to_string()),
            "default-user" => self.default_user.clone(),
            "default-product" => self.default_product.clone(),
            "default-duration-months" => self.default_duration_months.map(|m| m.to_string()),
            "action-log-enabled" => self.action_log_enabled.map(|b| b.to_string()),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Set a value by key from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "output-format" => {
                let format = OutputFormat::parse(value)
                    .ok_or_else(|| format!("output-format must be json or human, got {}", value))?;
                self.output_format = Some(format);
            }
            "default-user" => self.default_user = Some(value.trim().to_lowercase()),
            "default-product" => self.default_product = Some(value.trim().to_lowercase()),
            "default-duration-months" => {
                let months = value
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| format!("default-duration-months must be a number, got {}", value))?;
                self.default_duration_months = Some(months);
            }
            "action-log-enabled" => {
                let enabled = match value.trim().to_lowercase().as_str() {
                    "true" | "yes" | "on" | "1" => true,
                    "false" | "no" | "off" | "0" => false,
                    _ => return Err(format!("action-log-enabled must be true or false, got {}", value)),
                };
                self.action_log_enabled = Some(enabled);
            }
            _ => return Err(unknown_key(key)),
        }
        self.validate()
    }
}

fn unknown_key(key: &str) -> String {
    format!(
        "Unknown config key: {} (expected one of: {})",
        key,
        RoteiroConfig::KEYS.join(", ")
    )
}

fn first_value<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlValue> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .map(|entry| entry.value())
}

fn first_string(doc: &KdlDocument, name: &str) -> Option<String> {
    first_value(doc, name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

fn push_node(doc: &mut KdlDocument, name: &str, value: KdlValue) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(value));
    doc.nodes_mut().push(node);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_kdl_round_trip() {
        let config = RoteiroConfig {
            output_format: Some(OutputFormat::Human),
            default_user: Some("ana@example.com".to_string()),
            default_product: Some("web".to_string()),
            default_duration_months: Some(3),
            action_log_enabled: Some(false),
        };
        let text = config.to_kdl().to_string();
        let doc: KdlDocument = text.parse().unwrap();
        assert_eq!(RoteiroConfig::from_kdl(&doc), config);
    }

    #[test]
    fn test_from_kdl_ignores_out_of_range_duration() {
        let doc: KdlDocument = "default-duration-months 99\noutput-format \"xml\"".parse().unwrap();
        let config = RoteiroConfig::from_kdl(&doc);
        assert_eq!(config.default_duration_months, None);
        assert_eq!(config.output_format, None);
    }

    #[test]
    fn test_set_and_get() {
        let mut config = RoteiroConfig::new();
        config.set("default-product", " Web ").unwrap();
        config.set("action-log-enabled", "off").unwrap();
        assert_eq!(config.get("default-product").unwrap().as_deref(), Some("web"));
        assert_eq!(config.get("action-log-enabled").unwrap().as_deref(), Some("false"));
        assert_eq!(config.get("default-user").unwrap(), None);
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let mut config = RoteiroConfig::new();
        assert!(config.set("default-duration-months", "0").is_err());
        assert!(config.set("default-duration-months", "ten").is_err());
        assert!(config.set("output-format", "yaml").is_err());
        assert!(config.set("editor", "vim").is_err());
    }
}
