//! `rot config` commands.

use serde::Serialize;

use super::{Context, Output, to_json_string};
use crate::config::{ResolvedConfig, RoteiroConfig, load_config, save_config};
use crate::{Error, Result};

#[derive(Serialize)]
pub struct ConfigValue {
    pub key: String,
    pub value: Option<String>,
}

impl Output for ConfigValue {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        match &self.value {
            Some(v) => format!("{} = {}", self.key, v),
            None => format!("{} is not set", self.key),
        }
    }
}

pub fn config_get(ctx: &Context, key: &str) -> Result<ConfigValue> {
    let storage = ctx.open_storage()?;
    let config = load_config(&storage)?;
    let value = config.get(key).map_err(Error::Config)?;
    Ok(ConfigValue {
        key: key.to_string(),
        value,
    })
}

pub fn config_set(ctx: &Context, key: &str, value: &str) -> Result<ConfigValue> {
    let storage = ctx.open_storage()?;
    let mut config = load_config(&storage)?;
    config.set(key, value).map_err(Error::Config)?;
    save_config(&storage, &config)?;
    tracing::info!(key, "updated config");
    Ok(ConfigValue {
        key: key.to_string(),
        value: config.get(key).map_err(Error::Config)?,
    })
}

/// One key with its stored and effective values.
#[derive(Serialize)]
pub struct ConfigEntry {
    pub key: &'static str,
    /// Value stored in config.kdl
    pub value: Option<String>,
    /// Value in effect for this invocation
    pub effective: Option<String>,
    pub source: String,
}

#[derive(Serialize)]
pub struct ConfigList {
    pub entries: Vec<ConfigEntry>,
}

impl Output for ConfigList {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        self.entries
            .iter()
            .map(|e| {
                let effective = e.effective.as_deref().unwrap_or("(unset)");
                format!("{:<24} {:<24} [{}]", e.key, effective, e.source)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn effective_value(resolved: &ResolvedConfig, key: &str) -> (Option<String>, String) {
    match key {
        "output-format" => (
            Some(resolved.output_format.value.to_string()),
            resolved.output_format.source.to_string(),
        ),
        "default-user" => match &resolved.user {
            Some(u) => (Some(u.value.clone()), u.source.to_string()),
            None => (None, "default".to_string()),
        },
        "default-product" => match &resolved.default_product {
            Some(p) => (Some(p.value.clone()), p.source.to_string()),
            None => (None, "default".to_string()),
        },
        "default-duration-months" => (
            Some(resolved.default_duration_months.value.to_string()),
            resolved.default_duration_months.source.to_string(),
        ),
        "action-log-enabled" => (
            Some(resolved.action_log_enabled.value.to_string()),
            resolved.action_log_enabled.source.to_string(),
        ),
        _ => (None, "default".to_string()),
    }
}

pub fn config_list(ctx: &Context) -> Result<ConfigList> {
    let storage = ctx.open_storage()?;
    let config = load_config(&storage)?;
    let resolved = ctx.config(&storage)?;

    let entries = RoteiroConfig::KEYS
        .into_iter()
        .map(|key| {
            let (effective, source) = effective_value(&resolved, key);
            Ok(ConfigEntry {
                key,
                value: config.get(key).map_err(Error::Config)?,
                effective,
                source,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ConfigList { entries })
}
