//! Set subcommand: change one leaf value.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

/// Arguments for the set subcommand
#[derive(Args, Debug)]
pub struct SetArgs {
    pub service: String,
    pub section: String,
    pub key: String,

    /// New value, parsed as YAML (`30`, `true`, `"30"`, `[a, b]`)
    pub value: String,
}

impl SetArgs {
    /// The value as a typed tree node.
    pub fn parsed_value(&self) -> Result<Value> {
        if self.value.trim().is_empty() {
            return Ok(Value::String(self.value.clone()));
        }
        serde_yaml::from_str(&self.value)
            .with_context(|| format!("cannot parse value {:?}", self.value))
    }
}
