//! Get subcommand: resolve configuration.

use crate::config::{ConfigQuery, ConfigTree, load_tree};
use crate::format::OutputFormat;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the get subcommand
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Resolve a single service's fragment instead of the merged snapshot
    #[arg(short, long)]
    pub service: Option<String>,

    /// Extract a single section
    #[arg(long)]
    pub section: Option<String>,

    /// Comma-separated leaf keys to keep
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub keys: Option<Vec<String>>,

    /// Comma-separated sections to extract (takes priority over --section)
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub sections: Option<Vec<String>>,

    /// Return the section's content without nesting it under its name
    #[arg(long)]
    pub no_section: bool,

    /// YAML file of defaults merged beneath the result
    #[arg(long, value_name = "FILE")]
    pub defaults: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

impl GetArgs {
    /// Build the resolver query, reading the defaults file if given.
    pub fn to_query(&self) -> Result<ConfigQuery> {
        let defaults: Option<ConfigTree> = match self.defaults {
            Some(ref path) => Some(
                load_tree(path)?
                    .with_context(|| format!("defaults file not found: {}", path.display()))?,
            ),
            None => None,
        };

        Ok(ConfigQuery {
            service: self.service.clone(),
            section: self.section.clone(),
            keys: self.keys.clone(),
            multi_sections: self.sections.clone(),
            with_section: !self.no_section,
            defaults,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;

    #[test]
    fn test_parse_get_args() {
        let cli = Cli::parse_from([
            "fragconf",
            "get",
            "--service",
            "memApp",
            "--section",
            "watchdog",
            "--keys",
            "interval,enabled",
            "--no-section",
        ]);
        let Command::Get(args) = cli.command else {
            panic!("expected get");
        };
        let query = args.to_query().unwrap();
        assert_eq!(query.service.as_deref(), Some("memApp"));
        assert_eq!(
            query.keys,
            Some(vec!["interval".to_string(), "enabled".to_string()])
        );
        assert!(!query.with_section);
        assert!(query.defaults.is_none());
    }
}
