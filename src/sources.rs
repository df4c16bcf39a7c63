//! `medirag sources`: list configured input corpora and their health.

use anyhow::Result;

use crate::config::Config;
use crate::traits::{Connector, ConnectorRegistry};

/// Status column for one connector.
pub fn status(connector: &dyn Connector) -> &'static str {
    if connector.is_available() {
        "OK"
    } else {
        "MISSING"
    }
}

pub fn list_sources(config: &Config) -> Result<()> {
    let registry = ConnectorRegistry::from_config(config);

    println!("{:<10} {:<10} {:<40} DESCRIPTION", "CONNECTOR", "STATUS", "PATH");
    for connector in registry.connectors() {
        println!(
            "{:<10} {:<10} {:<40} {}",
            connector.name(),
            status(connector.as_ref()),
            connector.location().display(),
            connector.description()
        );
    }
    if registry.is_empty() {
        println!("(no corpus configured; add [corpus.markup] or [corpus.delimited])");
    }
    println!();
    println!(
        "artifact: {} ({})",
        config.corpus.artifact.display(),
        if config.corpus.artifact.exists() {
            "present"
        } else {
            "not built"
        }
    );

    Ok(())
}
