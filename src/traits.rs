//! Connector trait shared by the corpus parsers.
//!
//! Each input corpus format is wrapped in a [`Connector`] that turns its
//! files into [`Document`]s. Connectors never abort on a single bad entry:
//! they record it in [`ScanReport::skipped`] and keep going. Only problems
//! that make the whole source unusable (a missing required file, a header
//! without the expected columns) are returned as errors.
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │        ConnectorRegistry         │
//! │  ┌────────────┐ ┌─────────────┐  │
//! │  │ XML QAPair │ │ CSV q/a rows│  │
//! │  └────────────┘ └─────────────┘  │
//! └───────────────┬──────────────────┘
//!                 ▼
//!        build_corpus() → artifact
//! ```

use serde::Serialize;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::models::Document;

/// An input that was dropped while scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skipped {
    /// File path, optionally suffixed with a row number (`file.csv:12`).
    pub location: String,
    pub reason: String,
}

/// Output of a single connector scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub connector: String,
    pub documents: Vec<Document>,
    /// Number of files opened (including the ones later skipped).
    pub files_scanned: usize,
    pub skipped: Vec<Skipped>,
}

impl ScanReport {
    pub fn new(connector: impl Into<String>) -> Self {
        Self {
            connector: connector.into(),
            ..Default::default()
        }
    }

    pub fn skip(&mut self, location: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(Skipped {
            location: location.into(),
            reason: reason.into(),
        });
    }
}

/// A corpus source that produces documents for the build.
pub trait Connector: Send + Sync {
    /// Short identifier used in logs and progress output (e.g. `"xml"`).
    fn name(&self) -> &str;

    /// One-line description for `medirag sources`.
    fn description(&self) -> &str;

    /// Path the connector reads from.
    fn location(&self) -> PathBuf;

    /// Whether the connector's input currently exists on disk.
    fn is_available(&self) -> bool {
        self.location().exists()
    }

    /// Read the source and return every document it yields.
    fn scan(&self) -> Result<ScanReport>;
}

/// Ordered collection of connectors. Scan order defines document order.
pub struct ConnectorRegistry {
    connectors: Vec<Box<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self {
            connectors: Vec::new(),
        }
    }

    /// Registry holding the configured corpora: markup first, then delimited text.
    pub fn from_config(config: &Config) -> Self {
        use crate::connector_csv::CsvQaConnector;
        use crate::connector_xml::XmlQaConnector;

        let mut registry = Self::new();
        if let Some(markup) = &config.corpus.markup {
            registry.register(Box::new(XmlQaConnector::new(markup.clone())));
        }
        if let Some(delimited) = &config.corpus.delimited {
            registry.register(Box::new(CsvQaConnector::new(delimited.clone())));
        }
        registry
    }

    pub fn register(&mut self, connector: Box<dyn Connector>) {
        self.connectors.push(connector);
    }

    pub fn connectors(&self) -> &[Box<dyn Connector>] {
        &self.connectors
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
