//! Delimited-text connector: one CSV file of question/answer rows.
//!
//! The header row locates the `question` and `answer` columns by
//! case-insensitive name. A file that cannot be opened, or whose header
//! lacks either column, is a configuration error; the build cannot proceed
//! without it. Individual rows that are short, undecodable, or blank are
//! skipped and reported.

use csv::{ByteRecord, ReaderBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::DelimitedCorpusConfig;
use crate::error::{Error, Result};
use crate::models::Document;
use crate::traits::{Connector, ScanReport};

pub struct CsvQaConnector {
    config: DelimitedCorpusConfig,
}

impl CsvQaConnector {
    pub fn new(config: DelimitedCorpusConfig) -> Self {
        Self { config }
    }
}

impl Connector for CsvQaConnector {
    fn name(&self) -> &str {
        "csv"
    }

    fn description(&self) -> &str {
        "question/answer rows from a delimited-text file with a header row"
    }

    fn location(&self) -> PathBuf {
        self.config.path.clone()
    }

    fn scan(&self) -> Result<ScanReport> {
        let path = &self.config.path;
        let mut reader = ReaderBuilder::new()
            .delimiter(self.config.delimiter_byte())
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| {
                Error::Configuration(format!(
                    "cannot open delimited corpus {}: {}",
                    path.display(),
                    e
                ))
            })?;

        let mut records = reader.byte_records();
        let header = match records.next() {
            Some(Ok(header)) => header,
            Some(Err(e)) => {
                return Err(Error::Configuration(format!(
                    "cannot read header of {}: {}",
                    path.display(),
                    e
                )))
            }
            None => {
                return Err(Error::Configuration(format!(
                    "delimited corpus {} is empty (no header row)",
                    path.display()
                )))
            }
        };
        let (q_idx, a_idx) = locate_columns(&header, path)?;
        debug!(path = %path.display(), q_idx, a_idx, "located question/answer columns");

        let mut report = ScanReport::new(self.name());
        report.files_scanned = 1;
        let mut next_id = 0usize;

        for (i, record) in records.enumerate() {
            // header is line 1
            let line = i + 2;
            let location = format!("{}:{}", path.display(), line);
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!(%location, error = %e, "skipping undecodable row");
                    report.skip(location, e.to_string());
                    continue;
                }
            };

            let (Some(question), Some(answer)) = (record.get(q_idx), record.get(a_idx)) else {
                report.skip(location, "row is missing the question or answer column");
                continue;
            };
            let question = String::from_utf8_lossy(question);
            let answer = String::from_utf8_lossy(answer);
            let (question, answer) = (question.trim(), answer.trim());
            if question.is_empty() || answer.is_empty() {
                report.skip(location, "empty question or answer");
                continue;
            }

            report.documents.push(Document::from_qa(
                format!("{}_{}", self.config.id_prefix, next_id),
                question,
                answer,
                self.config.label.clone(),
            ));
            next_id += 1;
        }

        Ok(report)
    }
}

fn locate_columns(header: &ByteRecord, path: &Path) -> Result<(usize, usize)> {
    let names: Vec<String> = header
        .iter()
        .map(|h| {
            String::from_utf8_lossy(h)
                .trim_start_matches('\u{feff}')
                .trim()
                .to_lowercase()
        })
        .collect();

    let find = |wanted: &str| names.iter().position(|n| n == wanted);
    match (find("question"), find("answer")) {
        (Some(q), Some(a)) => Ok((q, a)),
        (q, a) => {
            let missing: Vec<&str> = [("question", q), ("answer", a)]
                .iter()
                .filter(|(_, idx)| idx.is_none())
                .map(|(name, _)| *name)
                .collect();
            Err(Error::Configuration(format!(
                "delimited corpus {} is missing required column(s) {}; found headers: [{}]",
                path.display(),
                missing.join(", "),
                names.join(", ")
            )))
        }
    }
}
