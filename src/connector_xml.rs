//! Structured-markup connector: `QAPair` elements from a tree of XML files.
//!
//! Walks the configured root recursively and extracts every `QAPair` whose
//! direct `Question` and `Answer` children both carry non-empty text. A file
//! that fails to parse is skipped as a whole; nothing it contained is kept.
//!
//! ```xml
//! <Document>
//!   <QAPairs>
//!     <QAPair pid="1">
//!       <Question qid="1">What is fever?</Question>
//!       <Answer>Elevated body temperature.</Answer>
//!     </QAPair>
//!   </QAPairs>
//! </Document>
//! ```

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::MarkupCorpusConfig;
use crate::error::{Error, Result};
use crate::models::Document;
use crate::traits::{Connector, ScanReport};

const QA_PAIR: &[u8] = b"QAPair";
const QUESTION: &[u8] = b"Question";
const ANSWER: &[u8] = b"Answer";

/// A question/answer pair as found in the markup, untrimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

pub struct XmlQaConnector {
    config: MarkupCorpusConfig,
}

impl XmlQaConnector {
    pub fn new(config: MarkupCorpusConfig) -> Self {
        Self { config }
    }

    fn source_label(&self, path: &Path) -> String {
        match path.parent().and_then(|p| p.file_name()) {
            Some(folder) => format!("{} | {}", self.config.label, folder.to_string_lossy()),
            None => self.config.label.clone(),
        }
    }
}

impl Connector for XmlQaConnector {
    fn name(&self) -> &str {
        "xml"
    }

    fn description(&self) -> &str {
        "QAPair question/answer elements from a directory tree of XML files"
    }

    fn location(&self) -> PathBuf {
        self.config.root.clone()
    }

    fn scan(&self) -> Result<ScanReport> {
        let mut report = ScanReport::new(self.name());
        let root = &self.config.root;

        if !root.exists() {
            info!(root = %root.display(), "markup corpus root does not exist, nothing to scan");
            return Ok(report);
        }

        let include_set = build_globset(&self.config.include_globs)?;
        let mut next_id = 0usize;

        let walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let location = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| root.display().to_string());
                    warn!(%location, error = %e, "skipping unreadable directory entry");
                    report.skip(location, e.to_string());
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            if !include_set.is_match(relative) {
                continue;
            }

            report.files_scanned += 1;
            match parse_file(path) {
                Ok(pairs) => {
                    let source = self.source_label(path);
                    debug!(path = %path.display(), pairs = pairs.len(), "parsed markup file");
                    for pair in pairs {
                        report.documents.push(Document::from_qa(
                            format!("{}_{}", self.config.id_prefix, next_id),
                            pair.question.trim(),
                            pair.answer.trim(),
                            source.clone(),
                        ));
                        next_id += 1;
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unparseable markup file");
                    report.skip(path.display().to_string(), e.to_string());
                }
            }
        }

        Ok(report)
    }
}

fn parse_file(path: &Path) -> Result<Vec<QaPair>> {
    let bytes = std::fs::read(path).map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_qa_pairs(&bytes).map_err(|message| Error::Parse {
        path: path.to_path_buf(),
        message,
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Question,
    Answer,
}

#[derive(Default)]
struct OpenPair {
    question: Option<String>,
    answer: Option<String>,
}

struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

/// Extracts the complete `QAPair` entries from one XML document.
///
/// Only pairs whose question and answer are both non-empty after trimming
/// are returned. The first `Question`/`Answer` child of a pair wins. Any
/// syntax error, bad entity, or unclosed element fails the whole document.
pub fn parse_qa_pairs(xml: &[u8]) -> std::result::Result<Vec<QaPair>, String> {
    let mut reader = Reader::from_reader(xml);

    let mut buf = Vec::new();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut open_pairs: Vec<OpenPair> = Vec::new();
    let mut capture: Option<Capture> = None;
    let mut pairs = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| format!("{} at byte {}", e, reader.buffer_position()))?;
        match event {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                let parent_is_pair = stack.last().map(|p| p.as_slice()) == Some(QA_PAIR);
                if capture.is_none() && parent_is_pair {
                    let field = match name.as_slice() {
                        QUESTION => Some(Field::Question),
                        ANSWER => Some(Field::Answer),
                        _ => None,
                    };
                    if let Some(field) = field {
                        capture = Some(Capture {
                            field,
                            depth: stack.len(),
                            text: String::new(),
                        });
                    }
                }
                if name.as_slice() == QA_PAIR {
                    open_pairs.push(OpenPair::default());
                }
                stack.push(name);
            }
            Event::Text(t) => {
                if let Some(c) = capture.as_mut() {
                    let text = t.unescape().map_err(|e| e.to_string())?;
                    c.text.push_str(&text);
                }
            }
            Event::CData(t) => {
                if let Some(c) = capture.as_mut() {
                    c.text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Event::End(e) => {
                stack.pop();
                if capture.as_ref().map(|c| c.depth) == Some(stack.len()) {
                    if let (Some(c), Some(pair)) = (capture.take(), open_pairs.last_mut()) {
                        let slot = match c.field {
                            Field::Question => &mut pair.question,
                            Field::Answer => &mut pair.answer,
                        };
                        if slot.is_none() {
                            *slot = Some(c.text);
                        }
                    }
                }
                if e.local_name().as_ref() == QA_PAIR {
                    if let Some(OpenPair {
                        question: Some(question),
                        answer: Some(answer),
                    }) = open_pairs.pop()
                    {
                        if !question.trim().is_empty() && !answer.trim().is_empty() {
                            pairs.push(QaPair { question, answer });
                        }
                    }
                }
            }
            Event::Eof => {
                if let Some(open) = stack.last() {
                    return Err(format!(
                        "unexpected end of document: <{}> is not closed",
                        String::from_utf8_lossy(open)
                    ));
                }
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(pairs)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Configuration(format!("invalid include glob '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::Configuration(format!("invalid include globs: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn connector(root: &Path) -> XmlQaConnector {
        XmlQaConnector::new(MarkupCorpusConfig {
            root: root.to_path_buf(),
            label: "BioASQ".to_string(),
            id_prefix: "bioasq".to_string(),
            include_globs: vec!["**/*.xml".to_string()],
            follow_symlinks: false,
        })
    }

    const TWO_PAIRS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Document id="0001">
  <QAPairs>
    <QAPair pid="1">
      <Question qid="1">What is fever?</Question>
      <Answer>Elevated body temperature.</Answer>
    </QAPair>
    <QAPair pid="2">
      <Question qid="2">What is cough?</Question>
      <Answer>A reflex clearing airways.</Answer>
    </QAPair>
  </QAPairs>
</Document>"#;

    #[test]
    fn parses_pairs_in_document_order() {
        let pairs = parse_qa_pairs(TWO_PAIRS.as_bytes()).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].question, "What is fever?");
        assert_eq!(pairs[1].answer, "A reflex clearing airways.");
    }

    #[test]
    fn pair_without_answer_is_dropped() {
        let xml = r#"<QAPairs>
  <QAPair><Question>Orphan question?</Question></QAPair>
  <QAPair><Question>Kept?</Question><Answer>Yes.</Answer></QAPair>
</QAPairs>"#;
        let pairs = parse_qa_pairs(xml.as_bytes()).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question, "Kept?");
    }

    #[test]
    fn blank_fields_are_dropped() {
        let xml = r#"<QAPairs>
  <QAPair><Question>   </Question><Answer>Something.</Answer></QAPair>
  <QAPair><Question>Q?</Question><Answer/></QAPair>
</QAPairs>"#;
        assert!(parse_qa_pairs(xml.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn entities_and_cdata_are_decoded() {
        let xml = r#"<QAPair><Question>Salt &amp; water?</Question><Answer><![CDATA[Use <1 g>.]]></Answer></QAPair>"#;
        let pairs = parse_qa_pairs(xml.as_bytes()).unwrap();
        assert_eq!(pairs[0].question, "Salt & water?");
        assert_eq!(pairs[0].answer, "Use <1 g>.");
    }

    #[test]
    fn inline_markup_keeps_surrounding_spaces() {
        let xml = r#"<QAPair><Question>What is fever?</Question><Answer>Fever is <b>high</b> body temperature.</Answer></QAPair>"#;
        let pairs = parse_qa_pairs(xml.as_bytes()).unwrap();
        assert_eq!(pairs[0].answer, "Fever is high body temperature.");
    }

    #[test]
    fn nested_question_outside_pair_is_ignored() {
        let xml = r#"<Root><Question>Stray</Question>
<QAPair><Meta><Question>Deep</Question></Meta><Question>Top</Question><Answer>A</Answer></QAPair></Root>"#;
        let pairs = parse_qa_pairs(xml.as_bytes()).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question, "Top");
    }

    #[test]
    fn mismatched_tags_fail_the_document() {
        let xml = r#"<QAPair><Question>Q</Answer></QAPair>"#;
        assert!(parse_qa_pairs(xml.as_bytes()).is_err());
    }

    #[test]
    fn unclosed_document_fails() {
        let xml = r#"<QAPairs><QAPair><Question>Q</Question><Answer>A</Answer></QAPair>"#;
        let err = parse_qa_pairs(xml.as_bytes()).unwrap_err();
        assert!(err.contains("QAPairs"));
    }

    #[test]
    fn missing_root_yields_empty_report() {
        let tmp = TempDir::new().unwrap();
        let report = connector(&tmp.path().join("absent")).scan().unwrap();
        assert!(report.documents.is_empty());
        assert!(report.skipped.is_empty());
        assert_eq!(report.files_scanned, 0);
    }

    #[test]
    fn scan_skips_bad_files_and_labels_by_folder() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("1_CancerGov")).unwrap();
        fs::create_dir_all(root.join("2_GARD")).unwrap();
        fs::write(root.join("1_CancerGov/a.xml"), TWO_PAIRS).unwrap();
        fs::write(root.join("2_GARD/broken.xml"), "<QAPair><Question>oops").unwrap();
        fs::write(
            root.join("2_GARD/c.XML"),
            "<QAPair><Question>Upper?</Question><Answer>Case.</Answer></QAPair>",
        )
        .unwrap();
        fs::write(root.join("2_GARD/notes.txt"), "not xml").unwrap();

        let report = connector(root).scan().unwrap();

        assert_eq!(report.files_scanned, 3);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].location.ends_with("broken.xml"));

        let ids: Vec<&str> = report.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["bioasq_0", "bioasq_1", "bioasq_2"]);
        assert_eq!(report.documents[0].source, "BioASQ | 1_CancerGov");
        assert_eq!(report.documents[2].source, "BioASQ | 2_GARD");
        assert_eq!(report.documents[2].text, "Q: Upper?\nA: Case.");
    }

    #[test]
    fn invalid_glob_is_a_configuration_error() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = MarkupCorpusConfig {
            root: tmp.path().to_path_buf(),
            label: "BioASQ".to_string(),
            id_prefix: "bioasq".to_string(),
            include_globs: vec!["**/[.xml".to_string()],
            follow_symlinks: false,
        };
        let err = XmlQaConnector::new(cfg.clone()).scan().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        cfg.include_globs = vec!["**/*.xml".to_string()];
        assert!(XmlQaConnector::new(cfg).scan().is_ok());
    }
}
