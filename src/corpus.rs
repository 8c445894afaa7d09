//! Complaint corpus loading
//!
//! The input is a JSON document with a `metadata` block and a `reclamacoes`
//! array. Records are immutable once loaded and the corpus is reloaded on
//! every invocation.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

use crate::error::{AnalystError, Result};

/// Metadata describing where the complaints came from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusMetadata {
    #[serde(default, rename = "fonte", alias = "source")]
    pub source: String,

    #[serde(default, rename = "total_reclamacoes", alias = "total")]
    pub declared_total: usize,

    #[serde(default, rename = "data_extracao", alias = "extraction_date")]
    pub extraction_date: String,
}

/// A single customer complaint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintRecord {
    #[serde(rename = "categoria", alias = "category")]
    pub category: String,

    pub status: String,

    #[serde(rename = "data", alias = "date", deserialize_with = "deserialize_date")]
    pub date: NaiveDate,

    #[serde(default, rename = "titulo", alias = "title")]
    pub title: String,
}

/// The loaded complaint set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corpus {
    #[serde(default)]
    pub metadata: CorpusMetadata,

    #[serde(rename = "reclamacoes", alias = "records")]
    pub records: Vec<ComplaintRecord>,
}

impl Corpus {
    /// Load a corpus from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AnalystError::DataNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let corpus = Self::from_json(&content)?;

        tracing::info!(
            "Loaded {} complaints from {}",
            corpus.records.len(),
            path.display()
        );
        Ok(corpus)
    }

    /// Parse a corpus from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| AnalystError::DataMalformed(e.to_string()))
    }

    /// Build a corpus directly from records
    pub fn new(metadata: CorpusMetadata, records: Vec<ComplaintRecord>) -> Self {
        Self { metadata, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn deserialize_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date: {raw}")))
}

/// Parse the date formats seen in complaint exports
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "metadata": {"fonte": "Reclame Aqui", "total_reclamacoes": 2, "data_extracao": "2025-10-01"},
        "reclamacoes": [
            {"categoria": "App", "status": "Resolvido", "data": "2025-09-28", "titulo": "App travando"},
            {"categoria": "PIX", "status": "Não resolvido", "data": "2025-09-29T14:30:00", "titulo": "PIX não caiu"}
        ]
    }"#;

    #[test]
    fn test_from_json() {
        let corpus = Corpus::from_json(SAMPLE).unwrap();

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.metadata.source, "Reclame Aqui");
        assert_eq!(corpus.metadata.declared_total, 2);
        assert_eq!(corpus.records[0].category, "App");
        assert_eq!(
            corpus.records[1].date,
            NaiveDate::from_ymd_opt(2025, 9, 29).unwrap()
        );
    }

    #[test]
    fn test_missing_records_key_is_malformed() {
        let err = Corpus::from_json(r#"{"metadata": {}}"#).unwrap_err();
        assert!(matches!(err, AnalystError::DataMalformed(_)));
    }

    #[test]
    fn test_bad_date_is_malformed() {
        let err = Corpus::from_json(
            r#"{"reclamacoes": [{"categoria": "App", "status": "Resolvido", "data": "ontem"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AnalystError::DataMalformed(_)));
    }

    #[test]
    fn test_english_aliases_and_missing_metadata() {
        let corpus = Corpus::from_json(
            r#"{"records": [{"category": "Conta", "status": "Resolvido", "date": "01/10/2025", "title": "x"}]}"#,
        )
        .unwrap();

        assert_eq!(corpus.records[0].category, "Conta");
        assert_eq!(
            corpus.records[0].date,
            NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()
        );
        assert!(corpus.metadata.source.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Corpus::load("/nonexistent/reclamacoes.json").unwrap_err();
        assert!(matches!(err, AnalystError::DataNotFound(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let corpus = Corpus::load(file.path()).unwrap();
        assert_eq!(corpus.len(), 2);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 9, 30);
        assert_eq!(parse_date("2025-09-30"), expected);
        assert_eq!(parse_date("2025-09-30T08:00:00Z"), expected);
        assert_eq!(parse_date("2025-09-30 08:00:00"), expected);
        assert_eq!(parse_date("30/09/2025"), expected);
        assert_eq!(parse_date("garbage"), None);
    }
}
