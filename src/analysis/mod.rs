//! Descriptive statistics over a complaint corpus
//!
//! Everything here is a pure function of the [`Corpus`]: category and status
//! distributions, date-bucketed trends and the derived resolution metrics.

mod summary;

pub use summary::*;

use chrono::{Datelike, NaiveDate};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::corpus::Corpus;
use crate::error::{AnalystError, Result};

/// Count and share of one label (a category or a status)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelStat {
    #[serde(skip)]
    pub label: String,
    pub count: usize,
    pub percentage: f64,
}

pub type CategoryStat = LabelStat;
pub type StatusStat = LabelStat;

/// Inclusive date range of the corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Complaints bucketed by ISO week
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekCount {
    pub iso_year: i32,
    pub week: u32,
    pub count: usize,
}

impl WeekCount {
    pub fn key(&self) -> String {
        format!("{}-W{:02}", self.iso_year, self.week)
    }
}

/// Temporal distribution of complaints
#[derive(Debug, Clone, PartialEq)]
pub struct TrendSummary {
    pub date_range: DateRange,
    pub daily: Vec<(NaiveDate, usize)>,
    pub weekly: Vec<WeekCount>,
}

/// Resolution classes recognised in free-form status labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Resolved,
    Unresolved,
    Unanswered,
    Other,
}

impl StatusKind {
    pub fn classify(label: &str) -> Self {
        let lower = label.trim().to_lowercase();
        match lower.as_str() {
            "resolvido" | "resolvida" | "resolved" | "solucionado" => StatusKind::Resolved,
            "não resolvido" | "nao resolvido" | "não resolvida" | "nao resolvida"
            | "unresolved" | "em aberto" => StatusKind::Unresolved,
            "não respondida" | "nao respondida" | "não respondido" | "nao respondido"
            | "unanswered" => StatusKind::Unanswered,
            _ => StatusKind::Other,
        }
    }
}

/// Category distribution, most frequent first
pub fn analyze_categories(corpus: &Corpus) -> Vec<CategoryStat> {
    count_labels(corpus.records.iter().map(|r| r.category.as_str()), corpus.len())
}

/// Status distribution, most frequent first
pub fn analyze_status(corpus: &Corpus) -> Vec<StatusStat> {
    count_labels(corpus.records.iter().map(|r| r.status.as_str()), corpus.len())
}

fn count_labels<'a>(labels: impl Iterator<Item = &'a str>, total: usize) -> Vec<LabelStat> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }

    let mut stats: Vec<LabelStat> = counts
        .into_iter()
        .map(|(label, count)| LabelStat {
            label: label.to_string(),
            count,
            percentage: percentage(count, total),
        })
        .collect();

    stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    stats
}

/// Share of `count` in `total`, rounded to 2 decimals
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(count as f64 / total as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Daily and weekly complaint counts
pub fn analyze_trends(corpus: &Corpus) -> Result<TrendSummary> {
    let mut daily: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut weekly: BTreeMap<(i32, u32), usize> = BTreeMap::new();

    for record in &corpus.records {
        *daily.entry(record.date).or_insert(0) += 1;
        let iso = record.date.iso_week();
        *weekly.entry((iso.year(), iso.week())).or_insert(0) += 1;
    }

    let start = *daily.keys().next().ok_or(AnalystError::EmptyCorpus)?;
    let end = *daily.keys().next_back().ok_or(AnalystError::EmptyCorpus)?;

    Ok(TrendSummary {
        date_range: DateRange { start, end },
        daily: daily.into_iter().collect(),
        weekly: weekly
            .into_iter()
            .map(|((iso_year, week), count)| WeekCount { iso_year, week, count })
            .collect(),
    })
}

/// Most frequent titles per category, categories ordered by volume
pub fn top_issues(corpus: &Corpus, top_n: usize) -> Vec<(String, Vec<(String, usize)>)> {
    analyze_categories(corpus)
        .into_iter()
        .map(|stat| {
            let titles = corpus
                .records
                .iter()
                .filter(|r| r.category == stat.label && !r.title.trim().is_empty())
                .map(|r| r.title.as_str());
            let mut issues: Vec<(String, usize)> = count_labels(titles, 0)
                .into_iter()
                .map(|s| (s.label, s.count))
                .collect();
            issues.truncate(top_n);
            (stat.label, issues)
        })
        .collect()
}

/// Count of records whose status falls in `kind`
pub fn count_status_kind(statuses: &[StatusStat], kind: StatusKind) -> usize {
    statuses
        .iter()
        .filter(|s| StatusKind::classify(&s.label) == kind)
        .map(|s| s.count)
        .sum()
}

/// Resolved complaints as a percentage of all complaints
pub fn resolution_rate(statuses: &[StatusStat], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count_status_kind(statuses, StatusKind::Resolved) as f64 / total as f64 * 100.0
}

/// Unresolved plus unanswered complaints as a percentage of all complaints
pub fn pending_rate(statuses: &[StatusStat], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    pending_count(statuses) as f64 / total as f64 * 100.0
}

pub fn pending_count(statuses: &[StatusStat]) -> usize {
    count_status_kind(statuses, StatusKind::Unresolved)
        + count_status_kind(statuses, StatusKind::Unanswered)
}

/// Serialize label stats as a JSON object keyed by label, keeping their order
pub fn serialize_stats_map<S>(
    stats: &[LabelStat],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(stats.len()))?;
    for stat in stats {
        map.serialize_entry(&stat.label, stat)?;
    }
    map.end()
}

/// Every derived figure of one analysis run
#[derive(Debug, Clone)]
pub struct CorpusAnalysis {
    pub total: usize,
    pub categories: Vec<CategoryStat>,
    pub statuses: Vec<StatusStat>,
    pub trends: TrendSummary,
    pub summary: String,
    pub insights: String,
}

impl CorpusAnalysis {
    /// Aggregate, bucket and summarize a corpus; fails only when it is empty
    pub fn run(corpus: &Corpus) -> Result<Self> {
        let categories = analyze_categories(corpus);
        let statuses = analyze_status(corpus);
        let trends = analyze_trends(corpus)?;
        let summary = generate_summary(corpus, &categories, &statuses, &trends);
        let insights = strategic_insights(corpus.len(), &categories, &statuses);

        tracing::info!(
            "Analyzed {} complaints: {} categories, {} statuses",
            corpus.len(),
            categories.len(),
            statuses.len()
        );

        Ok(Self {
            total: corpus.len(),
            categories,
            statuses,
            trends,
            summary,
            insights,
        })
    }

    pub fn resolution_rate(&self) -> f64 {
        resolution_rate(&self.statuses, self.total)
    }
}

/// Context statistics handed to the conversational responders
#[derive(Debug, Clone, Serialize)]
pub struct ContextStats {
    pub total_reclamacoes: usize,
    #[serde(serialize_with = "serialize_stats_map")]
    pub categorias: Vec<CategoryStat>,
    #[serde(serialize_with = "serialize_stats_map")]
    pub status: Vec<StatusStat>,
}

impl ContextStats {
    pub fn from_corpus(corpus: &Corpus) -> Self {
        Self {
            total_reclamacoes: corpus.len(),
            categorias: analyze_categories(corpus),
            status: analyze_status(corpus),
        }
    }
}
