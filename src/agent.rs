//! Invocation handling: route a request to conversation or the full analysis
//! pipeline

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::analysis::{
    serialize_stats_map, CategoryStat, ContextStats, CorpusAnalysis, DateRange, StatusStat,
    TrendSummary,
};
use crate::config::Config;
use crate::corpus::Corpus;
use crate::error::{AnalystError, Result};
use crate::llm::{GenerationRequest, ResponseStrategy};
use crate::mail::MailDispatcher;
use crate::report::{render_report, reserve_report_path};
use crate::router::{classify, Intent};

/// Prompt used when a request carries none
pub const DEFAULT_PROMPT: &str = "Analisar reclamações";

/// One invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvokeRequest {
    #[serde(default)]
    pub prompt: Option<String>,

    #[serde(default)]
    pub email: Option<String>,
}

impl InvokeRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Trend block of an analysis response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendsReport {
    pub date_range: DateRange,
    pub daily_trends_count: usize,
    pub weekly_trends_summary: BTreeMap<String, usize>,
}

impl From<&TrendSummary> for TrendsReport {
    fn from(trends: &TrendSummary) -> Self {
        Self {
            date_range: trends.date_range,
            daily_trends_count: trends.daily.len(),
            weekly_trends_summary: trends.weekly.iter().map(|w| (w.key(), w.count)).collect(),
        }
    }
}

/// Result of an invocation, tagged by `status`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ChatResponse {
    Conversational {
        response: String,
        context_available: bool,
    },
    Success {
        summary: String,
        #[serde(serialize_with = "serialize_stats_map")]
        categoria_analysis: Vec<CategoryStat>,
        #[serde(serialize_with = "serialize_stats_map")]
        status_analysis: Vec<StatusStat>,
        trends: TrendsReport,
        pdf_generated: bool,
        pdf_filename: Option<String>,
        ai_insights: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        email_sent: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        email_message: Option<String>,
    },
    Error {
        result: String,
    },
}

/// The complaint analysis assistant
pub struct Agent {
    config: Config,
    strategy: ResponseStrategy,
    mailer: MailDispatcher,
}

impl Agent {
    pub fn new(config: Config) -> Self {
        let strategy = ResponseStrategy::new(&config);
        let mailer = MailDispatcher::new(&config);
        Self::with_parts(config, strategy, mailer)
    }

    /// Build an agent from explicit collaborators
    pub fn with_parts(config: Config, strategy: ResponseStrategy, mailer: MailDispatcher) -> Self {
        Self {
            config,
            strategy,
            mailer,
        }
    }

    /// Directory reports are written to and downloaded from
    pub fn results_dir(&self) -> &Path {
        &self.config.output.directory
    }

    /// Handle one request; failures come back as [`ChatResponse::Error`]
    pub async fn invoke(&self, request: InvokeRequest) -> ChatResponse {
        let prompt = request
            .prompt
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROMPT.to_string());

        let intent = classify(&prompt, request.email.as_deref());
        tracing::debug!("Classified {:?} as {:?}", prompt, intent);

        match intent {
            Intent::AnalysisCommand { recipient } => self.analyze(recipient).await,
            _ => self.converse(&prompt).await,
        }
    }

    async fn converse(&self, prompt: &str) -> ChatResponse {
        let context = match Corpus::load(&self.config.data.path) {
            Ok(corpus) => Some(ContextStats::from_corpus(&corpus)),
            Err(e) => {
                tracing::debug!("Answering without data context: {}", e);
                None
            }
        };
        let context_available = context.is_some();

        let response = self
            .strategy
            .respond(&GenerationRequest::new(prompt, context))
            .await;

        ChatResponse::Conversational {
            response,
            context_available,
        }
    }

    /// Run the full pipeline and optionally mail the report
    pub async fn analyze(&self, recipient: Option<String>) -> ChatResponse {
        match self.run_pipeline(recipient).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Analysis failed: {}", e);
                ChatResponse::Error {
                    result: format!("Erro na análise: {}", e),
                }
            }
        }
    }

    async fn run_pipeline(&self, recipient: Option<String>) -> Result<ChatResponse> {
        tracing::info!("Loading complaints from {}", self.config.data.path.display());
        let corpus = Corpus::load(&self.config.data.path)?;
        let analysis = CorpusAnalysis::run(&corpus)?;

        let (filename, pdf_path) = self
            .render(corpus, analysis.clone(), self.results_dir().to_path_buf())
            .await?;

        let (email_sent, email_message) = match recipient {
            Some(to) => {
                tracing::info!("Mailing report to {}", to);
                let outcome = self
                    .mailer
                    .send_report(Some(&pdf_path), &analysis.summary, &to)
                    .await;
                (Some(outcome.sent), Some(outcome.message))
            }
            None => (None, None),
        };

        Ok(ChatResponse::Success {
            trends: TrendsReport::from(&analysis.trends),
            summary: analysis.summary,
            categoria_analysis: analysis.categories,
            status_analysis: analysis.statuses,
            pdf_generated: true,
            pdf_filename: Some(filename),
            ai_insights: analysis.insights,
            email_sent,
            email_message,
        })
    }

    /// Charts and PDF are CPU-bound; keep them off the async workers
    async fn render(
        &self,
        corpus: Corpus,
        analysis: CorpusAnalysis,
        dir: PathBuf,
    ) -> Result<(String, PathBuf)> {
        tokio::task::spawn_blocking(move || {
            let (filename, path) = reserve_report_path(&dir, Local::now())?;
            render_report(&corpus, &analysis, &path)?;
            Ok((filename, path))
        })
        .await
        .map_err(AnalystError::render)?
    }
}
