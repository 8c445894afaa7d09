//! Request router - classifies free-text requests into intents
//!
//! Analysis commands trigger the report pipeline; every other intent is
//! answered conversationally.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\w.\-]+@[\w.\-]+\.\w+").expect("valid email pattern"));

/// Which end of the category ranking a question is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Most,
    Least,
    Overview,
}

/// Which part of the status breakdown a question is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFocus {
    Overall,
    Resolved,
    Pending,
}

/// Classified purpose of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    StatusQuery(StatusFocus),
    CategoryQuery(Direction),
    ImprovementQuery,
    AnalysisCommand { recipient: Option<String> },
    Unknown,
}

impl Intent {
    pub fn is_analysis(&self) -> bool {
        matches!(self, Intent::AnalysisCommand { .. })
    }
}

/// Keyword tables driving classification
pub struct IntentKeywords {
    pub analysis: Vec<&'static str>,
    pub greeting: Vec<&'static str>,
    pub status: Vec<&'static str>,
    pub resolved: Vec<&'static str>,
    pub pending: Vec<&'static str>,
    pub category: Vec<&'static str>,
    pub most: Vec<&'static str>,
    pub least: Vec<&'static str>,
    pub improvement: Vec<&'static str>,
}

impl Default for IntentKeywords {
    fn default() -> Self {
        Self {
            analysis: vec![
                "analisar", "analyze", "relatório", "relatorio",
                "report", "gerar", "generate", "pdf", "email", "e-mail", "envie",
                "enviar", "send", "detalhado", "detailed",
            ],
            greeting: vec![
                "oi", "olá", "ola", "hello", "hi", "bom dia", "boa tarde", "boa noite",
            ],
            status: vec![
                "situação", "situacao", "status", "como está", "como esta",
            ],
            resolved: vec![
                "resolvido", "resolvida", "resolvidas", "resolvidos", "solucionado", "resolved",
            ],
            pending: vec![
                "pendente", "pendentes", "não resolvid", "nao resolvid", "aberta",
                "em aberto", "não respondid", "pending", "unresolved",
            ],
            category: vec![
                "categoria", "tipo", "problema", "category",
            ],
            most: vec![
                "mais", "maior", "alta", "máximo", "maximo", "crítica", "critica",
                "problemática", "most",
            ],
            least: vec![
                "menos", "menor", "baixa", "mínimo", "minimo", "pequena", "least", "fewest",
            ],
            improvement: vec![
                "melhorar", "melhoria", "resolver", "solução", "solucao", "sugest",
                "recomend", "improve",
            ],
        }
    }
}

/// Find the first email-like substring
pub fn extract_email(text: &str) -> Option<String> {
    EMAIL_PATTERN.find(text).map(|m| m.as_str().to_string())
}

/// Classify a request. An explicit recipient takes precedence over an
/// address found in the text.
pub fn classify(text: &str, explicit_recipient: Option<&str>) -> Intent {
    let lower = text.to_lowercase();
    let keywords = IntentKeywords::default();

    let extracted = extract_email(text);
    let has_analysis_keyword = keywords.analysis.iter().any(|k| contains_stem(&lower, k));

    if has_analysis_keyword || extracted.is_some() {
        let recipient = explicit_recipient
            .filter(|r| !r.trim().is_empty())
            .map(|r| r.trim().to_string())
            .or(extracted);
        return Intent::AnalysisCommand { recipient };
    }

    let intent = classify_conversational(&lower, &keywords);
    tracing::debug!("Classified {:?} as {:?}", text, intent);
    intent
}

fn classify_conversational(lower: &str, keywords: &IntentKeywords) -> Intent {
    let any_stem = |list: &[&str]| list.iter().any(|k| contains_stem(lower, k));

    // "não resolvidas" also contains a resolved stem
    if any_stem(&keywords.pending) {
        return Intent::StatusQuery(StatusFocus::Pending);
    }
    if any_stem(&keywords.resolved) {
        return Intent::StatusQuery(StatusFocus::Resolved);
    }
    if any_stem(&keywords.status) {
        return Intent::StatusQuery(StatusFocus::Overall);
    }

    if any_stem(&keywords.category) {
        let direction = if any_stem(&keywords.least) {
            Direction::Least
        } else if any_stem(&keywords.most) {
            Direction::Most
        } else {
            Direction::Overview
        };
        return Intent::CategoryQuery(direction);
    }

    if any_stem(&keywords.improvement) {
        return Intent::ImprovementQuery;
    }

    if keywords.greeting.iter().any(|k| contains_word(lower, k)) {
        return Intent::Greeting;
    }

    Intent::Unknown
}

/// `needle` occurs in `haystack` starting at a word boundary
fn contains_stem(haystack: &str, needle: &str) -> bool {
    haystack
        .match_indices(needle)
        .any(|(idx, _)| starts_word(haystack, idx))
}

/// `needle` occurs in `haystack` as a whole word
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(idx, m)| {
        let end = idx + m.len();
        starts_word(haystack, idx)
            && haystack[end..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric())
    })
}

fn starts_word(haystack: &str, idx: usize) -> bool {
    haystack[..idx]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting() {
        assert_eq!(classify("oi", None), Intent::Greeting);
        assert_eq!(classify("Olá!", None), Intent::Greeting);
        assert_eq!(classify("bom dia", None), Intent::Greeting);
        assert!(!classify("oi", None).is_analysis());
    }

    #[test]
    fn test_greeting_requires_whole_word() {
        // "oi" inside "noite" or "oito" is not a greeting
        assert_eq!(classify("oito", None), Intent::Unknown);
    }

    #[test]
    fn test_analysis_with_email() {
        let intent = classify("Analisar reclamações e enviar para cliente@example.com", None);
        assert_eq!(
            intent,
            Intent::AnalysisCommand {
                recipient: Some("cliente@example.com".to_string())
            }
        );
    }

    #[test]
    fn test_email_alone_forces_analysis() {
        let intent = classify("manda pra joao.silva@empresa.com.br.", None);
        assert_eq!(
            intent,
            Intent::AnalysisCommand {
                recipient: Some("joao.silva@empresa.com.br".to_string())
            }
        );
    }

    #[test]
    fn test_explicit_recipient_wins() {
        let intent = classify("enviar para cliente@example.com", Some("gestor@example.com"));
        assert_eq!(
            intent,
            Intent::AnalysisCommand {
                recipient: Some("gestor@example.com".to_string())
            }
        );
    }

    #[test]
    fn test_analysis_without_email() {
        assert_eq!(
            classify("Gerar relatório detalhado", None),
            Intent::AnalysisCommand { recipient: None }
        );
        assert!(classify("please generate the PDF", None).is_analysis());
    }

    #[test]
    fn test_category_directions() {
        assert_eq!(
            classify("Qual a categoria com mais reclamações?", None),
            Intent::CategoryQuery(Direction::Most)
        );
        assert_eq!(
            classify("qual categoria tem menos casos?", None),
            Intent::CategoryQuery(Direction::Least)
        );
        assert_eq!(
            classify("quais os tipos existentes?", None),
            Intent::CategoryQuery(Direction::Overview)
        );
    }

    #[test]
    fn test_status_queries() {
        assert_eq!(
            classify("Qual a situação atual?", None),
            Intent::StatusQuery(StatusFocus::Overall)
        );
        assert_eq!(
            classify("quantas foram resolvidas?", None),
            Intent::StatusQuery(StatusFocus::Resolved)
        );
        assert_eq!(
            classify("e as pendentes?", None),
            Intent::StatusQuery(StatusFocus::Pending)
        );
        for negated in [
            "e as não resolvidas?",
            "quantas nao resolvidas?",
            "quantas estão não resolvidas?",
        ] {
            assert_eq!(
                classify(negated, None),
                Intent::StatusQuery(StatusFocus::Pending),
                "{}",
                negated
            );
        }
    }

    #[test]
    fn test_analysis_noun_stays_conversational() {
        assert_eq!(
            classify("me dá uma análise rápida das categorias", None),
            Intent::CategoryQuery(Direction::Overview)
        );
        assert!(classify("Analisar reclamações", None).is_analysis());
    }

    #[test]
    fn test_improvement_and_unknown() {
        assert_eq!(
            classify("como melhorar o atendimento", None),
            Intent::ImprovementQuery
        );
        assert_eq!(classify("obrigado", None), Intent::Unknown);
    }

    #[test]
    fn test_extract_email() {
        assert_eq!(extract_email("sem endereço aqui"), None);
        assert_eq!(
            extract_email("para a.b-c@x.io agora"),
            Some("a.b-c@x.io".to_string())
        );
    }
}
