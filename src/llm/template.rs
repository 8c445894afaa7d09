//! Rule-based responder used when no hosted model answers
//!
//! Output depends only on the message and the context statistics, never on
//! network state.

use std::fmt::Write;

use super::provider::{GenerationRequest, TextGenerator};
use crate::analysis::{
    count_status_kind, format_percentage, pending_count, resolution_rate, ContextStats,
    ResolutionHealth, StatusKind,
};
use crate::error::Result;
use crate::router::{classify, Direction, Intent, StatusFocus};

const NO_DATA_HINT: &str = "Digite 'analisar reclamações' para carregar os dados.";

/// Deterministic keyword-matched answers
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateResponder;

impl TemplateResponder {
    pub fn new() -> Self {
        Self
    }

    /// Answer a message from templates
    pub fn respond(&self, message: &str, context: Option<&ContextStats>) -> String {
        match classify(message, None) {
            Intent::Greeting => greeting(),
            Intent::StatusQuery(focus) => status_answer(focus, context),
            Intent::CategoryQuery(direction) => category_answer(direction, context),
            Intent::ImprovementQuery => improvement_answer(context),
            Intent::AnalysisCommand { .. } => analysis_hint(),
            Intent::Unknown => capabilities(),
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for TemplateResponder {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        Ok(self.respond(&request.message, request.context.as_ref()))
    }

    fn name(&self) -> &str {
        "Template"
    }
}

fn greeting() -> String {
    "Olá! Sou o agente de análise de reclamações. Posso ajudar com:\n\
     • Análise dos dados de reclamações\n\
     • Categorias mais problemáticas\n\
     • Recomendações de melhoria\n\
     • Geração de relatórios em PDF\n\n\
     O que gostaria de saber?"
        .to_string()
}

fn capabilities() -> String {
    "Sou especialista em análise de reclamações. Posso ajudar com:\n\n\
     • Situação atual das reclamações\n\
     • Categorias mais e menos citadas\n\
     • Recomendações de melhoria\n\
     • Relatórios completos em PDF, inclusive por e-mail\n\n\
     O que gostaria de saber especificamente?"
        .to_string()
}

fn analysis_hint() -> String {
    "Para a análise completa o sistema processa todos os dados, calcula as métricas, \
     gera os gráficos e cria o relatório em PDF. Peça, por exemplo: \
     'analisar reclamações e gerar relatório'."
        .to_string()
}

fn status_answer(focus: StatusFocus, context: Option<&ContextStats>) -> String {
    let Some(ctx) = context else {
        return format!("Para ver o status das reclamações preciso dos dados. {}", NO_DATA_HINT);
    };
    let total = ctx.total_reclamacoes;
    let mut out = String::new();

    match focus {
        StatusFocus::Overall => {
            let rate = resolution_rate(&ctx.status, total);
            let _ = writeln!(out, "SITUAÇÃO ATUAL:");
            let _ = writeln!(out, "• Total de reclamações: {}", total);
            let _ = writeln!(out, "• Categorias identificadas: {}", ctx.categorias.len());
            let _ = writeln!(out, "• Taxa de resolução: {:.1}%", rate);
            let _ = writeln!(out, "• Status: {}", ResolutionHealth::from_rate(rate).label());
            let _ = write!(out, "\nPrecisa de uma análise detalhada?");
        }
        StatusFocus::Resolved => {
            let resolved = count_status_kind(&ctx.status, StatusKind::Resolved);
            let rate = resolution_rate(&ctx.status, total);
            let _ = writeln!(out, "RECLAMAÇÕES RESOLVIDAS:");
            let _ = writeln!(out, "• Quantidade: {} casos", resolved);
            let _ = writeln!(out, "• Taxa: {:.1}% do total", rate);
            let _ = writeln!(out, "• Avaliação: {}", ResolutionHealth::from_rate(rate).label());
            let _ = write!(out, "\nQuer estratégias para melhorar?");
        }
        StatusFocus::Pending => {
            let unresolved = count_status_kind(&ctx.status, StatusKind::Unresolved);
            let unanswered = count_status_kind(&ctx.status, StatusKind::Unanswered);
            let _ = writeln!(out, "RECLAMAÇÕES PENDENTES:");
            let _ = writeln!(out, "• Não resolvidas: {}", unresolved);
            let _ = writeln!(out, "• Não respondidas: {}", unanswered);
            let _ = writeln!(out, "• Total pendente: {} casos", pending_count(&ctx.status));
            let _ = write!(out, "\nPrecisa de um plano de ação?");
        }
    }
    out
}

fn category_answer(direction: Direction, context: Option<&ContextStats>) -> String {
    let categories = match context {
        Some(ctx) if !ctx.categorias.is_empty() => &ctx.categorias,
        _ => return format!("Ainda não tenho as categorias carregadas. {}", NO_DATA_HINT),
    };

    // Categories arrive ordered by descending count
    match direction {
        Direction::Most => {
            let top = &categories[0];
            format!(
                "CATEGORIA COM MAIS RECLAMAÇÕES:\n• {}: {} casos ({}%)\n• Requer atenção imediata",
                top.label,
                top.count,
                format_percentage(top.percentage)
            )
        }
        Direction::Least => {
            let bottom = &categories[categories.len() - 1];
            format!(
                "CATEGORIA COM MENOS RECLAMAÇÕES:\n• {}: {} casos ({}%)\n• Baixa incidência nesta categoria",
                bottom.label,
                bottom.count,
                format_percentage(bottom.percentage)
            )
        }
        Direction::Overview => {
            let mut out = String::from("RESUMO DAS CATEGORIAS:\n");
            for stat in categories {
                let _ = writeln!(
                    out,
                    "• {}: {} ({}%)",
                    stat.label,
                    stat.count,
                    format_percentage(stat.percentage)
                );
            }
            let _ = write!(out, "Total de categorias: {}", categories.len());
            out
        }
    }
}

fn improvement_answer(context: Option<&ContextStats>) -> String {
    let mut out = String::from("RECOMENDAÇÕES:\n\n1. PRIORIZAR RESOLUÇÃO:\n");
    if let Some(ctx) = context {
        let pending = pending_count(&ctx.status);
        let _ = writeln!(out, "   • Atacar os {} casos pendentes", pending);
    } else {
        let _ = writeln!(out, "   • Atacar os casos pendentes");
    }
    out.push_str("   • Implementar follow-up automático\n\n2. MELHORAR O ATENDIMENTO:\n");
    out.push_str("   • Treinamento específico por categoria\n   • Reduzir o tempo de resposta\n");
    if let Some(top) = context.and_then(|ctx| ctx.categorias.first()) {
        let _ = write!(out, "\n3. AÇÃO IMEDIATA:\n   • Revisar o processo de {}\n", top.label);
    }
    out.push_str("\nQuer o relatório completo?");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::sample_corpus;

    fn context() -> ContextStats {
        ContextStats::from_corpus(&sample_corpus())
    }

    #[test]
    fn test_greeting() {
        let responder = TemplateResponder::new();
        assert!(responder.respond("oi", None).starts_with("Olá!"));
    }

    #[test]
    fn test_deterministic() {
        let responder = TemplateResponder::new();
        let ctx = context();
        let first = responder.respond("qual a situação?", Some(&ctx));
        let second = responder.respond("qual a situação?", Some(&ctx));
        assert_eq!(first, second);
    }

    #[test]
    fn test_status_overall() {
        let answer = TemplateResponder::new().respond("qual a situação?", Some(&context()));

        assert!(answer.contains("Total de reclamações: 10"));
        assert!(answer.contains("Taxa de resolução: 70.0%"));
        assert!(answer.contains("Status: BOM"));
    }

    #[test]
    fn test_status_without_context() {
        let answer = TemplateResponder::new().respond("qual o status?", None);
        assert!(answer.contains("analisar reclamações"));
    }

    #[test]
    fn test_category_most_and_least() {
        let ctx = context();
        let responder = TemplateResponder::new();

        let most = responder.respond("categoria com mais reclamações", Some(&ctx));
        assert!(most.contains("App: 6 casos (60.0%)"));

        let least = responder.respond("categoria com menos reclamações", Some(&ctx));
        assert!(least.contains("PIX: 4 casos (40.0%)"));
    }

    #[test]
    fn test_pending() {
        let answer = TemplateResponder::new().respond("quantas estão pendentes?", Some(&context()));
        assert!(answer.contains("Não resolvidas: 3"));
        assert!(answer.contains("Total pendente: 3 casos"));

        for negated in ["e as não resolvidas?", "quantas nao resolvidas?"] {
            let answer = TemplateResponder::new().respond(negated, Some(&context()));
            assert!(answer.contains("Total pendente: 3 casos"), "{}", negated);
            assert!(!answer.contains("RECLAMAÇÕES RESOLVIDAS"), "{}", negated);
        }
    }

    #[test]
    fn test_improvement_mentions_top_category() {
        let answer = TemplateResponder::new().respond("como melhorar?", Some(&context()));
        assert!(answer.contains("Revisar o processo de App"));
    }

    #[test]
    fn test_unknown_lists_capabilities() {
        let answer = TemplateResponder::new().respond("obrigado", None);
        assert!(answer.contains("Posso ajudar"));
    }

    #[tokio::test]
    async fn test_as_text_generator() {
        let responder = TemplateResponder::new();
        let request = GenerationRequest::new("oi", None);

        assert_eq!(responder.generate(&request).await.unwrap(), responder.respond("oi", None));
        assert_eq!(responder.name(), "Template");
    }
}
