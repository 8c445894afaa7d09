//! Narrative text built from the aggregates

use std::fmt::Write;

use super::{
    count_status_kind, pending_count, pending_rate, resolution_rate, CategoryStat, StatusKind,
    StatusStat, TrendSummary,
};
use crate::corpus::Corpus;

/// Terms counted across complaint titles
pub const TITLE_WATCHLIST: &[&str] = &[
    "app", "cartão", "pix", "conta", "problema", "erro", "não", "banco",
];

/// How healthy a resolution rate is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionHealth {
    Critical,
    Attention,
    Good,
}

impl ResolutionHealth {
    pub fn from_rate(rate: f64) -> Self {
        if rate < 50.0 {
            ResolutionHealth::Critical
        } else if rate < 70.0 {
            ResolutionHealth::Attention
        } else {
            ResolutionHealth::Good
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResolutionHealth::Critical => "CRÍTICO",
            ResolutionHealth::Attention => "ATENÇÃO",
            ResolutionHealth::Good => "BOM",
        }
    }
}

/// Count watchlist terms in the concatenated, lowercased titles.
/// Only terms that occur are returned, most frequent first.
pub fn title_keyword_counts(corpus: &Corpus) -> Vec<(&'static str, usize)> {
    let all_titles = corpus
        .records
        .iter()
        .map(|r| r.title.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let mut found: Vec<(&'static str, usize)> = TITLE_WATCHLIST
        .iter()
        .map(|term| (*term, all_titles.matches(term).count()))
        .filter(|(_, count)| *count > 0)
        .collect();

    // Stable sort keeps watchlist order among ties
    found.sort_by(|a, b| b.1.cmp(&a.1));
    found
}

/// Format a percentage the way the report tables show it (`60.0`, `33.33`)
pub fn format_percentage(value: f64) -> String {
    let text = format!("{}", value);
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}

/// Executive summary of the corpus
pub fn generate_summary(
    corpus: &Corpus,
    categories: &[CategoryStat],
    statuses: &[StatusStat],
    trends: &TrendSummary,
) -> String {
    let total = corpus.len();
    let mut summary = String::new();

    let _ = writeln!(summary, "RELATÓRIO DE ANÁLISE DE RECLAMAÇÕES - {}", corpus.metadata.source);
    let _ = writeln!(summary);
    let _ = writeln!(summary, "DADOS GERAIS:");
    let _ = writeln!(summary, "• Total de reclamações: {}", total);
    let _ = writeln!(
        summary,
        "• Período analisado: {} a {}",
        trends.date_range.start.format("%Y-%m-%d"),
        trends.date_range.end.format("%Y-%m-%d")
    );
    let _ = writeln!(summary, "• Data da extração: {}", corpus.metadata.extraction_date);
    let _ = writeln!(summary);

    let _ = writeln!(summary, "CATEGORIAS MAIS CITADAS:");
    for (i, stat) in categories.iter().take(3).enumerate() {
        let _ = writeln!(
            summary,
            "{}. {}: {} reclamações ({}%)",
            i + 1,
            stat.label,
            stat.count,
            format_percentage(stat.percentage)
        );
    }
    let _ = writeln!(summary);

    let _ = writeln!(summary, "DISTRIBUIÇÃO POR STATUS:");
    for stat in statuses {
        let _ = writeln!(
            summary,
            "• {}: {} ({}%)",
            stat.label,
            stat.count,
            format_percentage(stat.percentage)
        );
    }
    let _ = writeln!(summary);

    let _ = writeln!(summary, "INSIGHTS IMPORTANTES:");
    let _ = writeln!(
        summary,
        "• Taxa de resolução: {:.1}%",
        resolution_rate(statuses, total)
    );
    let _ = writeln!(
        summary,
        "• Problemas pendentes: {} ({:.1}%)",
        pending_count(statuses),
        pending_rate(statuses, total)
    );
    if let Some(top) = categories.first() {
        let _ = writeln!(
            summary,
            "• Categoria mais problemática: {} ({}% das reclamações)",
            top.label,
            format_percentage(top.percentage)
        );
    }

    let keywords = title_keyword_counts(corpus);
    if !keywords.is_empty() {
        let listed = keywords
            .iter()
            .take(3)
            .map(|(term, count)| format!("{} ({}x)", term, count))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(summary, "• Palavras mais mencionadas nos títulos: {}", listed);
    }

    summary
}

/// Action-oriented insights attached to an analysis response
pub fn strategic_insights(
    total: usize,
    categories: &[CategoryStat],
    statuses: &[StatusStat],
) -> String {
    let rate = resolution_rate(statuses, total);
    let health = ResolutionHealth::from_rate(rate);
    let open = total.saturating_sub(count_status_kind(statuses, StatusKind::Resolved));
    let open_share = if total == 0 { 0.0 } else { open as f64 / total as f64 * 100.0 };
    let critical = categories
        .first()
        .map(|c| c.label.clone())
        .unwrap_or_else(|| "-".to_string());

    let mut insights = String::new();
    let _ = writeln!(insights, "INSIGHTS ESTRATÉGICOS");
    let _ = writeln!(insights);
    let _ = writeln!(insights, "SITUAÇÃO ATUAL:");
    let _ = writeln!(insights, "• Taxa de resolução: {:.1}% ({})", rate, health.label());
    let _ = writeln!(
        insights,
        "• Casos não resolvidos: {} de {} ({:.1}%)",
        open, total, open_share
    );
    let _ = writeln!(insights, "• Categoria mais crítica: {}", critical);
    let _ = writeln!(insights);
    let _ = writeln!(insights, "AÇÕES PRIORITÁRIAS:");
    let _ = writeln!(insights, "1. Resolver os {} casos pendentes", open);
    let _ = writeln!(insights, "2. Investigar a causa dos problemas de {}", critical);
    let _ = writeln!(insights, "3. Implementar follow-up automático das reclamações");
    let _ = writeln!(insights, "4. Capacitar a equipe nas categorias críticas");
    let _ = writeln!(insights);
    let _ = writeln!(insights, "RECOMENDAÇÕES:");
    let _ = writeln!(insights, "• Revisar o processo de {}", critical.to_lowercase());
    let _ = writeln!(insights, "• Adotar SLA de 48h para a primeira resposta");
    let _ = writeln!(insights, "• Acompanhar os indicadores em um painel contínuo");
    if health != ResolutionHealth::Good {
        let _ = writeln!(insights);
        let _ = writeln!(insights, "META: elevar a taxa de resolução para mais de 80% em 30 dias");
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::sample_corpus;
    use crate::analysis::{analyze_categories, analyze_status, analyze_trends};

    #[test]
    fn test_summary_contents() {
        let corpus = sample_corpus();
        let categories = analyze_categories(&corpus);
        let statuses = analyze_status(&corpus);
        let trends = analyze_trends(&corpus).unwrap();

        let summary = generate_summary(&corpus, &categories, &statuses, &trends);

        assert!(summary.contains("Reclame Aqui"));
        assert!(summary.contains("• Total de reclamações: 10"));
        assert!(summary.contains("2025-09-22 a 2025-09-26"));
        assert!(summary.contains("1. App: 6 reclamações (60.0%)"));
        assert!(summary.contains("2. PIX: 4 reclamações (40.0%)"));
        assert!(summary.contains("• Resolvido: 7 (70.0%)"));
        assert!(summary.contains("Taxa de resolução: 70.0%"));
        assert!(summary.contains("Problemas pendentes: 3 (30.0%)"));
        assert!(summary.contains("Categoria mais problemática: App"));
    }

    #[test]
    fn test_title_keyword_counts() {
        let counts = title_keyword_counts(&sample_corpus());

        // "app" x5, "pix" x5, "problema" x5, "erro" x5; ties keep watchlist order
        assert_eq!(counts[0], ("app", 5));
        assert_eq!(counts[1], ("pix", 5));
        assert!(counts.iter().all(|(term, _)| *term != "banco"));
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(60.0), "60.0");
        assert_eq!(format_percentage(33.33), "33.33");
        assert_eq!(format_percentage(0.0), "0.0");
    }

    #[test]
    fn test_resolution_health() {
        assert_eq!(ResolutionHealth::from_rate(35.0), ResolutionHealth::Critical);
        assert_eq!(ResolutionHealth::from_rate(50.0), ResolutionHealth::Attention);
        assert_eq!(ResolutionHealth::from_rate(70.0), ResolutionHealth::Good);
    }

    #[test]
    fn test_strategic_insights() {
        let corpus = sample_corpus();
        let insights = strategic_insights(
            corpus.len(),
            &analyze_categories(&corpus),
            &analyze_status(&corpus),
        );

        assert!(insights.contains("Taxa de resolução: 70.0% (BOM)"));
        assert!(insights.contains("Casos não resolvidos: 3 de 10 (30.0%)"));
        assert!(insights.contains("Categoria mais crítica: App"));
        assert!(!insights.contains("META"));
    }
}
