//! PDF report builder
//!
//! Lays out an A4 document with the builtin Helvetica faces: corpus facts,
//! the executive summary, category and status tables, the most frequent
//! titles per category and a charts page.

pub mod charts;

use chrono::{DateTime, Local};
use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Rgb,
};
use std::fs::OpenOptions;
use std::io::{BufWriter, Cursor, ErrorKind};
use std::path::{Path, PathBuf};
use unicode_width::UnicodeWidthStr;

use crate::analysis::{format_percentage, top_issues, CorpusAnalysis, LabelStat};
use crate::corpus::{Corpus, CorpusMetadata};
use crate::error::{AnalystError, Result};
use charts::Chart;

const MAX_NAME_ATTEMPTS: u32 = 1000;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const TOP: f32 = PAGE_HEIGHT - MARGIN;
const BOTTOM: f32 = MARGIN;

/// Titles listed per category
const TOP_ISSUES_PER_CATEGORY: usize = 3;

const DARK_BLUE: (u8, u8, u8) = (26, 54, 93);
const TEXT: (u8, u8, u8) = (33, 33, 33);
const RULE: (u8, u8, u8) = (160, 160, 160);

#[derive(Debug, Clone, Copy)]
struct TextStyle {
    size: f32,
    bold: bool,
    color: (u8, u8, u8),
}

impl TextStyle {
    /// Baseline-to-baseline distance in mm
    fn leading(&self) -> f32 {
        self.size * 0.5
    }

    /// Approximate characters per line of body width
    fn chars_per_line(&self) -> usize {
        (CONTENT_WIDTH / (self.size * 0.19)) as usize
    }
}

const TITLE: TextStyle = TextStyle { size: 18.0, bold: true, color: DARK_BLUE };
const HEADING: TextStyle = TextStyle { size: 13.0, bold: true, color: DARK_BLUE };
const SUBHEADING: TextStyle = TextStyle { size: 11.0, bold: true, color: TEXT };
const BODY: TextStyle = TextStyle { size: 10.0, bold: false, color: TEXT };
const TABLE_HEADER: TextStyle = TextStyle { size: 10.0, bold: true, color: DARK_BLUE };

/// Everything that goes into one report
pub struct ReportContent<'a> {
    pub metadata: &'a CorpusMetadata,
    pub analysis: &'a CorpusAnalysis,
    pub top_issues: &'a [(String, Vec<(String, usize)>)],
    pub charts: &'a [Chart],
    pub generated_at: DateTime<Local>,
}

/// Timestamped report file name
pub fn report_filename(now: DateTime<Local>) -> String {
    format!("relatorio_reclamacoes_{}.pdf", now.format("%Y%m%d_%H%M%S"))
}

/// Claim an unused report file in `dir`. Names taken within the same second
/// get a numeric suffix; the empty file holds the name until the report is
/// written over it.
pub fn reserve_report_path(dir: &Path, now: DateTime<Local>) -> Result<(String, PathBuf)> {
    std::fs::create_dir_all(dir).map_err(AnalystError::render)?;

    let base = report_filename(now);
    let stem = base.trim_end_matches(".pdf");
    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let filename = if attempt == 1 {
            base.clone()
        } else {
            format!("{}_{}.pdf", stem, attempt)
        };
        let path = dir.join(&filename);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => return Ok((filename, path)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(AnalystError::render(e)),
        }
    }

    Err(AnalystError::Render(format!(
        "no free report name for {} in {}",
        base,
        dir.display()
    )))
}

/// Render charts and write the full report for an analyzed corpus
pub fn render_report(corpus: &Corpus, analysis: &CorpusAnalysis, destination: &Path) -> Result<()> {
    let charts = charts::render_all(&analysis.categories, &analysis.statuses, &analysis.trends)?;
    let issues = top_issues(corpus, TOP_ISSUES_PER_CATEGORY);

    let content = ReportContent {
        metadata: &corpus.metadata,
        analysis,
        top_issues: &issues,
        charts: &charts,
        generated_at: Local::now(),
    };

    write_report(&content, destination)
}

/// Write the report PDF, creating the destination directory if needed
pub fn write_report(content: &ReportContent<'_>, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(AnalystError::render)?;
        }
    }

    let bytes = build_pdf(content)?;
    std::fs::write(destination, bytes).map_err(AnalystError::render)?;

    tracing::info!("Report written to {}", destination.display());
    Ok(())
}

/// Lay out the report and return the PDF bytes
pub fn build_pdf(content: &ReportContent<'_>) -> Result<Vec<u8>> {
    let analysis = content.analysis;
    let mut writer = PageWriter::new("Relatório de Análise de Reclamações")?;

    writer.text("RELATÓRIO DE ANÁLISE DE RECLAMAÇÕES", TITLE, 0.0);
    writer.gap(3.0);
    writer.text(&format!("Fonte: {}", content.metadata.source), BODY, 0.0);
    writer.text(&format!("Total de reclamações: {}", analysis.total), BODY, 0.0);
    writer.text(
        &format!(
            "Período analisado: {} a {}",
            analysis.trends.date_range.start.format("%d/%m/%Y"),
            analysis.trends.date_range.end.format("%d/%m/%Y")
        ),
        BODY,
        0.0,
    );
    writer.text(
        &format!("Data da extração: {}", content.metadata.extraction_date),
        BODY,
        0.0,
    );
    writer.text(
        &format!("Gerado em: {}", content.generated_at.format("%d/%m/%Y %H:%M")),
        BODY,
        0.0,
    );

    writer.section("RESUMO EXECUTIVO");
    writer.paragraph(&analysis.summary, BODY);

    writer.section("ANÁLISE DETALHADA POR CATEGORIA");
    writer.stats_table("Categoria", &analysis.categories);

    writer.section("ANÁLISE POR STATUS");
    writer.stats_table("Status", &analysis.statuses);

    if !content.top_issues.is_empty() {
        writer.section("PRINCIPAIS PROBLEMAS POR CATEGORIA");
        for (category, issues) in content.top_issues {
            writer.text(category, SUBHEADING, 0.0);
            for (title, count) in issues {
                let line = format!("- {} ({}x)", title, count);
                for wrapped in wrap_text(&line, BODY.chars_per_line() - 4) {
                    writer.text(&wrapped, BODY, 5.0);
                }
            }
            writer.gap(2.0);
        }
    }

    if !content.charts.is_empty() {
        writer.new_page();
        writer.text("GRÁFICOS E VISUALIZAÇÕES", TITLE, 0.0);
        writer.gap(4.0);
        for chart in content.charts {
            writer.chart(chart)?;
        }
    }

    tracing::debug!("Report laid out on {} pages", writer.pages);
    writer.finish()
}

/// Cursor over the current page, top to bottom
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(AnalystError::render)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(AnalystError::render)?;

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: TOP,
            pages: 1,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = TOP;
        self.pages += 1;
    }

    /// Break the page unless `height` mm still fit
    fn reserve(&mut self, height: f32) {
        if self.y - height < BOTTOM {
            self.new_page();
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn text(&mut self, text: &str, style: TextStyle, indent: f32) {
        self.reserve(style.leading());
        self.y -= style.leading();

        let font = if style.bold { &self.bold } else { &self.regular };
        self.layer.set_fill_color(rgb(style.color));
        self.layer.use_text(
            pdf_safe(text),
            style.size,
            Mm(MARGIN + indent),
            Mm(self.y),
            font,
        );
    }

    fn section(&mut self, title: &str) {
        self.gap(5.0);
        self.reserve(HEADING.leading() + 3.0 * BODY.leading());
        self.text(title, HEADING, 0.0);
        self.gap(1.5);
    }

    fn paragraph(&mut self, text: &str, style: TextStyle) {
        for line in text.lines() {
            if line.trim().is_empty() {
                self.gap(style.leading() / 2.0);
                continue;
            }
            for wrapped in wrap_text(line, style.chars_per_line()) {
                self.text(&wrapped, style, 0.0);
            }
        }
    }

    fn rule(&mut self) {
        let y = self.y - 1.5;
        self.layer.set_outline_color(rgb(RULE));
        self.layer.set_outline_thickness(0.5);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(y)), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(y)), false),
            ],
            is_closed: false,
        });
        self.y -= 2.5;
    }

    /// Three-column table: label, count, percentage
    fn stats_table(&mut self, label_header: &str, stats: &[LabelStat]) {
        const COLUMNS: [f32; 3] = [0.0, 105.0, 140.0];

        self.reserve(TABLE_HEADER.leading() * 3.0);
        self.table_row([label_header, "Quantidade", "Percentual"], TABLE_HEADER, COLUMNS);
        self.rule();

        for stat in stats {
            let count = stat.count.to_string();
            let share = format!("{}%", format_percentage(stat.percentage));
            self.table_row([&stat.label, &count, &share], BODY, COLUMNS);
        }
        self.rule();
    }

    fn table_row(&mut self, cells: [&str; 3], style: TextStyle, columns: [f32; 3]) {
        self.reserve(style.leading());
        self.y -= style.leading();

        let font = if style.bold { &self.bold } else { &self.regular };
        self.layer.set_fill_color(rgb(style.color));
        for (cell, x) in cells.iter().zip(columns) {
            self.layer
                .use_text(pdf_safe(cell), style.size, Mm(MARGIN + x), Mm(self.y), font);
        }
    }

    /// Caption, image scaled to the content width, then the colored legend
    fn chart(&mut self, chart: &Chart) -> Result<()> {
        let width = CONTENT_WIDTH;
        let height = chart.height as f32 * width / chart.width as f32;
        let legend_height = chart.legend.len() as f32 * BODY.leading();

        self.reserve(SUBHEADING.leading() + height + legend_height + 4.0);
        self.text(&chart.title, SUBHEADING, 0.0);
        self.gap(2.0);

        let decoder =
            PngDecoder::new(Cursor::new(chart.png.as_slice())).map_err(AnalystError::render)?;
        let image = Image::try_from(decoder).map_err(AnalystError::render)?;
        let bottom = self.y - height;
        image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN)),
                translate_y: Some(Mm(bottom)),
                dpi: Some(chart.width as f32 * 25.4 / width),
                ..Default::default()
            },
        );
        self.y = bottom - 2.0;

        for entry in &chart.legend {
            let style = TextStyle {
                color: entry.color,
                ..BODY
            };
            self.text(&entry.label, style, 5.0);
        }
        self.gap(6.0);
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.doc
            .save(&mut BufWriter::new(&mut bytes))
            .map_err(AnalystError::render)?;
        Ok(bytes)
    }
}

fn rgb(color: (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(
        color.0 as f32 / 255.0,
        color.1 as f32 / 255.0,
        color.2 as f32 / 255.0,
        None,
    ))
}

/// Restrict text to what the builtin fonts can encode
pub fn pdf_safe(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '•' | '–' | '—' => Some('-'),
            '“' | '”' => Some('"'),
            '‘' | '’' => Some('\''),
            '\t' => Some(' '),
            c if c.is_control() => None,
            c if (c as u32) <= 0xFF => Some(c),
            _ => None,
        })
        .collect()
}

/// Greedy word wrap by display width; overlong words are split
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.width() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split = word
                .char_indices()
                .nth(width)
                .map(|(i, _)| i)
                .unwrap_or(word.len());
            let rest = word.split_off(split);
            lines.push(word);
            word = rest;
        }

        if current.is_empty() {
            current = word;
        } else if current.width() + 1 + word.width() <= width {
            current.push(' ');
            current.push_str(&word);
        } else {
            lines.push(std::mem::replace(&mut current, word));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::sample_corpus;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_report_filename() {
        let now = Local.with_ymd_and_hms(2025, 10, 1, 14, 5, 9).unwrap();
        assert_eq!(report_filename(now), "relatorio_reclamacoes_20251001_140509.pdf");
    }

    #[test]
    fn test_reserve_report_path_never_reuses_a_name() {
        let dir = TempDir::new().unwrap();
        let results = dir.path().join("results");
        let now = Local.with_ymd_and_hms(2025, 10, 1, 14, 5, 9).unwrap();

        let (first, first_path) = reserve_report_path(&results, now).unwrap();
        let (second, second_path) = reserve_report_path(&results, now).unwrap();
        let (third, _) = reserve_report_path(&results, now).unwrap();

        assert_eq!(first, "relatorio_reclamacoes_20251001_140509.pdf");
        assert_eq!(second, "relatorio_reclamacoes_20251001_140509_2.pdf");
        assert_eq!(third, "relatorio_reclamacoes_20251001_140509_3.pdf");
        assert!(first_path.exists());
        assert!(second_path.exists());
    }

    #[test]
    fn test_pdf_safe() {
        assert_eq!(pdf_safe("• Situação – ok"), "- Situação - ok");
        assert_eq!(pdf_safe("gráfico 📊"), "gráfico ");
    }

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("um dois três quatro cinco seis", 10);

        assert!(lines.iter().all(|l| l.width() <= 10));
        assert_eq!(lines.join(" "), "um dois três quatro cinco seis");
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert!(wrap_text("   ", 10).is_empty());
    }

    #[test]
    fn test_render_report_creates_directory() {
        let dir = TempDir::new().unwrap();
        let corpus = sample_corpus();
        let analysis = CorpusAnalysis::run(&corpus).unwrap();
        let destination = dir.path().join("results").join("relatorio.pdf");

        render_report(&corpus, &analysis, &destination).unwrap();

        let bytes = std::fs::read(&destination).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_long_text_paginates() {
        let mut writer = PageWriter::new("teste").unwrap();
        let text = (0..200)
            .map(|i| format!("linha {}", i))
            .collect::<Vec<_>>()
            .join("\n");

        writer.paragraph(&text, BODY);

        assert!(writer.pages > 1);
        assert!(writer.y >= BOTTOM);
        assert!(writer.finish().unwrap().starts_with(b"%PDF"));
    }
}
