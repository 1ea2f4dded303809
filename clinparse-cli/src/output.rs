use crate::args::OutputFormat;
use clinparse::ClinparseError;
use clinparse::closure::ClosureReport;
use clinparse::models::{ConceptEntry, DiscoveryScore, ParseResult, ParseWarning, Polarity};
use clinparse::pipeline::{BatchOutcome, DocumentOutcome};
use clinparse::search::{ConceptDetails, ConceptSummary};
use clinparse::storage::SnapshotSummary;
use colored::*;
use serde::Serialize;
use serde_json::json;

pub struct CliColors;

impl CliColors {
    pub fn success() -> Color {
        Color::TrueColor {
            r: 34,
            g: 197,
            b: 94,
        }
    }

    pub fn error() -> Color {
        Color::TrueColor {
            r: 239,
            g: 68,
            b: 68,
        }
    }

    pub fn warning() -> Color {
        Color::TrueColor {
            r: 245,
            g: 158,
            b: 11,
        }
    }

    pub fn info() -> Color {
        Color::TrueColor {
            r: 59,
            g: 130,
            b: 246,
        }
    }

    pub fn concept() -> Color {
        Color::TrueColor {
            r: 168,
            g: 85,
            b: 247,
        }
    }

    pub fn muted() -> Color {
        Color::TrueColor {
            r: 148,
            g: 163,
            b: 184,
        }
    }

    pub fn accent() -> Color {
        Color::TrueColor {
            r: 59,
            g: 130,
            b: 246,
        }
    }
}

/// Error code, message and optional details for JSON error output.
pub fn error_code(error: &ClinparseError) -> (&'static str, String, Option<serde_json::Value>) {
    match error {
        ClinparseError::Storage(msg) => ("STORAGE_ERROR", msg.clone(), None),
        ClinparseError::Configuration(msg) => ("CONFIGURATION_ERROR", msg.clone(), None),
        ClinparseError::Logging(e) => ("LOGGING_ERROR", e.to_string(), None),
        ClinparseError::UpstreamUnavailable(msg) => (
            "UPSTREAM_UNAVAILABLE",
            msg.clone(),
            Some(json!({
                "hint": "Check that the annotation service is running and annotation.url points at it"
            })),
        ),
        ClinparseError::Annotation(msg) => ("ANNOTATION_ERROR", msg.clone(), None),
        ClinparseError::Closure(msg) => ("CLOSURE_ERROR", msg.clone(), None),
        ClinparseError::EmptySearchTerm => ("EMPTY_SEARCH_TERM", error.to_string(), None),
        ClinparseError::ConceptNotFound { code } => (
            "CONCEPT_NOT_FOUND",
            error.to_string(),
            Some(json!({ "code": code })),
        ),
        ClinparseError::SnapshotNotAccessible { path } => (
            "SNAPSHOT_NOT_ACCESSIBLE",
            error.to_string(),
            Some(json!({ "path": path })),
        ),
        ClinparseError::FeatureNotEnabled { feature } => (
            "FEATURE_NOT_ENABLED",
            error.to_string(),
            Some(json!({ "feature": feature })),
        ),
        ClinparseError::Other(msg) => ("OTHER_ERROR", msg.clone(), None),
    }
}

/// Output a ClinparseError as colored text or structured JSON on stderr
pub fn output_error(error: &ClinparseError, output: OutputFormat) {
    if output.is_json() {
        let (code, message, details) = error_code(error);
        let mut error_response = json!({
            "error": true,
            "code": code,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        if let Some(details) = details {
            error_response["details"] = details;
        }

        eprintln!(
            "{}",
            serde_json::to_string_pretty(&error_response).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        eprintln!("{}", format_error(&error.to_string()));
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn format_success(msg: &str) -> String {
    format!(
        "{} {}",
        "✓".color(CliColors::success()).bold(),
        msg.color(CliColors::success())
    )
}

pub fn format_error(msg: &str) -> String {
    format!(
        "{} {}",
        "✗".color(CliColors::error()).bold(),
        msg.color(CliColors::error())
    )
}

pub fn format_warning(msg: &str) -> String {
    format!(
        "{} {}",
        "⚠".color(CliColors::warning()).bold(),
        msg.color(CliColors::warning())
    )
}

pub fn format_info(msg: &str) -> String {
    format!(
        "{} {}",
        "ℹ".color(CliColors::info()).bold(),
        msg.color(CliColors::info())
    )
}

pub fn format_polarity(polarity: Polarity) -> ColoredString {
    match polarity {
        Polarity::Positive => "positive".color(CliColors::success()),
        Polarity::Negative => "negated".color(CliColors::error()).bold(),
        Polarity::Neutral => "neutral".color(CliColors::muted()),
    }
}

pub fn format_score(score: DiscoveryScore) -> ColoredString {
    match score {
        DiscoveryScore::DirectMatch => "direct".color(CliColors::muted()),
        DiscoveryScore::FullTextMatch => "full text".color(CliColors::success()),
        DiscoveryScore::Substitution => "substituted".color(CliColors::warning()),
        DiscoveryScore::PostProcessing => "discovered".color(CliColors::concept()),
    }
}

fn format_warning_entry(warning: &ParseWarning) -> String {
    match warning {
        ParseWarning::MalformedSpan { record, begin, end } => {
            format!("{} [{}, {}] does not fit the text, skipped", record, begin, end)
        }
        ParseWarning::MissingHead { id, head_id } => {
            format!("token {} points at missing head {}", id, head_id)
        }
        ParseWarning::SubstitutionDepth { code } => {
            format!("substitution of {} stopped at the depth limit", code)
        }
        ParseWarning::Unresolved {
            code,
            begin,
            end,
            error,
        } => format!("{} at [{}, {}] could not be resolved: {}", code, begin, end, error),
        ParseWarning::PhraseSearch { begin, end, error } => {
            format!("phrase search over [{}, {}] failed: {}", begin, end, error)
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn print_concept_table(concepts: &[ConceptEntry]) {
    println!(
        "{:<12} {:<10} {:<12} {:<12} {}",
        "Span".color(CliColors::muted()).bold(),
        "Polarity".color(CliColors::muted()).bold(),
        "Score".color(CliColors::muted()).bold(),
        "Concept".color(CliColors::muted()).bold(),
        "FSN / Text".color(CliColors::muted()).bold()
    );
    println!("{}", "─".repeat(80).color(CliColors::muted()));

    for concept in concepts {
        println!(
            "{:<12} {:<10} {:<12} {:<12} {} {}",
            format!("[{}, {}]", concept.begin, concept.end),
            format_polarity(concept.polarity),
            format_score(concept.score),
            concept.id.color(CliColors::concept()),
            truncate(concept.fsn.as_deref().unwrap_or("-"), 40),
            format!("\"{}\"", concept.text).color(CliColors::muted())
        );
    }
}

pub fn print_parse_result(result: &ParseResult, show_logs: bool) {
    println!(
        "{}",
        "━━━ Concepts ━━━".color(CliColors::accent()).bold()
    );
    if result.concepts.is_empty() {
        println!("{}", format_info("No concepts found."));
    } else {
        print_concept_table(&result.concepts);
    }

    if !result.attributes.is_empty() {
        println!();
        println!(
            "{}",
            "━━━ Attributes ━━━".color(CliColors::accent()).bold()
        );
        for attribute in &result.attributes {
            println!(
                "  {} {} {} {} {}",
                attribute.destination.text.color(CliColors::concept()),
                "─".color(CliColors::muted()),
                attribute
                    .attribute
                    .fsn
                    .as_deref()
                    .unwrap_or(&attribute.attribute.code)
                    .color(CliColors::info()),
                "→".color(CliColors::muted()),
                attribute.origin.text.color(CliColors::concept())
            );
        }
    }

    if !result.focus.concepts.is_empty() || !result.focus.attributes.is_empty() {
        println!();
        println!("{}", "━━━ Focus ━━━".color(CliColors::accent()).bold());
        for (id, focus) in &result.focus.concepts {
            let status = match (focus.found, focus.polarity) {
                (false, _) => "not found".color(CliColors::muted()),
                (true, Some(false)) => "found, negated".color(CliColors::error()),
                (true, Some(true)) => "found".color(CliColors::success()),
                (true, None) => "found, neutral".color(CliColors::warning()),
            };
            println!("  {:<24} {} ({} hits)", id, status, focus.results.len());
        }
        for (id, focus) in &result.focus.attributes {
            let status = if focus.found {
                "found".color(CliColors::success())
            } else {
                "not found".color(CliColors::muted())
            };
            println!("  {:<24} {} ({} hits)", id, status, focus.results.len());
        }
    }

    if show_logs {
        if !result.overlap_log.is_empty() {
            println!();
            println!(
                "{}",
                "━━━ Discarded overlaps ━━━".color(CliColors::accent()).bold()
            );
            for entry in &result.overlap_log {
                println!(
                    "  {} [{}, {}] {} {} [{}, {}]",
                    entry.discarded.code.color(CliColors::muted()),
                    entry.discarded_span.begin,
                    entry.discarded_span.end,
                    "within".color(CliColors::muted()),
                    entry.kept.code.color(CliColors::concept()),
                    entry.kept_span.begin,
                    entry.kept_span.end
                );
            }
        }
        if !result.inactive_log.is_empty() {
            println!();
            println!(
                "{}",
                "━━━ Substitutions ━━━".color(CliColors::accent()).bold()
            );
            for entry in &result.inactive_log {
                println!(
                    "  \"{}\" {} {} {}",
                    entry.text,
                    entry.old_code.color(CliColors::muted()),
                    "→".color(CliColors::muted()),
                    entry.new_code.color(CliColors::concept())
                );
            }
        }
    }

    for warning in &result.warnings {
        println!("{}", format_warning(&format_warning_entry(warning)));
    }

    println!();
    println!(
        "{}",
        format!("Parsed in {:.1} ms", result.timings.total).color(CliColors::muted())
    );
}

pub fn print_batch_outcome(outcome: &BatchOutcome, show_logs: bool) {
    for entry in &outcome.entries {
        println!("{}", format!("━━━ {} ━━━", entry.id).color(CliColors::accent()).bold());
        match &entry.outcome {
            DocumentOutcome::Parsed { result } => print_parse_result(result, show_logs),
            DocumentOutcome::Failed { error } => println!("{}", format_error(error)),
            DocumentOutcome::Skipped => println!("{}", format_warning("Skipped")),
        }
        println!();
    }

    let parsed = outcome.parsed().count();
    let summary = format!(
        "Batch completed: {} parsed, {} failed, {} skipped",
        parsed,
        outcome.failed_count(),
        outcome.skipped_count()
    );
    if outcome.aborted {
        println!(
            "{}",
            format_error(&format!("{} (annotation service unavailable)", summary))
        );
    } else {
        println!("{}", format_info(&summary));
    }
}

pub fn print_concept_list(concepts: &[ConceptSummary]) {
    if concepts.is_empty() {
        println!("{}", format_info("No concepts found."));
        return;
    }

    println!(
        "{}",
        format_info(&format!("Found {} concepts:", concepts.len()))
    );
    println!();
    println!(
        "{:<20} {}",
        "ID".color(CliColors::muted()).bold(),
        "Description".color(CliColors::muted()).bold()
    );
    println!("{}", "─".repeat(80).color(CliColors::muted()));

    for concept in concepts {
        let fsn = match &concept.fsn {
            Some(fsn) if fsn != &concept.description => format!(" ({})", fsn),
            _ => String::new(),
        };
        println!(
            "{:<20} {}{}",
            concept.id.color(CliColors::concept()),
            concept.description,
            fsn.color(CliColors::muted())
        );
    }
}

pub fn print_concept_details(details: &ConceptDetails) {
    println!(
        "{}",
        "━━━ Concept Details ━━━".color(CliColors::accent()).bold()
    );
    println!(
        "{}: {}",
        "ID".color(CliColors::muted()),
        details.id.color(CliColors::concept()).bold()
    );
    println!(
        "{}: {}",
        "FSN".color(CliColors::muted()),
        details.fsn.as_deref().unwrap_or("-")
    );
    println!(
        "{}: {}",
        "Active".color(CliColors::muted()),
        if details.active {
            "yes".color(CliColors::success())
        } else {
            "no".color(CliColors::error())
        }
    );
    println!(
        "{}: {}",
        "Descendants".color(CliColors::muted()),
        details.children
    );

    if !details.attributes.is_empty() {
        println!("{}:", "Attributes".color(CliColors::muted()));
        for attribute in &details.attributes {
            println!(
                "  {} {} {}",
                attribute.id.color(CliColors::info()),
                attribute.fsn.as_deref().unwrap_or("-"),
                format!("→ {}", attribute.ranges.join(", ")).color(CliColors::muted())
            );
        }
    }
}

pub fn print_closure_report(report: &ClosureReport) {
    println!(
        "{}",
        format_success(&format!(
            "Closure v{} built: {} pairs over {} concepts from {} edges in {} ms",
            report.version, report.pairs, report.nodes, report.edges, report.elapsed_ms
        ))
    );
    for warning in &report.warnings {
        println!("{}", format_warning(&format!("{:?}", warning)));
    }
}

pub fn print_snapshot_summary(summary: &SnapshotSummary) {
    println!(
        "{}",
        format_success(&format!(
            "Imported {} concepts, {} descriptions, {} is-a edges",
            summary.concepts, summary.descriptions, summary.is_a_edges
        ))
    );
    println!(
        "  {} associations, {} attribute rules, {} CUI mappings",
        summary.associations, summary.attribute_rules, summary.cui_mappings
    );
}
