//! Diagnostic checks

use crate::args::OutputFormat;
use crate::context::ClinparseCliContext;
use crate::output::*;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub version: &'static str,
    pub features: Vec<&'static str>,
    pub store_healthy: bool,
    pub store_error: Option<String>,
    pub closure_version: Option<u64>,
    pub annotation_url: String,
    pub annotation_reachable: bool,
}

impl CheckReport {
    pub fn healthy(&self) -> bool {
        self.store_healthy && self.annotation_reachable
    }
}

pub async fn run_checks(ctx: &ClinparseCliContext) -> CheckReport {
    let (store_healthy, store_error) = match ctx.engine.check_store().await {
        Ok(healthy) => (healthy, None),
        Err(e) => (false, Some(e.to_string())),
    };
    let closure_version = ctx.engine.closure_version().await.ok();

    CheckReport {
        version: clinparse::VERSION,
        features: clinparse::core::enabled_features(),
        store_healthy,
        store_error,
        closure_version,
        annotation_url: ctx.engine.config().annotation.url.clone(),
        annotation_reachable: ctx.engine.check_annotation_service().await,
    }
}

pub async fn handle_check_command(
    ctx: &ClinparseCliContext,
    output: OutputFormat,
) -> clinparse::Result<()> {
    tracing::info!("Running diagnostic checks...");
    let report = run_checks(ctx).await;

    if output.is_json() {
        print_json(&report);
        return Ok(());
    }

    println!(
        "{}",
        format_info(&format!(
            "clinparse v{} ({})",
            report.version,
            report.features.join(", ")
        ))
    );

    match (&report.store_error, report.store_healthy) {
        (Some(e), _) => println!("{}", format_error(&format!("Ontology store: {}", e))),
        (None, true) => println!("{}", format_success("Ontology store: healthy")),
        (None, false) => println!("{}", format_error("Ontology store: unhealthy")),
    }

    match report.closure_version {
        Some(0) => println!(
            "{}",
            format_warning("Closure: not built. Run `clinparse closure rebuild`")
        ),
        Some(version) => println!("{}", format_success(&format!("Closure: version {}", version))),
        None => println!("{}", format_error("Closure: unreadable")),
    }

    if report.annotation_reachable {
        println!(
            "{}",
            format_success(&format!("Annotation service: reachable at {}", report.annotation_url))
        );
    } else {
        println!(
            "{}",
            format_error(&format!(
                "Annotation service: unreachable at {}",
                report.annotation_url
            ))
        );
    }

    Ok(())
}
