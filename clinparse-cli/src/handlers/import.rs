//! RF2 import handler

use crate::args::{ImportArgs, OutputFormat};
use crate::context::ClinparseCliContext;
use crate::output::*;
use clinparse::storage::rf2::Rf2Loader;
use indicatif::ProgressBar;
use serde_json::json;
use std::io::IsTerminal;
use std::time::Duration;

pub async fn handle_import_command(
    args: ImportArgs,
    ctx: &ClinparseCliContext,
    output: OutputFormat,
) -> clinparse::Result<()> {
    let spinner = if std::io::stderr().is_terminal() && !output.is_json() {
        let spinner = ProgressBar::new_spinner();
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner.set_message(format!("Reading {}", args.release.display()));
        Some(spinner)
    } else {
        None
    };

    let mut loader = Rf2Loader::new(&args.release)
        .with_is_a_type_id(ctx.engine.config().ontology.is_a_type_id.clone());
    if let Some(cui_file) = &args.cui_file {
        loader = loader.with_cui_file(cui_file);
    }

    let snapshot = loader.load().await?;
    if let Some(spinner) = &spinner {
        spinner.set_message("Writing ontology store");
    }
    let summary = ctx.engine.import(snapshot).await?;

    let report = if args.no_closure {
        None
    } else {
        if let Some(spinner) = &spinner {
            spinner.set_message("Building hierarchy closure");
        }
        Some(ctx.engine.rebuild_closure().await?)
    };

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if output.is_json() {
        print_json(&json!({
            "summary": summary,
            "closure": report,
        }));
    } else {
        print_snapshot_summary(&summary);
        match &report {
            Some(report) => print_closure_report(report),
            None => println!(
                "{}",
                format_warning("Closure not rebuilt. Run `clinparse closure rebuild` before parsing")
            ),
        }
    }

    Ok(())
}
