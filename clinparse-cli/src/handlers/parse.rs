//! Parse command handler

use crate::args::{OutputFormat, ParseArgs};
use crate::context::ClinparseCliContext;
use crate::output::*;
use crate::utils::{build_request, read_documents};
use clinparse::ClinparseError;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;

pub async fn handle_parse_command(
    args: ParseArgs,
    ctx: &ClinparseCliContext,
    output: OutputFormat,
) -> clinparse::Result<()> {
    let request = build_request(&args)?;

    if let Some(text) = &args.text {
        let result = ctx.engine.parse(text, &request).await?;
        if output.is_json() {
            print_json(&result);
        } else {
            print_parse_result(&result, args.logs);
        }
        return Ok(());
    }

    let documents = read_documents(&args)?;
    tracing::debug!(documents = documents.len(), "Parsing batch");

    let pb = if std::io::stdout().is_terminal() && !output.is_json() && documents.len() > 1 {
        let pb = ProgressBar::new(documents.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    } else {
        None
    };

    let outcome = ctx
        .engine
        .parse_batch_with_progress(documents, &request, |entry| {
            if let Some(pb) = &pb {
                pb.set_message(entry.id.clone());
                pb.inc(1);
            }
        })
        .await;

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    if output.is_json() {
        print_json(&outcome);
    } else {
        print_batch_outcome(&outcome, args.logs);
    }

    if outcome.aborted {
        return Err(ClinparseError::UpstreamUnavailable(format!(
            "batch aborted after {} of {} documents",
            outcome.entries.len() - outcome.skipped_count(),
            outcome.entries.len()
        )));
    }

    Ok(())
}
