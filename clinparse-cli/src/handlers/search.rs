//! Search and navigation command handlers

use crate::args::{ConceptArgs, OutputFormat, SearchArgs};
use crate::context::ClinparseCliContext;
use crate::output::*;

pub async fn handle_search_command(
    args: SearchArgs,
    ctx: &ClinparseCliContext,
    output: OutputFormat,
) -> clinparse::Result<()> {
    let hits = ctx.engine.search(&args.term, args.parent.as_deref()).await?;

    if output.is_json() {
        print_json(&hits);
    } else {
        print_concept_list(&hits);
    }

    Ok(())
}

pub async fn handle_concept_command(
    args: ConceptArgs,
    ctx: &ClinparseCliContext,
    output: OutputFormat,
) -> clinparse::Result<()> {
    let details = ctx.engine.find_concept(&args.id).await?;

    if output.is_json() {
        print_json(&details);
    } else {
        print_concept_details(&details);
    }

    Ok(())
}

pub async fn handle_top_level_command(
    ctx: &ClinparseCliContext,
    output: OutputFormat,
) -> clinparse::Result<()> {
    let top = ctx.engine.top_level().await?;

    if output.is_json() {
        print_json(&top);
    } else {
        print_concept_list(&top);
    }

    Ok(())
}
