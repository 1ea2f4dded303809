//! Closure command handlers

use crate::args::OutputFormat;
use crate::commands::ClosureCommands;
use crate::context::ClinparseCliContext;
use crate::output::*;
use serde_json::json;

pub async fn handle_closure_command(
    cmd: ClosureCommands,
    ctx: &ClinparseCliContext,
    output: OutputFormat,
) -> clinparse::Result<()> {
    match cmd {
        ClosureCommands::Rebuild => {
            let report = ctx.engine.rebuild_closure().await?;
            if output.is_json() {
                print_json(&report);
            } else {
                print_closure_report(&report);
            }
        }
        ClosureCommands::Status => {
            let version = ctx.engine.closure_version().await?;
            if output.is_json() {
                print_json(&json!({ "version": version }));
            } else if version == 0 {
                println!(
                    "{}",
                    format_warning("No closure built yet. Run `clinparse closure rebuild`")
                );
            } else {
                println!("{}", format_info(&format!("Closure version {}", version)));
            }
        }
    }

    Ok(())
}
