use clap::{CommandFactory, Parser};
use clinparse_cli::handlers::*;
use clinparse_cli::{ClinparseCliContext, Cli, Commands, OutputFormat, output_error};
use tracing::Level;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // JSON output keeps stdout clean of anything but the result
    let is_quiet = cli.quiet
        || std::env::var("CLINPARSE_QUIET")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
    let log_level = if is_quiet || cli.output.is_json() {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let output = cli.output;
    if let Err(e) = run(cli).await {
        output_error(&e, output);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> clinparse::Result<()> {
    let output: OutputFormat = cli.output;

    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        clap_complete::generate(args.shell, &mut command, "clinparse", &mut std::io::stdout());
        return Ok(());
    }

    let ctx = ClinparseCliContext::new(cli.config.as_deref(), cli.snapshot).await?;

    match cli.command {
        Commands::Parse(args) => handle_parse_command(args, &ctx, output).await,
        Commands::Search(args) => handle_search_command(args, &ctx, output).await,
        Commands::Concept(args) => handle_concept_command(args, &ctx, output).await,
        Commands::TopLevel => handle_top_level_command(&ctx, output).await,
        Commands::Closure(cmd) => handle_closure_command(cmd, &ctx, output).await,
        Commands::Import(args) => handle_import_command(args, &ctx, output).await,
        Commands::Check => handle_check_command(&ctx, output).await,
        Commands::Completions(_) => Ok(()),
    }
}
