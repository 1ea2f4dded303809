//! Command enum definitions
//!
//! This module contains the top-level parser and the command enums that define the
//! command structure.

use crate::args::*;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "clinparse")]
#[command(about = "Clinical concept resolution over SNOMED CT", long_about = None)]
#[command(version = clinparse::VERSION)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Ontology snapshot to load and persist to, overriding the configuration
    #[arg(long, short, global = true, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,

    /// Output format - use json for tool integration
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub output: OutputFormat,

    /// Verbose output (debug level logging)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Quiet mode (suppress all logging output)
    #[arg(long, short, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Annotate and parse clinical text
    #[command(long_about = r#"
Send text to the annotation service and resolve the mentions it returns into
SNOMED CT concepts. Inactive and foreign-system codes are substituted, nested
mentions are discarded, multi-word concepts are discovered along the dependency
tree, and attribute relationships between concepts are looked up.

EXAMPLES:
  # Parse a sentence
  clinparse parse "No signs of chronic kidney disease."

  # Parse several documents, one per file
  clinparse parse --file note1.txt --file note2.txt

  # Ask whether any kind of kidney disease is mentioned
  clinparse parse "CKD stage 3" --focus-children 90708001

  # Ask for finding sites of clinical findings on the kidney
  clinparse parse "kidney pain" --focus-attribute 404684003:64033007

  # Only report body structures
  clinparse parse "kidney pain" --include 123037004
"#)]
    Parse(ParseArgs),

    /// Search concepts by description fragment or id
    #[command(long_about = r#"
Find concepts whose active descriptions contain the search term, or whose id is
the term. Shortest descriptions come first.

EXAMPLES:
  clinparse search diabetes
  clinparse search "kidney" --parent 64572001
  clinparse search 709044004
"#)]
    Search(SearchArgs),

    /// Show a concept with its descendants count and attribute rules
    #[command(alias = "show")]
    Concept(ConceptArgs),

    /// List the top-level hierarchies below the root concept
    TopLevel,

    /// Hierarchy closure maintenance
    #[command(subcommand)]
    Closure(ClosureCommands),

    /// Import a SNOMED CT RF2 release into the ontology store
    #[command(long_about = r#"
Load the snapshot files of an RF2 release (concepts, descriptions, relationships,
historical associations and MRCM attribute rules) into the configured ontology
store. With the in-memory store the result is written to the snapshot file.
The hierarchy closure is rebuilt afterwards unless --no-closure is given.

EXAMPLES:
  clinparse import ./SnomedCT_InternationalRF2_PRODUCTION_20240101
  clinparse --snapshot ./snomed.json import ./release --cui-file ./MRCONSO.RRF
"#)]
    Import(ImportArgs),

    /// Check the ontology store and the annotation service
    #[command(alias = "diagnose")]
    Check,

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Subcommand, Debug)]
pub enum ClosureCommands {
    /// Recompute the transitive is-a closure and swap it in
    Rebuild,

    /// Show the current closure version
    Status,
}
