//! Command argument structures
//!
//! This module contains all CLI argument structs organized by command category.

use clap::{Args, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// How results are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored, human readable tables
    Table,
    /// Pretty-printed JSON, for tool integration
    Json,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

// Parse command arguments
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Text to parse. Omit when using --file
    #[arg(conflicts_with = "files", required_unless_present = "files")]
    pub text: Option<String>,

    /// Parse the contents of these files as a batch, one document per file
    #[arg(long = "file", short = 'f')]
    pub files: Vec<PathBuf>,

    /// Report on this concept (exact code)
    #[arg(long = "focus", value_name = "CONCEPT_ID")]
    pub focus: Vec<String>,

    /// Report on this concept and all of its descendants
    #[arg(long = "focus-children", value_name = "CONCEPT_ID")]
    pub focus_children: Vec<String>,

    /// Report on attribute edges, given as DESTINATION:ORIGIN concept ids
    #[arg(long = "focus-attribute", value_name = "DESTINATION:ORIGIN")]
    pub focus_attributes: Vec<String>,

    /// Read focus targets from a JSON file ({"concepts": [...], "attributes": [...]})
    #[arg(long, value_name = "PATH")]
    pub focus_file: Option<PathBuf>,

    /// Only report concepts below these ancestors (repeatable)
    #[arg(long = "include", value_name = "CONCEPT_ID")]
    pub include: Vec<String>,

    /// Also print the overlap and substitution logs
    #[arg(long)]
    pub logs: bool,
}

// Search command arguments
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Description fragment or concept id
    pub term: String,

    /// Restrict results to descendants of this concept
    #[arg(long, short)]
    pub parent: Option<String>,
}

#[derive(Args, Debug)]
pub struct ConceptArgs {
    /// Concept id
    pub id: String,
}

// Import command arguments
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// RF2 release directory (searched recursively for snapshot files)
    pub release: PathBuf,

    /// UMLS MRCONSO.RRF file with CUI mappings
    #[arg(long, value_name = "PATH")]
    pub cui_file: Option<PathBuf>,

    /// Skip rebuilding the hierarchy closure after the import
    #[arg(long)]
    pub no_closure: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
