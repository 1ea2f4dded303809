//! Command handlers for the clinparse CLI

pub mod check;
pub mod closure;
pub mod import;
pub mod parse;
pub mod search;

pub use check::handle_check_command;
pub use closure::handle_closure_command;
pub use import::handle_import_command;
pub use parse::handle_parse_command;
pub use search::{handle_concept_command, handle_search_command, handle_top_level_command};
