pub mod args;
pub mod commands;
pub mod context;
pub mod handlers;
pub mod output;
pub mod utils;

pub use args::OutputFormat;
pub use commands::{Cli, ClosureCommands, Commands};
pub use context::{ClinparseCliContext, load_config};
pub use output::{
    CliColors, error_code, format_error, format_info, format_success, format_warning,
    output_error, print_json,
};
pub use utils::{build_focus, build_request, parse_attribute_focus, read_documents};
