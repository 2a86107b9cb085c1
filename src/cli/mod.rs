pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{AnalyzeArgs, CheckArgs, CliArgs, Commands, OutputFormatArg, ServeArgs};
pub use handlers::{handle_analyze, handle_check, handle_serve};
pub use output::{CheckReport, OutputFormat, OutputFormatter};
