use truthlens::cli::commands::{CliArgs, Commands};
use truthlens::cli::handlers::{handle_analyze, handle_check, handle_serve};
use truthlens::util::logging::{self, LoggingConfig};
use truthlens::VERSION;

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("truthlens v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Serve(serve_args) => handle_serve(serve_args).await,
        Commands::Analyze(analyze_args) => handle_analyze(analyze_args, args.quiet).await,
        Commands::Check(check_args) => handle_check(check_args).await,
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let from_env = logging::config_from_env();
    let level = if let Some(level_str) = &args.log_level {
        logging::parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        from_env.level
    };

    logging::init_logging(LoggingConfig { level, ..from_env });
}
