use crate::pipeline::EnabledStages;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Forensic jury for uploaded evidence
#[derive(Parser, Debug)]
#[command(
    name = "truthlens",
    about = "Forensic jury: metadata, deepfake, vision and logic verdicts for uploaded evidence",
    version,
    author,
    long_about = "truthlens sends an image or text document through a jury of hosted services \
                  (Cloudinary metadata, Hugging Face deepfake detection, a Gemini vision model \
                  and a Groq-hosted logic auditor) and combines their findings into a \
                  Flagged/Clear verdict."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Serve the POST /analyze endpoint",
        long_about = "Starts the HTTP endpoint. Upload evidence as the multipart field 'file'; \
                      the response carries fraud_score, metadata_found and verdict.\n\n\
                      Examples:\n  \
                      truthlens serve\n  \
                      truthlens serve --listen 127.0.0.1:9000 --stages all"
    )]
    Serve(ServeArgs),

    #[command(
        about = "Analyze one evidence file and print the report",
        long_about = "Runs the jury over a local image or text file and prints every stage \
                      result plus the combined verdict.\n\n\
                      Examples:\n  \
                      truthlens analyze receipt.jpg\n  \
                      truthlens analyze receipt.jpg --instruction \"check for payment QR codes\"\n  \
                      truthlens analyze invoice.txt --format json"
    )]
    Analyze(AnalyzeArgs),

    #[command(
        about = "Validate configuration and credentials",
        long_about = "Loads configuration from the environment (and .env), validates it and \
                      reports which credentials are missing for the enabled stages. \
                      No external service is contacted."
    )]
    Check(CheckArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    #[arg(
        short = 'l',
        long,
        value_name = "ADDR",
        help = "Listen address (overrides TRUTHLENS_LISTEN)"
    )]
    pub listen: Option<String>,

    #[arg(
        short = 's',
        long,
        value_parser = parse_stages,
        help = "Comma-separated stages: metadata,deepfake,vision,logic or 'all'"
    )]
    pub stages: Option<EnabledStages>,
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(value_name = "FILE", help = "Image or text file to analyze")]
    pub file: PathBuf,

    #[arg(
        short = 'i',
        long,
        value_name = "TEXT",
        help = "What to look for (defaults to TRUTHLENS_INSTRUCTION)"
    )]
    pub instruction: Option<String>,

    #[arg(
        short = 's',
        long,
        value_parser = parse_stages,
        help = "Comma-separated stages: metadata,deepfake,vision,logic or 'all'"
    )]
    pub stages: Option<EnabledStages>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(long, value_name = "SECONDS", help = "Per-call timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct CheckArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_stages(s: &str) -> Result<EnabledStages, String> {
    s.parse::<EnabledStages>().map_err(|e| e.to_string())
}
