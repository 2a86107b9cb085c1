//! Subcommand handlers; each returns the process exit code
//!
//! 0 on success, 2 when configuration or credentials are at fault,
//! 1 for any other failure.

use super::commands::{AnalyzeArgs, CheckArgs, ServeArgs};
use super::output::{CheckReport, OutputFormatter};
use crate::config::{ConfigError, TruthLensConfig};
use crate::evidence::Evidence;
use crate::server::{self, AppState};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;

fn exit_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => EXIT_OK,
        Err(e) => {
            error!("{:#}", e);
            if e.downcast_ref::<ConfigError>().is_some() {
                eprintln!("\nPlease check your environment variables (or .env) and command-line arguments.");
                EXIT_CONFIG
            } else {
                EXIT_FAILURE
            }
        }
    }
}

pub async fn handle_serve(args: &ServeArgs) -> i32 {
    exit_code(run_serve(args).await)
}

async fn run_serve(args: &ServeArgs) -> Result<()> {
    let mut config = TruthLensConfig::load()?;
    if let Some(listen) = &args.listen {
        config.listen = listen.clone();
    }
    if let Some(stages) = &args.stages {
        config.stages = stages.clone();
    }
    config.validate()?;
    debug!("{}", config);

    let addr: SocketAddr = config.listen.parse().map_err(|_| {
        ConfigError::ValidationFailed(format!("Invalid listen address: {}", config.listen))
    })?;

    let pipeline = config.build_pipeline()?;
    info!(stages = %config.stages, "Forensic pipeline ready");

    let state = AppState::new(Arc::new(pipeline), config.max_upload_bytes);
    server::serve(addr, state).await
}

pub async fn handle_analyze(args: &AnalyzeArgs, quiet: bool) -> i32 {
    exit_code(run_analyze(args, quiet).await)
}

async fn run_analyze(args: &AnalyzeArgs, quiet: bool) -> Result<()> {
    let mut config = TruthLensConfig::load()?;
    if let Some(stages) = &args.stages {
        config.stages = stages.clone();
    }
    if let Some(timeout) = args.timeout {
        config.request_timeout_secs = timeout;
    }
    config.validate()?;

    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let file_name = args.file.file_name().and_then(|n| n.to_str());
    let evidence = Evidence::from_upload(bytes, None, file_name)?;
    debug!(kind = evidence.kind(), bytes = evidence.len(), "Evidence loaded");

    let pipeline = config.build_pipeline()?;
    let report = pipeline
        .analyze(&evidence, args.instruction.as_deref())
        .await;

    let formatted = OutputFormatter::new(args.format.into()).format_report(&report)?;
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, formatted)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !quiet {
                eprintln!("Report written to {}", path.display());
            }
        }
        None => println!("{}", formatted),
    }

    Ok(())
}

pub async fn handle_check(args: &CheckArgs) -> i32 {
    let config = match TruthLensConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return EXIT_CONFIG;
        }
    };

    let check = check_report(&config);
    match OutputFormatter::new(args.format.into()).format_check(&check) {
        Ok(formatted) => println!("{}", formatted),
        Err(e) => {
            error!("{:#}", e);
            return EXIT_FAILURE;
        }
    }

    if check.valid {
        EXIT_OK
    } else {
        EXIT_CONFIG
    }
}

/// Summarises configuration problems without contacting any service
pub fn check_report(config: &TruthLensConfig) -> CheckReport {
    let creds = &config.credentials;
    let credentials = BTreeMap::from([
        (
            "GEMINI_API_KEY".to_string(),
            creds.gemini_api_key.is_some(),
        ),
        ("GROQ_API_KEY".to_string(), creds.groq_api_key.is_some()),
        ("CLOUDINARY_URL".to_string(), creds.cloudinary.is_some()),
        ("HF_API_TOKEN".to_string(), creds.hf_api_token.is_some()),
    ]);

    let problems: Vec<String> = [config.validate(), config.require_credentials()]
        .into_iter()
        .filter_map(|r| r.err().map(|e| e.to_string()))
        .collect();

    CheckReport {
        valid: problems.is_empty(),
        stages: config.stages.to_string(),
        listen: config.listen.clone(),
        credentials,
        problems,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::pipeline::EnabledStages;
    use crate::report::StageKind;

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(exit_code(Ok(())), EXIT_OK);
        assert_eq!(
            exit_code(Err(anyhow::anyhow!("network is down"))),
            EXIT_FAILURE
        );
        assert_eq!(
            exit_code(Err(ConfigError::InvalidStage("ocr".to_string()).into())),
            EXIT_CONFIG
        );
    }

    #[test]
    fn test_exit_code_sees_through_context() {
        let err = Err::<(), _>(ConfigError::ValidationFailed("bad".to_string()))
            .context("Loading configuration")
            .unwrap_err();
        assert_eq!(exit_code(Err(err)), EXIT_CONFIG);
    }

    #[test]
    fn test_check_report_missing_credentials() {
        let config = TruthLensConfig::default();
        let check = check_report(&config);

        assert!(!check.valid);
        assert_eq!(check.credentials.get("GEMINI_API_KEY"), Some(&false));
        assert_eq!(check.problems.len(), 1);
        assert!(check.problems[0].contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_check_report_valid() {
        let config = TruthLensConfig {
            stages: EnabledStages::only([StageKind::Vision]),
            credentials: Credentials {
                gemini_api_key: Some("AIza".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let check = check_report(&config);

        assert!(check.valid);
        assert_eq!(check.stages, "vision");
        assert!(check.problems.is_empty());
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_analyze_missing_file_is_runtime_failure() {
        let args = AnalyzeArgs {
            file: std::path::PathBuf::from("/nonexistent/evidence.png"),
            instruction: None,
            stages: Some(EnabledStages::only([StageKind::Vision])),
            format: super::super::commands::OutputFormatArg::Json,
            timeout: None,
            output: None,
        };
        // The file is read before any credential is checked
        assert_eq!(handle_analyze(&args, true).await, EXIT_FAILURE);
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_analyze_unsupported_file_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("contract.pdf");
        std::fs::write(&path, b"%PDF-1.7\n").unwrap();

        let args = AnalyzeArgs {
            file: path,
            instruction: None,
            stages: None,
            format: super::super::commands::OutputFormatArg::Human,
            timeout: None,
            output: None,
        };
        assert_eq!(handle_analyze(&args, true).await, EXIT_FAILURE);
    }
}
