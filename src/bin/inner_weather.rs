//! Inner Weather CLI - Command-line interface for phase prediction
//!
//! Commands:
//! - predict: Predict for requests in a file (batch mode)
//! - run: Predict for NDJSON requests from stdin (streaming mode)
//! - info: Describe a model artifact
//! - doctor: Diagnose model and configuration health
//! - schema: Print request/response schemas
//! - serve: Start the HTTP server (requires the `server` feature)

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use inner_weather::config::{ConfigError, ServiceConfig};
use inner_weather::schema::{RequestAdapter, REQUEST_SCHEMA, RESPONSE_SCHEMA};
use inner_weather::{
    ArtifactError, LoadedModel, PhasePredictor, PredictError, PredictRequest, PredictionResult,
    VERSION,
};

/// Inner Weather - Menstrual phase and mood inference from wearable data
#[derive(Parser)]
#[command(name = "inner-weather")]
#[command(author = "Inner Weather Team")]
#[command(version = VERSION)]
#[command(about = "Predict menstrual phase and mood from wearable data", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict for requests in a file (batch mode)
    Predict {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Model artifact (overrides the configured path)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Predict for NDJSON requests from stdin (streaming mode)
    Run {
        /// Model artifact (overrides the configured path)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Flush output after each record
        #[arg(long, default_value = "true")]
        flush: bool,
    },

    /// Describe a model artifact
    Info {
        /// Model artifact (overrides the configured path)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose model and configuration health
    Doctor {
        /// Model artifact (overrides the configured path)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },

    /// Start the HTTP server
    #[cfg(feature = "server")]
    Serve {
        /// Model artifact (overrides the configured path)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Bind address (overrides the configured host)
        #[arg(long)]
        host: Option<std::net::IpAddr>,

        /// Bind port (overrides the configured port)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// A single JSON request object, or a JSON array of requests
    Json,
    /// Newline-delimited JSON (one request per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one result per line)
    Ndjson,
    /// JSON array of results
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Request schema
    Input,
    /// Response schema
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return report(e.into()),
    };
    init_logging(&config.log_filter);

    match run(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(e),
    }
}

fn report(e: CliErrorKind) -> ExitCode {
    eprintln!(
        "{}",
        serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
    );
    ExitCode::FAILURE
}

fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    match path {
        Some(path) => ServiceConfig::load_from(path),
        None => ServiceConfig::load(),
    }
}

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(command: Commands, config: ServiceConfig) -> Result<(), CliErrorKind> {
    match command {
        Commands::Predict {
            input,
            output,
            model,
            input_format,
            output_format,
        } => {
            let predictor = load_predictor(model.as_deref(), &config)?;
            cmd_predict(&predictor, &input, &output, input_format, output_format)
        }

        Commands::Run { model, flush } => {
            let predictor = load_predictor(model.as_deref(), &config)?;
            cmd_run(&predictor, flush)
        }

        Commands::Info { model, json } => {
            let predictor = load_predictor(model.as_deref(), &config)?;
            cmd_info(&predictor, json)
        }

        Commands::Doctor { model, json } => cmd_doctor(model.as_deref(), &config, json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),

        #[cfg(feature = "server")]
        Commands::Serve { model, host, port } => {
            let mut config = config;
            if let Some(model) = model {
                config.model_path = model;
            }
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            cmd_serve(&config)
        }
    }
}

fn load_model(model: Option<&Path>, config: &ServiceConfig) -> Result<LoadedModel, ArtifactError> {
    let path = model.unwrap_or(config.model_path.as_path());
    let loaded = LoadedModel::from_path(path)?;
    Ok(match &config.model_name {
        Some(name) => loaded.with_name(name.clone()),
        None => loaded,
    })
}

fn load_predictor(
    model: Option<&Path>,
    config: &ServiceConfig,
) -> Result<PhasePredictor, CliErrorKind> {
    Ok(PhasePredictor::with_model(load_model(model, config)?))
}

fn read_input(input: &Path) -> Result<String, CliErrorKind> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn cmd_predict(
    predictor: &PhasePredictor,
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
) -> Result<(), CliErrorKind> {
    let input_data = read_input(input)?;

    let requests: Vec<PredictRequest> = match input_format {
        InputFormat::Ndjson => RequestAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json if input_data.trim_start().starts_with('[') => {
            RequestAdapter::parse_array(&input_data)?
        }
        InputFormat::Json => vec![RequestAdapter::parse_json(&input_data)?],
    };

    if requests.is_empty() {
        return Err(CliErrorKind::NoRequests);
    }

    let results = requests
        .iter()
        .map(|request| predictor.predict(request))
        .collect::<Result<Vec<_>, _>>()?;

    let output_data = format_output(&results, &output_format)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_run(predictor: &PhasePredictor, flush: bool) -> Result<(), CliErrorKind> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for (line_num, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let result = predictor.predict_json(trimmed).map_err(|e| match e {
            PredictError::InvalidInput(msg) => PredictError::InvalidInput(format!(
                "line {}: {}",
                line_num + 1,
                msg
            )),
            other => other,
        })?;

        writeln!(stdout, "{}", result)?;
        if flush {
            stdout.flush()?;
        }
    }

    stdout.flush()?;
    Ok(())
}

fn cmd_info(predictor: &PhasePredictor, json: bool) -> Result<(), CliErrorKind> {
    let info = predictor.model_info()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Model:     {}", info.model_name);
        println!("Source:    {}", info.source);
        println!("Loaded at: {}", info.loaded_at.to_rfc3339());
        println!();
        println!("Expected features:");
        for (i, feature) in info.expected_features.iter().enumerate() {
            println!("  {:>2}. {}", i + 1, feature);
        }
        println!();
        println!("Classes: {}", info.label_classes.join(", "));
    }

    Ok(())
}

fn cmd_doctor(model: Option<&Path>, config: &ServiceConfig, json: bool) -> Result<(), CliErrorKind> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Inner Weather version {}", VERSION),
    });

    let config_path = ServiceConfig::config_path();
    checks.push(DoctorCheck {
        name: "config".to_string(),
        status: CheckStatus::Ok,
        message: if config_path.exists() {
            format!("Using {}", config_path.display())
        } else {
            "No config file, using defaults".to_string()
        },
    });

    match load_model(model, config) {
        Ok(loaded) => {
            checks.push(DoctorCheck {
                name: "model".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "{} ({} features, {} classes, {})",
                    loaded.source(),
                    loaded.feature_columns().len(),
                    loaded.label_classes().len(),
                    loaded.pipeline().classifier.name()
                ),
            });

            let unmapped = loaded.unmapped_classes();
            checks.push(if unmapped.is_empty() {
                DoctorCheck {
                    name: "mood_mapping".to_string(),
                    status: CheckStatus::Ok,
                    message: "Every class has a mood".to_string(),
                }
            } else {
                DoctorCheck {
                    name: "mood_mapping".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Classes without a mood: {}", unmapped.join(", ")),
                }
            });

            let underivable = loaded.underivable_columns();
            checks.push(if underivable.is_empty() {
                DoctorCheck {
                    name: "feature_columns".to_string(),
                    status: CheckStatus::Ok,
                    message: "Every column is derived from requests".to_string(),
                }
            } else {
                DoctorCheck {
                    name: "feature_columns".to_string(),
                    status: CheckStatus::Warning,
                    message: format!(
                        "Columns always missing: {}",
                        underivable.join(", ")
                    ),
                }
            });
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "model".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            });
        }
    }

    // Check stdin is available (for streaming mode)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Inner Weather Doctor Report");
        println!("===========================");
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CliErrorKind::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), CliErrorKind> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", REQUEST_SCHEMA);
                println!();
                println!("- wearable_data: {{ spo2, gsr_mean, gsr_phasic_std, ppg_rmssd, heart_rate, skin_temp }}");
                println!("- hormone_data: {{ estrogen, progesterone }}");
                println!("- day_in_cycle: integer, 1-based");
                println!();
                println!("All fields are required and numeric. Unknown fields are ignored.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: {}", RESPONSE_SCHEMA);
                println!();
                println!("- predicted_phase: class label from the model's catalog");
                println!("- predicted_mood: mood descriptor for the phase");
                println!("- confidence: highest class probability");
                println!("- probabilities: {{ <class label>: probability }} for every class");
            }
        }
    }

    Ok(())
}

#[cfg(feature = "server")]
fn cmd_serve(config: &ServiceConfig) -> Result<(), CliErrorKind> {
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async {
        let (_addr, shutdown_tx) = inner_weather::server::start(config).await?;
        tokio::signal::ctrl_c().await?;
        let _ = shutdown_tx.send(());
        Ok::<(), anyhow::Error>(())
    })?;

    Ok(())
}

// Helper functions

fn format_output(
    results: &[PredictionResult],
    format: &OutputFormat,
) -> Result<String, CliErrorKind> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for result in results {
                lines.push(serde_json::to_string(result)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(results)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(results)? + "\n"),
    }
}

fn get_input_json_schema() -> String {
    let number = serde_json::json!({ "type": "number" });
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": REQUEST_SCHEMA,
        "description": "Inner Weather prediction request",
        "type": "object",
        "required": ["wearable_data", "hormone_data", "day_in_cycle"],
        "properties": {
            "wearable_data": {
                "type": "object",
                "required": ["spo2", "gsr_mean", "gsr_phasic_std", "ppg_rmssd", "heart_rate", "skin_temp"],
                "properties": {
                    "spo2": number,
                    "gsr_mean": number,
                    "gsr_phasic_std": number,
                    "ppg_rmssd": number,
                    "heart_rate": number,
                    "skin_temp": number
                }
            },
            "hormone_data": {
                "type": "object",
                "required": ["estrogen", "progesterone"],
                "properties": {
                    "estrogen": number,
                    "progesterone": number
                }
            },
            "day_in_cycle": { "type": "integer" }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": RESPONSE_SCHEMA,
        "description": "Inner Weather prediction result",
        "type": "object",
        "required": ["predicted_phase", "predicted_mood", "confidence", "probabilities"],
        "properties": {
            "predicted_phase": { "type": "string" },
            "predicted_mood": { "type": "string" },
            "confidence": { "type": "number", "minimum": 0, "maximum": 1 },
            "probabilities": {
                "type": "object",
                "additionalProperties": { "type": "number", "minimum": 0, "maximum": 1 }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum CliErrorKind {
    Io(io::Error),
    Config(ConfigError),
    Artifact(ArtifactError),
    Predict(PredictError),
    Json(serde_json::Error),
    NoRequests,
    DoctorFailed,
    #[cfg(feature = "server")]
    Server(anyhow::Error),
}

impl From<io::Error> for CliErrorKind {
    fn from(e: io::Error) -> Self {
        CliErrorKind::Io(e)
    }
}

impl From<ConfigError> for CliErrorKind {
    fn from(e: ConfigError) -> Self {
        CliErrorKind::Config(e)
    }
}

impl From<ArtifactError> for CliErrorKind {
    fn from(e: ArtifactError) -> Self {
        CliErrorKind::Artifact(e)
    }
}

impl From<PredictError> for CliErrorKind {
    fn from(e: PredictError) -> Self {
        CliErrorKind::Predict(e)
    }
}

impl From<serde_json::Error> for CliErrorKind {
    fn from(e: serde_json::Error) -> Self {
        CliErrorKind::Json(e)
    }
}

#[cfg(feature = "server")]
impl From<anyhow::Error> for CliErrorKind {
    fn from(e: anyhow::Error) -> Self {
        CliErrorKind::Server(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliErrorKind> for CliError {
    fn from(e: CliErrorKind) -> Self {
        match e {
            CliErrorKind::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CliErrorKind::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the configuration file syntax".to_string()),
            },
            CliErrorKind::Artifact(e) => CliError {
                code: e.code().to_string(),
                message: e.to_string(),
                hint: Some("Pass a valid model artifact with --model".to_string()),
            },
            CliErrorKind::Predict(e) => CliError {
                code: e.code().to_string(),
                hint: Some(
                    match &e {
                        PredictError::InvalidInput(_) => "Run 'inner-weather schema input' for the request format",
                        PredictError::ModelUnavailable => "Load a model before predicting",
                        PredictError::UnmappedPhase(_) => "The model's classes do not match the mood table; run 'inner-weather doctor'",
                    }
                    .to_string(),
                ),
                message: e.to_string(),
            },
            CliErrorKind::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            CliErrorKind::NoRequests => CliError {
                code: "NO_REQUESTS".to_string(),
                message: "No requests found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            CliErrorKind::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            #[cfg(feature = "server")]
            CliErrorKind::Server(e) => CliError {
                code: "SERVER_ERROR".to_string(),
                message: format!("{:#}", e),
                hint: Some("Check the model path and that the port is free".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
