//! Energy CLI - Command-line interface for Synheart Energy
//!
//! Commands:
//! - compute: Compute a maintenance and budget snapshot from health records
//! - validate: Validate health samples against the input schema
//! - doctor: Diagnose configuration and snapshot files
//! - schema: Print input and output schema information

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use synheart_energy::config::EngineConfig;
use synheart_energy::pipeline::{parse_reference_date, EnergyProcessor};
use synheart_energy::records::{HealthKind, HealthRecords, SCHEMA_VERSION};
use synheart_energy::types::{EnergySnapshot, SNAPSHOT_VERSION};
use synheart_energy::{ComputeError, ENERGY_VERSION, PRODUCER_NAME};

/// Energy - On-device maintenance estimation and weekly calorie budgets
#[derive(Parser)]
#[command(name = "energy")]
#[command(author = "Synheart AI Inc")]
#[command(version = ENERGY_VERSION)]
#[command(about = "Estimate maintenance calories and weekly budgets from health records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a snapshot from health records
    Compute {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Engine configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Reference date (YYYY-MM-DD); defaults to today in the configured offset
        #[arg(long)]
        date: Option<String>,

        /// Load the last-known-good snapshot from file
        #[arg(long)]
        load_snapshot: Option<PathBuf>,

        /// Save the snapshot to file after processing
        #[arg(long)]
        save_snapshot: Option<PathBuf>,
    },

    /// Validate health samples
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and snapshot files
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Check a snapshot file
        #[arg(long)]
        snapshot: Option<PathBuf>,

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
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// JSON array or {"samples": [...]}, else NDJSON
    Auto,
    /// JSON array or {"samples": [...]}
    Json,
    /// Newline-delimited JSON (one sample per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (energy.health_sample.v1)
    Input,
    /// Output schema (energy.snapshot.v1)
    Output,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr, filtered by RUST_LOG (default: warn)
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<(), EnergyCliError> {
    match cli.command {
        Commands::Compute {
            input,
            output,
            input_format,
            output_format,
            config,
            date,
            load_snapshot,
            save_snapshot,
        } => cmd_compute(
            &input,
            &output,
            input_format,
            output_format,
            config.as_deref(),
            date.as_deref(),
            load_snapshot.as_deref(),
            save_snapshot.as_deref(),
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor {
            config,
            snapshot,
            json,
        } => cmd_doctor(config.as_deref(), snapshot.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_compute(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&Path>,
    date: Option<&str>,
    load_snapshot: Option<&Path>,
    save_snapshot: Option<&Path>,
) -> Result<(), EnergyCliError> {
    let config = match config {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };

    let reference_date = match date {
        Some(date) => parse_reference_date(date)?,
        None => today(&config)?,
    };
    debug!(%reference_date, "computing snapshot");

    let mut processor = EnergyProcessor::with_config(config)?;

    if let Some(snapshot_path) = load_snapshot {
        let snapshot_json = fs::read_to_string(snapshot_path)?;
        processor.load_snapshot(&snapshot_json)?;
    }

    let computed = read_records(input, &input_format)
        .and_then(|records| Ok(processor.process_records(&records, reference_date)?.clone()));

    // A failed refresh falls back to the loaded snapshot
    let snapshot = match (computed, processor.last_snapshot()) {
        (Ok(snapshot), _) => snapshot,
        (Err(e), Some(last)) => {
            warn!(error = ?e, "refresh failed, emitting last-known-good snapshot");
            last.clone()
        }
        (Err(e), None) => return Err(e),
    };

    if let Some(snapshot_path) = save_snapshot {
        fs::write(snapshot_path, processor.save_snapshot()?)?;
    }

    let output_data = format_output(&snapshot, &output_format)?;

    if output.to_string_lossy() == "-" {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    json: bool,
) -> Result<(), EnergyCliError> {
    let records = read_records(input, &input_format)?;
    let invalid = records.validate_samples();

    let mut kinds: Vec<KindCount> = HealthKind::ALL
        .iter()
        .map(|kind| KindCount {
            kind: kind.as_str().to_string(),
            samples: records.samples().iter().filter(|s| s.kind == *kind).count(),
        })
        .collect();
    kinds.retain(|k| k.samples > 0);

    let report = ValidationReport {
        schema_version: SCHEMA_VERSION.to_string(),
        total_samples: records.len(),
        valid_samples: records.len() - invalid.len(),
        invalid_samples: invalid.len(),
        kinds,
        errors: invalid
            .iter()
            .map(|result| ValidationErrorDetail {
                index: result.index,
                kind: result.kind.as_str().to_string(),
                error: result.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total samples:   {}", report.total_samples);
        println!("Valid samples:   {}", report.valid_samples);
        println!("Invalid samples: {}", report.invalid_samples);

        if !report.kinds.is_empty() {
            println!("\nBy kind:");
            for kind in &report.kinds {
                println!("  - {}: {}", kind.kind, kind.samples);
            }
        }

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Sample {} ({}): {}", err.index, err.kind, err.error);
            }
        }
    }

    if report.invalid_samples > 0 {
        Err(EnergyCliError::ValidationFailed(report.invalid_samples))
    } else {
        Ok(())
    }
}

fn cmd_doctor(
    config: Option<&Path>,
    snapshot: Option<&Path>,
    json: bool,
) -> Result<(), EnergyCliError> {
    let mut checks: Vec<DoctorCheck> = vec![
        DoctorCheck {
            name: "energy_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Energy version {}", ENERGY_VERSION),
        },
        DoctorCheck {
            name: "schema_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Input schema: {}, output schema: {}", SCHEMA_VERSION, SNAPSHOT_VERSION),
        },
    ];

    if let Some(config_path) = config {
        checks.push(check_file(config_path, "config", |content| {
            let config = EngineConfig::from_json(content)?;
            Ok(format!(
                "Config valid (alpha {}, intake window {} days, cycle starts {})",
                config.smoothing_alpha, config.intake_window_days, config.first_weekday
            ))
        }));
    }

    if let Some(snapshot_path) = snapshot {
        checks.push(check_file(snapshot_path, "snapshot", |content| {
            let snapshot = EnergySnapshot::from_json(content)?;
            if snapshot.snapshot_version != SNAPSHOT_VERSION {
                return Err(ComputeError::ParseError(format!(
                    "unsupported snapshot version {}",
                    snapshot.snapshot_version
                )));
            }
            Ok(format!(
                "Snapshot valid (reference date {}, maintenance {:.0} kcal)",
                snapshot.reference_date, snapshot.maintenance.maintenance
            ))
        }));
    }

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
            message: "stdin is a pipe (use --input - to read records)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENERGY_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Energy Doctor Report");
        println!("====================");
        println!("Producer: {}", report.producer);
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
        Err(EnergyCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), EnergyCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("Each sample is {{ kind, timestamp, value, source? }}:");
                println!();
                for kind in HealthKind::ALL {
                    println!("  - {} ({})", kind.as_str(), kind.unit());
                }
                println!();
                println!("timestamp is RFC 3339 with a UTC offset.");
                println!("body_fat_percentage accepts a fraction (0.22) or percent (22).");
                println!("Input is a JSON array, {{\"samples\": [...]}}, or NDJSON.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: {}", SNAPSHOT_VERSION);
                println!();
                println!("- snapshot_version, reference_date, computed_at_utc");
                println!("- producer: {{ name, version, instance_id }}");
                println!("- intake: {{ confidence, is_valid, smoothed_intake, short_term_smoothed_intake, today_total, days_logged }}");
                println!("- maintenance: {{ maintenance, calorie_confidence, weight_confidence, raw_weight_slope, weight_slope, energy_density, fallback_source, ... }}");
                println!("- budget: {{ base_budget, credit, daily_adjustment, budget, remaining, days_remaining, cycle_start, ... }}");
                println!("- macros: Array of {{ kind, percent, budget, remaining, today_total }}");
            }
        }
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, EnergyCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_records(input: &Path, format: &InputFormat) -> Result<HealthRecords, EnergyCliError> {
    let data = read_input(input)?;
    let records = match format {
        InputFormat::Auto => HealthRecords::parse(&data)?,
        InputFormat::Json => HealthRecords::parse_json(&data)?,
        InputFormat::Ndjson => HealthRecords::parse_ndjson(&data)?,
    };
    if records.is_empty() {
        return Err(EnergyCliError::NoSamples);
    }
    Ok(records)
}

fn today(config: &EngineConfig) -> Result<NaiveDate, EnergyCliError> {
    let tz = config.timezone()?;
    Ok(Utc::now().with_timezone(&tz).date_naive())
}

fn check_file<F>(path: &Path, name: &str, validate: F) -> DoctorCheck
where
    F: FnOnce(&str) -> Result<String, ComputeError>,
{
    if !path.exists() {
        return DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: format!("{} file does not exist", name),
        };
    }

    let (status, message) = match fs::read_to_string(path) {
        Ok(content) => match validate(&content) {
            Ok(message) => (CheckStatus::Ok, message),
            Err(e) => (CheckStatus::Error, format!("Invalid {}: {}", name, e)),
        },
        Err(e) => (
            CheckStatus::Error,
            format!("Cannot read {} file: {}", name, e),
        ),
    };

    DoctorCheck {
        name: name.to_string(),
        status,
        message,
    }
}

fn format_output(snapshot: &EnergySnapshot, format: &OutputFormat) -> Result<String, EnergyCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(snapshot)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(snapshot)?),
    }
}

fn get_input_json_schema() -> String {
    let kinds: Vec<&str> = HealthKind::ALL.iter().map(|k| k.as_str()).collect();
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://synheart.ai/schemas/energy.health_sample.v1.json",
        "title": SCHEMA_VERSION,
        "description": "Synheart Energy health sample schema",
        "type": "object",
        "required": ["kind", "timestamp", "value"],
        "properties": {
            "kind": { "type": "string", "enum": kinds },
            "timestamp": { "type": "string", "format": "date-time" },
            "value": { "type": "number", "minimum": 0 },
            "source": { "type": "string" }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    let number = serde_json::json!({ "type": "number" });
    let optional_number = serde_json::json!({ "type": ["number", "null"] });
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://synheart.ai/schemas/energy.snapshot.v1.json",
        "title": SNAPSHOT_VERSION,
        "description": "Synheart Energy snapshot schema",
        "type": "object",
        "required": [
            "snapshot_version", "producer", "reference_date", "computed_at_utc",
            "intake", "maintenance", "budget", "macros"
        ],
        "properties": {
            "snapshot_version": { "type": "string", "const": SNAPSHOT_VERSION },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" }
                }
            },
            "reference_date": { "type": "string", "format": "date" },
            "computed_at_utc": { "type": "string", "format": "date-time" },
            "intake": {
                "type": "object",
                "properties": {
                    "confidence": number,
                    "is_valid": { "type": "boolean" },
                    "smoothed_intake": optional_number,
                    "short_term_smoothed_intake": optional_number,
                    "today_total": number,
                    "days_logged": { "type": "integer" }
                }
            },
            "maintenance": {
                "type": "object",
                "properties": {
                    "maintenance": number,
                    "calorie_confidence": number,
                    "weight_confidence": number,
                    "raw_weight_slope": number,
                    "weight_slope": number,
                    "energy_density": number,
                    "fallback_maintenance": number,
                    "fallback_source": { "type": "object" }
                }
            },
            "budget": {
                "type": "object",
                "properties": {
                    "base_budget": number,
                    "credit": number,
                    "daily_adjustment": number,
                    "budget": number,
                    "remaining": number,
                    "days_remaining": { "type": "integer", "minimum": 1 },
                    "cycle_start": { "type": "string", "format": "date" }
                }
            },
            "macros": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "kind": { "type": "string", "enum": ["protein", "carbohydrates", "fat"] },
                        "percent": optional_number,
                        "budget": optional_number,
                        "remaining": optional_number,
                        "today_total": number
                    }
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum EnergyCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoSamples,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for EnergyCliError {
    fn from(e: io::Error) -> Self {
        EnergyCliError::Io(e)
    }
}

impl From<ComputeError> for EnergyCliError {
    fn from(e: ComputeError) -> Self {
        EnergyCliError::Compute(e)
    }
}

impl From<serde_json::Error> for EnergyCliError {
    fn from(e: serde_json::Error) -> Self {
        EnergyCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<EnergyCliError> for CliError {
    fn from(e: EnergyCliError) -> Self {
        match e {
            EnergyCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            EnergyCliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::InvalidSmoothingAlpha(_)
                    | ComputeError::InvalidWindow { .. }
                    | ComputeError::InvalidConfig(_) => {
                        ("CONFIG_ERROR", "Run 'energy doctor --config <file>' for details")
                    }
                    ComputeError::DateParseError(_) => {
                        ("DATE_ERROR", "Use the YYYY-MM-DD date format")
                    }
                    _ => (
                        "PARSE_ERROR",
                        "Ensure input matches the energy.health_sample.v1 schema",
                    ),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            EnergyCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            EnergyCliError::NoSamples => CliError {
                code: "NO_SAMPLES".to_string(),
                message: "No health samples found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            EnergyCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} samples failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            EnergyCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    schema_version: String,
    total_samples: usize,
    valid_samples: usize,
    invalid_samples: usize,
    kinds: Vec<KindCount>,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct KindCount {
    kind: String,
    samples: usize,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    kind: String,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
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
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
