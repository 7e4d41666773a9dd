//! abi-merge CLI
//!
//! Entry point for the `abi-merge` command-line tool.

use abi_merge::artifact::load_artifact;
use abi_merge::config::{ConfigError, EffectiveConfig, Settings, DEFAULT_CONFIG_PATH};
use abi_merge::pipeline::PipelineError;
use abi_merge::{GenerationReport, InspectionSet, InterfaceCollection, Merger, Pipeline, Toolchain};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Exit code when a checked interface is stale
const EXIT_STALE: i32 = 1;

#[derive(Parser)]
#[command(name = "abi-merge")]
#[command(about = "Merge contract ABIs into one checksummed master interface", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArgs {
    /// Path to config file (default: abi-merge.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Override the artifacts directory
    #[arg(long)]
    artifacts_dir: Option<PathBuf>,

    /// Skip the compiler command and use existing artifacts
    #[arg(long)]
    no_compile: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate master interfaces for configured targets
    Generate {
        #[command(flatten)]
        config: ConfigArgs,

        /// Only generate this target (interface name)
        #[arg(long, short = 't')]
        target: Option<String>,

        /// Write a JSON report of the run
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Check generated interfaces against their current inputs
    Check {
        #[command(flatten)]
        config: ConfigArgs,

        /// Only check this target (interface name)
        #[arg(long, short = 't')]
        target: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Merge artifact files and print the merged ABI as JSON
    Merge {
        /// Artifact files, in precedence order
        #[arg(required = true)]
        artifacts: Vec<PathBuf>,

        /// Inspection function forced to view (repeatable; replaces the default set)
        #[arg(long = "inspect", value_name = "NAME")]
        inspect: Vec<String>,

        /// Disable the mutability override entirely
        #[arg(long, conflicts_with = "inspect")]
        no_inspect: bool,

        /// Write to a file instead of stdout
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Validate the configuration and list targets
    Verify {
        /// Path to config file (default: abi-merge.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Print the effective configuration with provenance as JSON
        #[arg(long, conflicts_with = "get")]
        json: bool,

        /// Print one effective value by dotted key, e.g. `renderer.kind`
        #[arg(long, value_name = "KEY")]
        get: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Generate {
            config,
            target,
            report,
        } => run_generate(&config, target.as_deref(), report.as_deref()),
        Commands::Check {
            config,
            target,
            json,
        } => run_check(&config, target.as_deref(), json),
        Commands::Merge {
            artifacts,
            inspect,
            no_inspect,
            out,
        } => run_merge(&artifacts, inspect, no_inspect, out.as_deref()),
        Commands::Verify { config, json, get } => run_verify(config.as_deref(), json, get.as_deref()),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(
    config_path: Option<&Path>,
    cli_overrides: Option<serde_json::Value>,
) -> Result<(EffectiveConfig, Settings), ConfigError> {
    let required = config_path.is_some();
    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    let effective = EffectiveConfig::build(Some(path), required, cli_overrides)?;
    let settings = effective.settings()?;
    Ok((effective, settings))
}

fn cli_overrides(args: &ConfigArgs) -> Option<serde_json::Value> {
    let mut map = serde_json::Map::new();
    if let Some(dir) = &args.artifacts_dir {
        map.insert(
            "artifacts_dir".to_string(),
            serde_json::Value::String(dir.to_string_lossy().to_string()),
        );
    }
    if args.no_compile {
        map.insert("compiler".to_string(), serde_json::Value::Null);
    }
    (!map.is_empty()).then_some(serde_json::Value::Object(map))
}

fn build_pipeline(args: &ConfigArgs) -> (EffectiveConfig, Pipeline) {
    let (effective, settings) = match load_config(args.config.as_deref(), cli_overrides(args)) {
        Ok(loaded) => loaded,
        Err(e) => fail(&PipelineError::Config(e)),
    };

    let toolchain = match Toolchain::from_settings(&settings) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error configuring tools: {}", e);
            process::exit(4);
        }
    };

    (effective, Pipeline::new(settings, toolchain))
}

fn fail(err: &PipelineError) -> ! {
    eprintln!("Error: {}", err);
    process::exit(err.exit_code());
}

fn run_generate(args: &ConfigArgs, target: Option<&str>, report_path: Option<&Path>) {
    let (effective, pipeline) = build_pipeline(args);

    let outcomes = match pipeline.generate_all(target) {
        Ok(o) => o,
        Err(e) => fail(&e),
    };

    for outcome in &outcomes {
        println!(
            "{} -> {} ({} entries, {} duplicates dropped, abi-checksum: {})",
            outcome.interface_name,
            outcome.output.display(),
            outcome.stats.entries_out,
            outcome.stats.duplicates_dropped,
            outcome.input_checksum
        );
    }

    if let Some(path) = report_path {
        let report =
            GenerationReport::new(effective.file_digest().map(str::to_string), outcomes);
        if let Err(e) = report.write_to_file(path) {
            eprintln!("Error writing report {}: {}", path.display(), e);
            process::exit(6);
        }
    }
}

fn run_check(args: &ConfigArgs, target: Option<&str>, json_output: bool) {
    let (_, pipeline) = build_pipeline(args);

    let outcomes = match pipeline.check_all(target) {
        Ok(o) => o,
        Err(e) => fail(&e),
    };

    if json_output {
        match serde_json::to_string_pretty(&outcomes) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        for outcome in &outcomes {
            let status = match &outcome.status {
                abi_merge::DriftStatus::UpToDate => "up to date".to_string(),
                abi_merge::DriftStatus::Stale { expected, found } => {
                    format!("STALE (expected {}, found {})", expected, found)
                }
                abi_merge::DriftStatus::MissingHeader => "STALE (no abi-checksum header)".to_string(),
                abi_merge::DriftStatus::MissingOutput => "MISSING".to_string(),
            };
            println!(
                "{} ({}): {}",
                outcome.interface_name,
                outcome.output.display(),
                status
            );
        }
    }

    if !outcomes.iter().all(|o| o.status.is_up_to_date()) {
        process::exit(EXIT_STALE);
    }
}

fn run_merge(artifacts: &[PathBuf], inspect: Vec<String>, no_inspect: bool, out: Option<&Path>) {
    let inspection = if no_inspect {
        InspectionSet::empty()
    } else if inspect.is_empty() {
        InspectionSet::default()
    } else {
        InspectionSet::new(inspect)
    };

    let mut collections: Vec<InterfaceCollection> = Vec::with_capacity(artifacts.len());
    for path in artifacts {
        match load_artifact(path) {
            Ok(c) => collections.push(c),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(4);
            }
        }
    }

    let merged = match Merger::new(inspection).merge(&collections) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(5);
        }
    };
    let merged_checksum = match merged.merged_checksum() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(5);
        }
    };

    let document = serde_json::json!({
        "checksum": merged.checksum,
        "merged_checksum": merged_checksum,
        "stats": merged.stats,
        "entries": merged.entries,
    });
    let json = match serde_json::to_string_pretty(&document) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    };

    match out {
        Some(path) => {
            if let Err(e) = std::fs::write(path, format!("{}\n", json)) {
                eprintln!("Error writing {}: {}", path.display(), e);
                process::exit(6);
            }
        }
        None => println!("{}", json),
    }
}

fn run_verify(config_path: Option<&Path>, json_output: bool, key: Option<&str>) {
    let (effective, settings) = match load_config(config_path, None) {
        Ok(loaded) => loaded,
        Err(e) => fail(&PipelineError::Config(e)),
    };

    if json_output {
        match effective.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing config: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    if let Some(key) = key {
        match (effective.get_str(key), effective.get(key)) {
            (Some(text), _) => println!("{}", text),
            (None, Some(value)) => println!("{}", value),
            (None, None) => {
                eprintln!("Error: no configuration value at '{}'", key);
                process::exit(3);
            }
        }
        return;
    }

    match effective.sources.iter().find_map(|s| s.path.as_deref()) {
        Some(path) => println!("Configuration valid: {}", path),
        None => println!("Configuration valid: built-in defaults (no config file)"),
    }
    println!();
    println!("  Artifacts: {}", settings.artifacts_dir.display());
    println!("  Inspection functions: {}", settings.inspection_functions.join(", "));
    if let Some(compiler) = &settings.compiler {
        println!("  Compiler: {}", compiler.command.join(" "));
    }
    match settings.renderer.kind {
        abi_merge::config::RendererKind::Json => println!("  Renderer: built-in JSON"),
        abi_merge::config::RendererKind::Command => {
            println!("  Renderer: {}", settings.renderer.command.join(" "))
        }
    }
    if let Some(formatter) = &settings.formatter {
        println!("  Formatter: {}", formatter.command.join(" "));
    }
    println!("  Targets: {}", settings.targets.len());
    for target in &settings.targets {
        println!(
            "    {} -> {} [{}]",
            target.interface_name,
            target.output.display(),
            target.sources.join(", ")
        );
    }
}
