//! ToolSwitch CLI - JSON bridge for build engines
//!
//! Commands: rules, show, check, render
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on validation or render failure

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use toolswitch_core::{
    logging, rule_fingerprint, RenderPipeline, RenderRequest, RuleRegistry, ValueBinding,
};

#[derive(Parser)]
#[command(name = "toolswitch-cli")]
#[command(about = "ToolSwitch CLI - Rule-driven command-line generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to rules directory
    #[arg(short, long, env = "TOOLSWITCH_RULES_DIR", default_value = "rules")]
    rules_dir: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List available rules
    Rules,

    /// Show one rule with its properties
    Show {
        /// Rule name
        #[arg(short, long)]
        rule: String,
    },

    /// Check a value binding without rendering
    Check(BindingArgs),

    /// Render a command line
    Render(BindingArgs),
}

#[derive(Args)]
struct BindingArgs {
    /// Rule name
    #[arg(short, long)]
    rule: String,

    /// JSON payload (property name -> value)
    #[arg(short, long, conflicts_with = "payload_file", required_unless_present = "payload_file")]
    payload: Option<String>,

    /// File holding the JSON payload
    #[arg(long)]
    payload_file: Option<PathBuf>,

    /// Rendering template, e.g. "[Sources] [Program]"
    #[arg(short, long)]
    template: Option<String>,
}

impl BindingArgs {
    fn bindings(&self) -> Result<ValueBinding, String> {
        let payload = match (&self.payload, &self.payload_file) {
            (Some(payload), _) => payload.clone(),
            (None, Some(path)) => fs::read_to_string(path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?,
            (None, None) => return Err("No payload given".to_string()),
        };
        serde_json::from_str(&payload).map_err(|e| format!("Invalid payload: {}", e))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("Failed to initialise logging: {}", e);
    }

    let registry = match RuleRegistry::load_from_dir(&cli.rules_dir) {
        Ok(r) => r,
        Err(e) => {
            emit(&serde_json::json!({ "error": format!("Failed to load rules: {}", e) }));
            return ExitCode::FAILURE;
        }
    };

    let pipeline = RenderPipeline::new(registry);

    match cli.command {
        Commands::Rules => {
            let rules: Vec<_> = pipeline
                .list_rules()
                .iter()
                .map(|r| serde_json::json!({
                    "name": r.name(),
                    "displayName": r.display_name(),
                    "toolName": r.tool_name(),
                    "schemaVersion": r.schema_version().to_string(),
                    "properties": r.properties().len(),
                }))
                .collect();
            emit(&rules)
        }

        Commands::Show { rule } => match pipeline.get_rule(&rule) {
            Some(rule) => {
                let fingerprint = match rule_fingerprint(rule) {
                    Ok(f) => f,
                    Err(e) => {
                        emit(&serde_json::json!({ "error": e.to_string() }));
                        return ExitCode::FAILURE;
                    }
                };
                emit(&serde_json::json!({ "rule": rule, "fingerprint": fingerprint }))
            }
            None => {
                emit(&serde_json::json!({ "error": format!("Rule not found: {}", rule) }));
                ExitCode::FAILURE
            }
        },

        Commands::Check(args) => {
            let bindings = match args.bindings() {
                Ok(b) => b,
                Err(e) => {
                    emit(&serde_json::json!({ "valid": false, "error": e }));
                    return ExitCode::FAILURE;
                }
            };

            match pipeline.check_bindings(&args.rule, &bindings, args.template.as_deref()) {
                Ok(result) => {
                    let code = emit(&result);
                    if result.valid {
                        code
                    } else {
                        ExitCode::from(2)
                    }
                }
                Err(e) => {
                    emit(&serde_json::json!({ "valid": false, "error": e.to_string() }));
                    ExitCode::FAILURE
                }
            }
        }

        Commands::Render(args) => {
            let bindings = match args.bindings() {
                Ok(b) => b,
                Err(e) => {
                    emit(&serde_json::json!({ "success": false, "error": e }));
                    return ExitCode::FAILURE;
                }
            };

            let request = RenderRequest {
                rule: args.rule,
                values: bindings,
                template: args.template,
            };

            match pipeline.render_command(&request) {
                Ok(command) => emit(&serde_json::json!({ "success": true, "command": command })),
                Err(e) => {
                    emit(&serde_json::json!({ "success": false, "error": e.to_string() }));
                    ExitCode::from(2)
                }
            }
        }
    }
}

fn emit<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to serialize output: {}", e);
            ExitCode::FAILURE
        }
    }
}
