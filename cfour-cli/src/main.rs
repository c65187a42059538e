//! Command-line interface for cfour
//! This binary splits a CFOUR output log into program invocations and their sections,
//! and prints the recovered tree together with the extracted values.
//!
//! Usage:
//!   cfour `<path>` [--format `<format>`] [--level `<0-3>`]   - Parse a log and render it
//!   cfour --list-programs                                    - List programs with a section grammar
//!
//! Diagnostics go to stderr through `tracing`; `-v` raises the log level, `RUST_LOG`
//! overrides it entirely.

use cfour_config::{CfourConfig, Error as ConfigError, Loader, OutputFormat, LOCAL_CONFIG};
use cfour_parser::cfour::formats::{provenance, summary};
use cfour_parser::cfour::grammars::GrammarRegistry;
use cfour_parser::cfour::{LogLoader, ParsedLog, Pipeline, PipelineOptions};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Unreadable input or unusable configuration.
const EXIT_USAGE: u8 = 2;
/// `--strict` and the log produced error diagnostics.
const EXIT_DIAGNOSTICS: u8 = 1;

fn command() -> Command {
    Command::new("cfour")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Splits CFOUR output logs into programs and sections")
        .arg_required_else_help(true)
        .arg(
            Arg::new("path")
                .help("Path to the CFOUR output log")
                .required_unless_present("list-programs")
                .index(1),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Configuration file layered over the defaults and ./cfour.toml"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .help("Output format")
                .value_parser(OutputFormat::ALL.map(|f| f.as_str())),
        )
        .arg(
            Arg::new("level")
                .long("level")
                .short('l')
                .help("Provenance detail (0-3)")
                .value_parser(value_parser!(u8).range(0..=3)),
        )
        .arg(
            Arg::new("drop-failed")
                .long("drop-failed")
                .help("Drop invocations whose begin and end markers do not agree")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-extract")
                .long("no-extract")
                .help("Only split the log into programs")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("compact")
                .long("compact")
                .help("Print JSON on a single line")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("Exit with status 1 when the log produced error diagnostics")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log more (-v info, -vv debug)")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("list-programs")
                .long("list-programs")
                .help("List programs with a registered section grammar")
                .action(ArgAction::SetTrue),
        )
}

fn main() -> ExitCode {
    let matches = command().get_matches();
    init_tracing(matches.get_count("verbose"));

    if matches.get_flag("list-programs") {
        handle_list_programs_command();
        return ExitCode::SUCCESS;
    }

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };
    let Some(path) = matches.get_one::<String>("path") else {
        eprintln!("No log file given");
        return ExitCode::from(EXIT_USAGE);
    };
    handle_parse_command(path, &config, matches.get_flag("strict"))
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

/// Defaults, then `./cfour.toml`, then `--config`, then the command-line switches.
fn load_config(matches: &ArgMatches) -> Result<CfourConfig, ConfigError> {
    let mut loader = Loader::new().with_optional_file(LOCAL_CONFIG);
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    if let Some(format) = matches.get_one::<String>("format") {
        loader = loader.set_override("render.format", format.as_str())?;
    }
    if let Some(level) = matches.get_one::<u8>("level") {
        loader = loader.set_override("render.verbosity", i64::from(*level))?;
    }
    if matches.get_flag("drop-failed") {
        loader = loader.set_override("programs.keep_failed", false)?;
    }
    if matches.get_flag("no-extract") {
        loader = loader.set_override("programs.extract", false)?;
    }
    if matches.get_flag("compact") {
        loader = loader.set_override("render.pretty", false)?;
    }
    loader.build()
}

/// Handle the parse command
fn handle_parse_command(path: &str, config: &CfourConfig, strict: bool) -> ExitCode {
    let loader = match LogLoader::from_path(path) {
        Ok(loader) => loader,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };
    let options = PipelineOptions {
        keep_failed: config.programs.keep_failed,
        extract: config.programs.extract,
    };
    let pipeline = Pipeline::new(GrammarRegistry::with_defaults(), options);
    let parsed = loader.parse_with(&pipeline);
    tracing::info!(
        programs = parsed.programs.len(),
        diagnostics = parsed.diagnostics.len(),
        "parsed {}",
        path
    );

    let formatted = match render(&parsed, config) {
        Ok(formatted) => formatted,
        Err(e) => {
            eprintln!("Error formatting output: {}", e);
            return ExitCode::FAILURE;
        }
    };
    print!("{}", formatted);

    if strict && parsed.has_errors() {
        return ExitCode::from(EXIT_DIAGNOSTICS);
    }
    ExitCode::SUCCESS
}

fn render(parsed: &ParsedLog, config: &CfourConfig) -> Result<String, String> {
    let programs = &parsed.programs;
    match config.render.format {
        OutputFormat::Provenance => Ok(provenance::render(programs, config.render.verbosity)),
        OutputFormat::Summary => Ok(summary::render(programs)),
        OutputFormat::Json => {
            let json = if config.render.pretty {
                serde_json::to_string_pretty(programs)
            } else {
                serde_json::to_string(programs)
            };
            json.map(|s| s + "\n").map_err(|e| e.to_string())
        }
        OutputFormat::Yaml => serde_yaml::to_string(programs).map_err(|e| e.to_string()),
    }
}

/// Handle the list-programs command
fn handle_list_programs_command() {
    let grammars = GrammarRegistry::with_defaults();
    println!("Programs with a section grammar:\n");
    for program in grammars.programs() {
        println!("  {}", program);
    }
}
