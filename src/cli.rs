//! The `sharpc` driver: wires files into a [`Compiler`] and prints
//! diagnostics. The core library stays CLI-free; everything here is glue.

use clap::Parser as ClapParser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::arena_ctx::AstArenas;
use crate::compiler::{parse_sources, Compiler};
use crate::diagnostic::Severity;
use crate::options::{CompilerOptions, MAX_WARNING_LEVEL};
use crate::source::SourceText;
use crate::style::Style;

#[derive(ClapParser)]
#[command(name = "sharpc")]
#[command(about = "SharpScript front-end: scan, preprocess, and parse", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Source files to parse, in order.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Define a preprocessor symbol (repeatable).
    #[arg(short = 'd', long = "define")]
    pub defines: Vec<String>,

    /// Warning level, 0-4.
    #[arg(long = "warn", value_parser = clap::value_parser!(u8).range(0..=MAX_WARNING_LEVEL as i64))]
    pub warn: Option<u8>,

    /// Suppress a warning code (repeatable).
    #[arg(long = "nowarn")]
    pub nowarn: Vec<u16>,

    /// Treat warnings as errors.
    #[arg(long = "warnaserror")]
    pub warnaserror: bool,

    /// Output format for diagnostics.
    #[arg(long = "format", default_value = "text")]
    pub format: OutputFormat,

    /// Project configuration file; defaults to Sharp.toml beside the
    /// first source when present.
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// `Sharp.toml` project defaults; command-line flags win over these.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub warning_level: Option<u8>,
    #[serde(default)]
    pub disabled_warnings: Vec<u16>,
    #[serde(default)]
    pub warnings_as_errors: bool,
}

impl ProjectConfig {
    pub fn load(path: &Path) -> Result<ProjectConfig, CliError> {
        let text = fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| CliError::Config(format!("{}: {e}", path.display())))
    }
}

#[derive(Debug)]
pub enum CliError {
    Config(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for CliError {}

/// Merge config-file defaults and command-line flags into base options.
fn build_options(cli: &Cli, config: &ProjectConfig) -> CompilerOptions {
    let mut options = CompilerOptions::new();
    for symbol in config.defines.iter().chain(cli.defines.iter()) {
        options.define(symbol);
    }
    options.warning_level = cli
        .warn
        .or(config.warning_level)
        .unwrap_or(MAX_WARNING_LEVEL);
    options.warnings_as_errors = cli.warnaserror || config.warnings_as_errors;
    for &code in config.disabled_warnings.iter().chain(cli.nowarn.iter()) {
        options.disable_warning(code);
    }
    options
}

pub fn run_cli() -> Result<i32, CliError> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ProjectConfig::load(path)?,
        None => {
            let implicit = cli
                .files
                .first()
                .and_then(|f| f.parent())
                .map(|dir| dir.join("Sharp.toml"))
                .filter(|p| p.is_file());
            match implicit {
                Some(path) => ProjectConfig::load(&path)?,
                None => ProjectConfig::default(),
            }
        }
    };

    let mut compiler = Compiler::new(build_options(&cli, &config));
    let sources: Vec<SourceText> = cli
        .files
        .iter()
        .map(|f| SourceText::named(f.display().to_string()))
        .collect();

    let arenas = AstArenas::new();
    let ctx = arenas.context();
    let files = parse_sources(&mut compiler, ctx, sources);

    match cli.format {
        OutputFormat::Json => println!("{}", compiler.messages().to_json()),
        OutputFormat::Text => {
            for message in compiler.messages() {
                let line = message.to_string();
                let styled = match message.severity {
                    Severity::Error => Style::bold_red(&line),
                    Severity::Warning => Style::yellow(&line),
                    Severity::Info => Style::dim(&line),
                };
                eprintln!("{styled}");
            }
            eprintln!(
                "{}",
                Style::cyan(&format!(
                    "{} file(s), {} diagnostic(s)",
                    files.len(),
                    compiler.messages().len()
                ))
            );
        }
    }

    Ok(if compiler.has_errors() { 1 } else { 0 })
}
