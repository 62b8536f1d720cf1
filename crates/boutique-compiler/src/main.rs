//! Catalog compiler binary. Validates a tree of per-app source folders and
//! assembles the compiled index the engine consumes.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use boutique_core::compiler::{CompileOptions, Diagnostic, Severity, compile};
use boutique_core::distro::DistroInfo;

/// Compiles a software catalog source tree into a distributable index
#[derive(Parser, Debug)]
#[command(name = "boutique-compile")]
#[command(version)]
#[command(about = "Compiles a software catalog source tree into a distributable index", long_about = None)]
struct Args {
    /// Source tree of per-app folders (<source>/<category>/<app-id>/)
    #[arg(long, default_value = "apps")]
    source: PathBuf,

    /// Output directory for the compiled index and assets
    #[arg(long, default_value = "dist")]
    output: PathBuf,

    /// Directory holding per-app translation files
    #[arg(long)]
    translations: Option<PathBuf>,

    /// Locales to build translated index variants for (repeatable)
    #[arg(long = "locale")]
    locales: Vec<String>,

    /// Set the logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let options = CompileOptions {
        source_dir: args.source,
        output_dir: args.output,
        translations_dir: args.translations,
        locales: args.locales,
        distro: DistroInfo::default(),
    };

    let report = match compile(&options) {
        Ok(report) => report,
        Err(error) => {
            tracing::error!(%error, "compilation aborted");
            return ExitCode::FAILURE;
        }
    };

    let color = !args.no_color && std::io::stdout().is_terminal();
    for diagnostic in &report.diagnostics {
        println!("{}", render(diagnostic, color));
    }

    if let Some(stats) = report.stats {
        tracing::info!(
            categories = stats.categories,
            apps = stats.apps,
            "compilation finished"
        );
    }

    if report.failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn render(diagnostic: &Diagnostic, color: bool) -> String {
    let (code, label) = match diagnostic.severity {
        Severity::Error => ("\x1b[91m", "Error"),
        Severity::Success => ("\x1b[92m", "Success"),
        Severity::Warning => ("\x1b[93m", "Warning"),
        Severity::Info => ("\x1b[96m", "Info"),
    };
    let subject = match &diagnostic.entry {
        Some(entry) => format!("{entry}: {}", diagnostic.message),
        None => diagnostic.message.clone(),
    };
    if color {
        format!("{code}{label:>7}\x1b[0m  {subject}")
    } else {
        format!("{label:>7}  {subject}")
    }
}
