//! CLI support library for the sn binary: argument surface, the
//! compilation driver, and diagnostic rendering.

pub mod args;
pub mod driver;

use colored::Colorize;
use sn_common::Diagnostic;

/// Render diagnostics to stderr, one per line, `filename:line: kind:
/// message` with an optional hint underneath.
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let location = format!("{}:{}", diagnostic.file, diagnostic.line);
        eprintln!(
            "{}: {}: {}",
            location.bold(),
            diagnostic.kind.to_string().red().bold(),
            diagnostic.message
        );
        if let Some(hint) = &diagnostic.hint {
            eprintln!("  {}: {hint}", "hint".cyan());
        }
    }
    let count = diagnostics.len();
    if count > 1 {
        eprintln!("{}", format!("{count} errors").red().bold());
    }
}

/// Install the tracing subscriber. `SN_LOG` takes precedence; `-v` raises
/// the default level to debug.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("SN_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
