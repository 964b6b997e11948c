pub mod check;
pub mod fmt;
pub mod hash;
pub mod rewrite;

use std::path::Path;
use std::process;

use tracing_subscriber::{fmt as log_fmt, EnvFilter};
use treexpand::config::Config;
use treexpand::Expr;

const DEFAULT_LOG_FILTER: &str = "warn";

/// Initialize logging. `RUST_LOG` wins over the `[log] filter` option.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER))
    });

    log_fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load options from `explicit`, or from the treexpand.toml nearest to
/// `input`. Missing files mean defaults; unreadable ones exit.
pub fn load_config(input: &Path, explicit: Option<&Path>) -> Config {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => Config::find(input.parent().unwrap_or(Path::new("."))),
    };
    let Some(path) = path else {
        return Config::default();
    };
    match Config::load(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e.message);
            for note in &e.notes {
                eprintln!("  note: {}", note);
            }
            process::exit(1);
        }
    }
}

/// Try to load and parse a tree file, returning None on error (prints diagnostics).
pub fn try_load_tree(path: &Path) -> Option<(String, Expr)> {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path.display(), e);
            return None;
        }
    };
    let filename = path.to_string_lossy().to_string();
    match treexpand::parse_source(&source, &filename) {
        Ok(tree) => Some((source, tree)),
        Err(_) => {
            eprintln!("error: parse errors in '{}'", path.display());
            None
        }
    }
}

/// Load and parse a tree file, exiting on error.
pub fn load_tree(path: &Path) -> (String, Expr) {
    match try_load_tree(path) {
        Some(result) => result,
        None => process::exit(1),
    }
}

/// Report a rewrite failure and exit.
pub fn exit_with(err: &treexpand::RewriteError, path: &Path) -> ! {
    eprintln!("error: {}: {}", path.display(), err);
    if !err.is_fatal() {
        eprintln!("  help: the tree is well formed but cannot be expanded as written");
    }
    process::exit(1);
}
