use std::path::{Path, PathBuf};
use std::process;

use clap::Args;
use treexpand::config::Config;

use super::{init_logging, try_load_tree};

#[derive(Args)]
pub struct FmtArgs {
    /// Input tree files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Check formatting without modifying (exit 1 if unformatted)
    #[arg(long)]
    pub check: bool,
}

pub fn cmd_fmt(args: FmtArgs) {
    let FmtArgs { inputs, check } = args;
    init_logging(&Config::default());

    let mut failed = false;
    for file in &inputs {
        match format_single_file(file, check) {
            Ok(changed) if changed && check => failed = true,
            Err(msg) => {
                eprintln!("error: {}", msg);
                failed = true;
            }
            _ => {}
        }
    }

    if failed {
        process::exit(1);
    }
}

/// Format a single tree file. Returns Ok(true) if the file was changed/would be changed.
fn format_single_file(path: &Path, check: bool) -> Result<bool, String> {
    let (source, tree) = try_load_tree(path)
        .ok_or_else(|| format!("cannot format '{}'", path.display()))?;
    let formatted = treexpand::format_tree(&tree);

    if formatted == source {
        if check {
            eprintln!("OK: {}", path.display());
        } else {
            eprintln!("Already formatted: {}", path.display());
        }
        return Ok(false);
    }

    if check {
        eprintln!("would reformat: {}", path.display());
        return Ok(true);
    }

    std::fs::write(path, &formatted)
        .map_err(|e| format!("cannot write '{}': {}", path.display(), e))?;
    eprintln!("Formatted: {}", path.display());
    Ok(true)
}
