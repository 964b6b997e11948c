use std::path::PathBuf;
use std::process;

use clap::Args;
use serde::Serialize;
use treexpand::ast::navigate::{residue, Residue};
use treexpand::{fingerprint, format_tree, ContentHash, RewriteStats};

use super::{exit_with, init_logging, load_config, load_tree};

#[derive(Args)]
pub struct RewriteArgs {
    /// Input tree file
    pub input: PathBuf,
    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Nesting limit (overrides treexpand.toml)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_depth: Option<u32>,
    /// Print expansion counters to stderr
    #[arg(long)]
    pub stats: bool,
    /// Emit a JSON report instead of notation
    #[arg(long)]
    pub json: bool,
    /// Options file (default: nearest treexpand.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Serialize)]
struct RewriteReport<'a> {
    input: String,
    source_hash: ContentHash,
    expanded_hash: ContentHash,
    stats: RewriteStats,
    residue: Residue,
    tree: &'a str,
}

pub fn cmd_rewrite(args: RewriteArgs) {
    let RewriteArgs {
        input,
        output,
        max_depth,
        stats,
        json,
        config,
    } = args;
    let mut config = load_config(&input, config.as_deref());
    if let Some(limit) = max_depth {
        config.rewrite.max_depth = limit;
    }
    init_logging(&config);

    let (_, tree) = load_tree(&input);
    let rewritten = match treexpand::rewrite_with(&tree, &config.rewrite) {
        Ok(r) => r,
        Err(e) => exit_with(&e, &input),
    };
    let text = format_tree(&rewritten.tree);

    let out = if json {
        let report = RewriteReport {
            input: input.display().to_string(),
            source_hash: fingerprint(&tree),
            expanded_hash: fingerprint(&rewritten.tree),
            stats: rewritten.stats,
            residue: residue(&rewritten.tree),
            tree: &text,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(s) => s + "\n",
            Err(e) => {
                eprintln!("error: cannot serialize report: {}", e);
                process::exit(1);
            }
        }
    } else {
        text
    };

    if stats {
        let s = rewritten.stats;
        eprintln!(
            "Expanded {}: {} invocation(s) inlined, {} capture(s) resolved, {} marker(s) unwrapped",
            input.display(),
            s.invocations_inlined,
            s.captures_resolved,
            s.sentinels_unwrapped
        );
    }

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, &out) {
                eprintln!("error: cannot write '{}': {}", path.display(), e);
                process::exit(1);
            }
            eprintln!("Wrote: {}", path.display());
        }
        None => print!("{}", out),
    }
}
