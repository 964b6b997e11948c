use std::path::PathBuf;

use clap::Args;
use treexpand::ast::navigate::{count_nodes, residue};

use super::{exit_with, init_logging, load_config, load_tree};

#[derive(Args)]
pub struct CheckArgs {
    /// Input tree file
    pub input: PathBuf,
    /// Options file (default: nearest treexpand.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

pub fn cmd_check(args: CheckArgs) {
    let CheckArgs { input, config } = args;
    let config = load_config(&input, config.as_deref());
    init_logging(&config);

    let (_, tree) = load_tree(&input);
    let before = residue(&tree);
    let rewritten = match treexpand::rewrite_with(&tree, &config.rewrite) {
        Ok(r) => r,
        Err(e) => exit_with(&e, &input),
    };
    let after = residue(&rewritten.tree);
    if !after.is_empty() {
        eprintln!(
            "warning: {} still holds expansion targets after rewriting: {:?}",
            input.display(),
            after
        );
    }

    if before.is_empty() {
        eprintln!("OK: {} ({} nodes, nothing to expand)", input.display(), count_nodes(&tree));
    } else {
        eprintln!(
            "OK: {} ({} nodes -> {} nodes)",
            input.display(),
            count_nodes(&tree),
            count_nodes(&rewritten.tree)
        );
    }
}
