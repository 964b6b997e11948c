use std::path::PathBuf;

use clap::Args;
use treexpand::fingerprint;

use super::{exit_with, init_logging, load_config, load_tree};

#[derive(Args)]
pub struct HashArgs {
    /// Input tree file
    pub input: PathBuf,
    /// Show full 256-bit hashes instead of short form
    #[arg(long)]
    pub full: bool,
}

pub fn cmd_hash(args: HashArgs) {
    let HashArgs { input, full } = args;
    let config = load_config(&input, None);
    init_logging(&config);

    let (_, tree) = load_tree(&input);
    let expanded = match treexpand::rewrite_with(&tree, &config.rewrite) {
        Ok(r) => r.tree,
        Err(e) => exit_with(&e, &input),
    };

    let source_hash = fingerprint(&tree);
    let expanded_hash = fingerprint(&expanded);
    if full {
        println!("  {} source", source_hash.to_hex());
        println!("  {} expanded", expanded_hash.to_hex());
    } else {
        println!("  {} source", source_hash);
        println!("  {} expanded", expanded_hash);
    }
    eprintln!("File: {}", input.display());
}
