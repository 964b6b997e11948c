mod cli;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "treexpand",
    version,
    about = "Expression-tree expander: inlines invocations and captured trees"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Expand a tree file and print the self-contained result
    Rewrite(cli::rewrite::RewriteArgs),
    /// Parse and expand a tree file without printing it
    Check(cli::check::CheckArgs),
    /// Print a tree file in canonical notation
    Fmt(cli::fmt::FmtArgs),
    /// Show structural fingerprints of a tree file (BLAKE3)
    Hash(cli::hash::HashArgs),
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Rewrite(args) => cli::rewrite::cmd_rewrite(args),
        Command::Check(args) => cli::check::cmd_check(args),
        Command::Fmt(args) => cli::fmt::cmd_fmt(args),
        Command::Hash(args) => cli::hash::cmd_hash(args),
    }
}
