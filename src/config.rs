use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// Name of the options file looked up next to an input tree.
pub const CONFIG_FILE: &str = "treexpand.toml";

/// Default nesting limit for a single rewrite.
pub const DEFAULT_MAX_DEPTH: u32 = 10_000;

/// Knobs of a single rewrite.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RewriteOptions {
    /// Maximum nesting of visits (tree depth plus inlining depth).
    pub max_depth: u32,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Options loaded from treexpand.toml.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub rewrite: RewriteOptions,
    /// `tracing` filter directive from `[log] filter = "..."`.
    pub log_filter: Option<String>,
}

impl Config {
    /// Load options from a treexpand.toml file.
    ///
    /// Only the `[rewrite]` and `[log]` sections are read; unknown keys are
    /// ignored so the file can carry settings for other tools.
    pub fn load(toml_path: &Path) -> Result<Config, Diagnostic> {
        let content = std::fs::read_to_string(toml_path).map_err(|e| {
            Diagnostic::error(
                format!("cannot read '{}': {}", toml_path.display(), e),
                Span::default(),
            )
        })?;
        Self::parse(&content).map_err(|msg| {
            Diagnostic::error(msg, Span::default())
                .with_note(format!("in {}", toml_path.display()))
        })
    }

    pub fn parse(content: &str) -> Result<Config, String> {
        let mut config = Config::default();
        let mut current_section = String::new();

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with('#') || trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                current_section = trimmed[1..trimmed.len() - 1].trim().to_string();
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(format!("expected `key = value`, found '{}'", trimmed));
            };
            let key = key.trim().trim_matches('"');
            let value = value.trim();

            match (current_section.as_str(), key) {
                ("rewrite", "max_depth") => {
                    config.rewrite.max_depth = value.parse::<u32>().map_err(|_| {
                        format!("max_depth must be a positive integer, found '{}'", value)
                    })?;
                    if config.rewrite.max_depth == 0 {
                        return Err("max_depth must be at least 1".to_string());
                    }
                }
                ("log", "filter") => {
                    config.log_filter = Some(value.trim_matches('"').to_string());
                }
                _ => {}
            }
        }
        Ok(config)
    }

    /// Find treexpand.toml in `start_dir` or its ancestors.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.exists() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }
}
