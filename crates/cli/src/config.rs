//! Configuration file support for deduplication runs

use anyhow::{Context, Result};
use rowdedup_core::PipelineConfig;
use std::path::Path;

/// Load a deduplication config from a YAML or TOML file, chosen by extension.
///
/// ```yaml
/// mode: all but one
/// wildcard: _any_
/// predicates:
///   - { column: "&!status", pattern: closed }
///   - { column: id, pattern: _any_ }
/// ```
pub fn load_dedup_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

    match extension {
        "yaml" | "yml" => serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
        "toml" => toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
        _ => Err(anyhow::anyhow!(
            "Unsupported config file format: {}. Use .yaml, .yml, or .toml",
            extension
        )),
    }
}
