//! Engine configuration loading.
//!
//! Reads `EngineConfig` from a TOML file and fills provider API keys
//! from the environment: a provider named `groq` with an empty
//! `api_key` picks up `GROQ_API_KEY`. Keys in the file win over the
//! environment so test fixtures stay self-contained.

use std::path::Path;

use anyhow::{Context, Result};

use tubesage_types::config::EngineConfig;

/// Load the engine configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let mut config: EngineConfig =
        toml::from_str(&text).with_context(|| format!("invalid config in {}", path.display()))?;
    fill_api_keys_from_env(&mut config);
    Ok(config)
}

fn fill_api_keys_from_env(config: &mut EngineConfig) {
    for provider in &mut config.fallback.providers {
        if provider.api_key.is_empty() {
            let var = format!("{}_API_KEY", provider.name.to_uppercase().replace('-', "_"));
            if let Ok(key) = std::env::var(&var) {
                tracing::debug!(provider = %provider.name, %var, "api key loaded from environment");
                provider.api_key = key;
            }
        }
    }
}
