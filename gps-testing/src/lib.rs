mod simulator;

use std::path::Path;

use gps_logic::ProviderSettings;

pub use simulator::{SimulatedPlatform, SimulatedProvider, SimulationOptions, distance_m};

pub mod prelude {
    pub use anyhow::{Context, anyhow, bail};
    pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
}

pub use prelude::*;

/// Read provider settings from a JSON file, missing fields (or a missing path) fall back
/// to the defaults
pub fn load_settings(path: Option<&Path>) -> Result<ProviderSettings> {
    let Some(path) = path else {
        return Ok(ProviderSettings::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    serde_json::from_str(&raw).context("Failed to parse settings")
}
