use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
/// Which backend of the platform location service to request updates from. Only one is
/// ever requested per session.
pub enum ProviderKind {
    /// Satellite based fixes (GPS and friends)
    #[default]
    Satellite,
    /// Fixes from cell towers and Wi-Fi
    Network,
    /// Only receive fixes other consumers already requested
    Passive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// Options passed to the provider when subscribing to updates
pub struct ProviderSettings {
    /// Backend to request fixes from
    pub provider_kind: ProviderKind,
    /// Minimum time between two updates, in milliseconds
    pub min_interval_ms: u64,
    /// Minimum distance the device has to move for a new update, in meters
    pub min_distance_m: f32,
}

impl ProviderSettings {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            provider_kind: ProviderKind::Satellite,
            min_interval_ms: 2000,
            min_distance_m: 5.0,
        }
    }
}
