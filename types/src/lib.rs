//! Shared configuration types for raidscope
//!
//! This crate contains serializable types that are shared between the engine
//! (raidscope-core) and its front ends (the CLI today).

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Query Result Types (shared between backend and frontend)
// ─────────────────────────────────────────────────────────────────────────────

/// Which filtered views an ability breakdown aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BreakdownSource {
    /// Spell damage and melee damage
    #[default]
    Damage,
    /// Heals
    Heal,
}

impl BreakdownSource {
    /// Display label for the amount column
    pub fn amount_label(&self) -> &'static str {
        match self {
            BreakdownSource::Damage => "Damage",
            BreakdownSource::Heal => "Healing",
        }
    }
}

/// Which heal amount fills the amount column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HealMode {
    #[default]
    Total,
    Effective,
    Overheal,
}

impl HealMode {
    /// Pick the amount for one heal of `total` of which `effective` landed
    pub fn select(&self, total: u64, effective: u64) -> u64 {
        match self {
            HealMode::Total => total,
            HealMode::Effective => effective,
            HealMode::Overheal => total.saturating_sub(effective),
        }
    }
}

impl std::str::FromStr for HealMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "total" => Ok(HealMode::Total),
            "effective" => Ok(HealMode::Effective),
            "overheal" => Ok(HealMode::Overheal),
            other => Err(format!("unknown heal mode '{other}' (total, effective, overheal)")),
        }
    }
}

/// Parameters of an ability breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BreakdownQuery {
    pub source: BreakdownSource,
    /// Swap the source and target selections: damage or healing taken by the
    /// selected sources instead of done by them
    pub inverse: bool,
    /// Only read for heal breakdowns
    pub heal_mode: HealMode,
}

/// Totals of one ability's hits sharing a hit mask.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitBreakdown {
    /// Raw hit mask from the log (0 for heals, which carry none)
    pub hit_mask: u32,
    pub hits: u64,
    pub amount: u64,
    pub effective: u64,
}

/// One row of an ability breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbilityBreakdown {
    /// Resolved ability id (0 = melee swing)
    pub ability_id: u32,
    pub hits: u64,
    pub amount: u64,
    /// Effective amount (overheal or absorb subtracted)
    pub effective: u64,
    /// Per hit mask, largest amount first
    pub by_hit: Vec<HitBreakdown>,
}

impl AbilityBreakdown {
    /// Average amount per hit, 0 when nothing landed
    pub fn average(&self) -> f64 {
        average(self.amount, self.hits)
    }
}

impl HitBreakdown {
    pub fn average(&self) -> f64 {
        average(self.amount, self.hits)
    }
}

fn average(amount: u64, hits: u64) -> f64 {
    if hits == 0 {
        0.0
    } else {
        amount as f64 / hits as f64
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Viewer Config
// ─────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_export_base_url() -> String {
    "http://localhost:8000/API".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Base URL of the instance export API (no trailing slash)
    #[serde(default = "default_export_base_url")]
    pub export_base_url: String,
    /// Seconds between live sync ticks
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Instance opened on startup, if any
    #[serde(default)]
    pub instance_id: Option<u64>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            export_base_url: default_export_base_url(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            instance_id: None,
        }
    }
}

impl ViewerConfig {
    /// Poll interval, never below one second
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
