//! Analytic queries over published views

mod breakdown;

pub use breakdown::{ability_breakdown, breakdown_kinds};

// Re-export query types from shared types crate
pub use raidscope_types::{
    AbilityBreakdown, BreakdownQuery, BreakdownSource, HealMode, HitBreakdown,
};
