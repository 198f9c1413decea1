//! Causal attribution of events
//!
//! Every kind maps an event to the unit that caused it, the unit that
//! received it and the abilities involved. Several kinds only carry a cause id
//! and borrow their attribution from an earlier event of another kind:
//!
//! ```text
//!   SpellCast ──────┬──► Interrupt, SpellSteal, Dispel
//!                   ├──► SpellDamage, Heal
//!                   └──► Threat
//!   AuraApplication ┬──► Interrupt, SpellSteal, Dispel
//!                   └──► SpellDamage, Heal
//!   MeleeDamage ────────► Threat
//! ```
//!
//! The graph decides which views must be re-published when a cause store
//! receives new data (see [`dependency`]).

pub mod dependency;
mod resolver;


pub use dependency::{dependency_order, dependents, republish_closure};
pub use resolver::{Attribution, Resolver};
