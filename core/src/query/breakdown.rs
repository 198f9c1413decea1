//! Per-ability breakdown over the filtered damage and heal views.

use std::sync::Arc;

use hashbrown::HashMap;

use crate::combat_log::{AbilityId, EventKind, Payload};
use crate::filter::{FilteredView, ViewRow};
use crate::session::InstanceSession;

use super::{AbilityBreakdown, BreakdownQuery, BreakdownSource, HealMode, HitBreakdown};

/// Kinds whose published views feed a breakdown
pub fn breakdown_kinds(source: BreakdownSource) -> &'static [EventKind] {
    match source {
        BreakdownSource::Damage => &[EventKind::SpellDamage, EventKind::MeleeDamage],
        BreakdownSource::Heal => &[EventKind::Heal],
    }
}

/// Amount, effective amount and hit mask of a row, `None` for rows that carry
/// no amount. Heals have no hit mask and report 0.
fn hit(row: &ViewRow, heal_mode: HealMode) -> Option<(u64, u64, u32)> {
    match &row.event.payload {
        Payload::SpellDamage(spell) => {
            let damage = &spell.damage;
            Some((
                damage.amount,
                damage.amount.saturating_sub(damage.absorbed),
                damage.hit_mask,
            ))
        }
        Payload::MeleeDamage(melee) => Some((
            melee.amount,
            melee.amount.saturating_sub(melee.absorbed),
            melee.hit_mask,
        )),
        Payload::Heal(heal) => Some((
            heal_mode.select(heal.heal.amount, heal.heal.effective),
            heal.heal.effective,
            0,
        )),
        _ => None,
    }
}

fn views(session: &InstanceSession, query: &BreakdownQuery) -> Vec<Arc<FilteredView>> {
    breakdown_kinds(query.source)
        .iter()
        .filter_map(|&kind| {
            if query.inverse {
                session.inverse_view(kind).map(Arc::new)
            } else {
                session.published(kind)
            }
        })
        .collect()
}

#[derive(Default)]
struct Totals {
    hits: u64,
    amount: u64,
    effective: u64,
}

impl Totals {
    fn add(&mut self, amount: u64, effective: u64) {
        self.hits += 1;
        self.amount += amount;
        self.effective += effective;
    }
}

/// Aggregate the filtered damage or heal views into one row per resolved
/// ability, each split by hit mask, largest amount first. Rows whose ability
/// did not resolve are left out.
pub fn ability_breakdown(session: &InstanceSession, query: &BreakdownQuery) -> Vec<AbilityBreakdown> {
    let mut by_ability: HashMap<AbilityId, (Totals, HashMap<u32, Totals>)> = HashMap::new();

    for view in views(session, query) {
        for row in &view.rows {
            let Some(Some(ability_id)) = row.attribution.abilities.first().copied() else {
                continue;
            };
            let Some((amount, effective, hit_mask)) = hit(row, query.heal_mode) else {
                continue;
            };
            let (totals, by_hit) = by_ability.entry(ability_id).or_default();
            totals.add(amount, effective);
            by_hit.entry(hit_mask).or_default().add(amount, effective);
        }
    }

    let mut rows: Vec<AbilityBreakdown> = by_ability
        .into_iter()
        .map(|(ability_id, (totals, by_hit))| {
            let mut by_hit: Vec<HitBreakdown> = by_hit
                .into_iter()
                .map(|(hit_mask, hit)| HitBreakdown {
                    hit_mask,
                    hits: hit.hits,
                    amount: hit.amount,
                    effective: hit.effective,
                })
                .collect();
            by_hit.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.hit_mask.cmp(&b.hit_mask)));
            AbilityBreakdown {
                ability_id,
                hits: totals.hits,
                amount: totals.amount,
                effective: totals.effective,
                by_hit,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.ability_id.cmp(&b.ability_id)));
    rows
}
