use crate::combat_log::{AbilityId, Event, EventId, MELEE_ABILITY, Payload, Unit};
use crate::store::EventStore;

/// Resolved attribution of one event.
///
/// `target` is `None` when the kind has no target or the cause did not
/// resolve. An ability entry is `None` when its cause did not resolve; such an
/// entry never matches an ability filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    pub source: Unit,
    pub target: Option<Unit>,
    pub abilities: Vec<Option<AbilityId>>,
}

/// Per-kind correlation rules over the current store contents.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    store: &'a EventStore,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a EventStore) -> Self {
        Self { store }
    }

    pub fn resolve(&self, event: &Event) -> Attribution {
        Attribution {
            source: self.source(event),
            target: self.target(event),
            abilities: self.abilities(event),
        }
    }

    /// Effective source; the event subject unless an aura application caused it
    pub fn source(&self, event: &Event) -> Unit {
        match &event.payload {
            Payload::SpellDamage(damage) => self.aura_caster_or(damage.spell_cause_id, event.subject),
            Payload::Heal(heal) => self.aura_caster_or(heal.spell_cause_id, event.subject),
            _ => event.subject,
        }
    }

    pub fn target(&self, event: &Event) -> Option<Unit> {
        match &event.payload {
            Payload::SpellCast(cast) => cast.victim,
            // The aura's originating caster, kept as the target for parity with
            // the export consumers
            Payload::AuraApplication(aura) => Some(aura.caster),
            Payload::Summon(summon) => Some(summon.summoned),
            Payload::MeleeDamage(melee) => Some(melee.victim),
            Payload::SpellDamage(damage) => Some(damage.damage.victim),
            Payload::Heal(heal) => Some(heal.heal.target),
            Payload::Threat(threat) => Some(threat.threat.threatened),
            Payload::Interrupt(interrupt) => self.cast_or_aura_target(interrupt.cause_event_id),
            Payload::SpellSteal(steal) => self.cast_victim(steal.cause_event_id),
            Payload::Dispel(dispel) => self.cast_victim(dispel.cause_event_id),
            Payload::Death(_)
            | Payload::CombatState(_)
            | Payload::Loot(_)
            | Payload::Position(_)
            | Payload::Power(_)
            | Payload::ThreatWipe(_) => None,
        }
    }

    pub fn abilities(&self, event: &Event) -> Vec<Option<AbilityId>> {
        match &event.payload {
            Payload::SpellCast(cast) => vec![Some(cast.spell_id)],
            Payload::AuraApplication(aura) => vec![Some(aura.spell_id)],
            Payload::MeleeDamage(_) => vec![Some(MELEE_ABILITY)],
            Payload::SpellDamage(damage) => vec![self.cast_or_aura_spell(damage.spell_cause_id)],
            Payload::Heal(heal) => vec![self.cast_or_aura_spell(heal.spell_cause_id)],
            Payload::Threat(threat) => {
                if let Some(cast) = self.store.spell_cast(threat.cause_event_id) {
                    vec![Some(cast.spell_id)]
                } else if self.store.melee_damage(threat.cause_event_id).is_some() {
                    vec![Some(MELEE_ABILITY)]
                } else {
                    Vec::new()
                }
            }
            Payload::Interrupt(interrupt) => vec![
                self.cast_or_aura_spell(interrupt.cause_event_id),
                Some(interrupt.interrupted_spell_id),
            ],
            Payload::SpellSteal(steal) => vec![
                self.aura_spell(steal.target_event_id),
                self.cast_spell(steal.cause_event_id),
            ],
            Payload::Dispel(dispel) => {
                let mut abilities = Vec::with_capacity(dispel.target_event_ids.len() + 1);
                abilities.push(self.cast_spell(dispel.cause_event_id));
                abilities.extend(dispel.target_event_ids.iter().map(|id| self.aura_spell(*id)));
                abilities
            }
            Payload::Summon(_)
            | Payload::Death(_)
            | Payload::CombatState(_)
            | Payload::Loot(_)
            | Payload::Position(_)
            | Payload::Power(_)
            | Payload::ThreatWipe(_) => Vec::new(),
        }
    }

    // ─── Cause lookups ─────────────────────────────────────────────────────────

    fn aura_caster_or(&self, cause: EventId, fallback: Unit) -> Unit {
        self.store
            .aura_application(cause)
            .map(|aura| aura.caster)
            .unwrap_or(fallback)
    }

    fn cast_victim(&self, cause: EventId) -> Option<Unit> {
        self.store.spell_cast(cause)?.victim
    }

    fn cast_spell(&self, cause: EventId) -> Option<AbilityId> {
        self.store.spell_cast(cause).map(|cast| cast.spell_id)
    }

    fn aura_spell(&self, cause: EventId) -> Option<AbilityId> {
        self.store.aura_application(cause).map(|aura| aura.spell_id)
    }

    /// A spell cast wins over an aura application with the same id
    fn cast_or_aura_target(&self, cause: EventId) -> Option<Unit> {
        if let Some(cast) = self.store.spell_cast(cause) {
            return cast.victim;
        }
        self.store.aura_application(cause).map(|aura| aura.caster)
    }

    fn cast_or_aura_spell(&self, cause: EventId) -> Option<AbilityId> {
        self.cast_spell(cause).or_else(|| self.aura_spell(cause))
    }
}
