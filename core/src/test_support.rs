//! Event builders shared by the unit tests.

use crate::combat_log::*;

pub fn player(id: UnitId) -> Unit {
    Unit::player(id)
}

pub fn creature(id: UnitId) -> Unit {
    Unit::creature(id)
}

pub fn spell_cast(id: EventId, ts: Timestamp, caster: Unit, victim: Option<Unit>, spell_id: AbilityId) -> Event {
    Event::new(
        id,
        ts,
        caster,
        Payload::SpellCast(SpellCast {
            victim,
            hit_mask: 0,
            spell_id,
        }),
    )
}

pub fn aura_application(id: EventId, ts: Timestamp, subject: Unit, caster: Unit, spell_id: AbilityId) -> Event {
    Event::new(
        id,
        ts,
        subject,
        Payload::AuraApplication(AuraApplication {
            caster,
            stack_amount: 1,
            spell_id,
        }),
    )
}

pub fn melee_damage(id: EventId, ts: Timestamp, attacker: Unit, victim: Unit, amount: u64) -> Event {
    Event::new(
        id,
        ts,
        attacker,
        Payload::MeleeDamage(MeleeDamage {
            victim,
            hit_mask: 0,
            amount,
            absorbed: 0,
        }),
    )
}

pub fn spell_damage(id: EventId, ts: Timestamp, subject: Unit, cause: EventId, victim: Unit, amount: u64) -> Event {
    Event::new(
        id,
        ts,
        subject,
        Payload::SpellDamage(SpellDamage {
            spell_cause_id: cause,
            damage: Damage {
                victim,
                hit_mask: 0,
                amount,
                absorbed: 0,
            },
        }),
    )
}

pub fn heal(id: EventId, ts: Timestamp, subject: Unit, cause: EventId, target: Unit, amount: u64, effective: u64) -> Event {
    Event::new(
        id,
        ts,
        subject,
        Payload::Heal(Heal {
            spell_cause_id: cause,
            heal: HealDone {
                target,
                amount,
                effective,
            },
        }),
    )
}

pub fn threat(id: EventId, ts: Timestamp, subject: Unit, cause: EventId, threatened: Unit) -> Event {
    Event::new(
        id,
        ts,
        subject,
        Payload::Threat(Threat {
            cause_event_id: cause,
            threat: ThreatDone {
                threatened,
                amount: 100,
            },
        }),
    )
}

pub fn interrupt(id: EventId, ts: Timestamp, subject: Unit, cause: EventId, interrupted: AbilityId) -> Event {
    Event::new(
        id,
        ts,
        subject,
        Payload::Interrupt(Interrupt {
            cause_event_id: cause,
            interrupted_spell_id: interrupted,
        }),
    )
}

pub fn spell_steal(id: EventId, ts: Timestamp, subject: Unit, cause: EventId, stolen_aura: EventId) -> Event {
    Event::new(
        id,
        ts,
        subject,
        Payload::SpellSteal(SpellSteal {
            cause_event_id: cause,
            target_event_id: stolen_aura,
        }),
    )
}

pub fn dispel(id: EventId, ts: Timestamp, subject: Unit, cause: EventId, auras: Vec<EventId>) -> Event {
    Event::new(
        id,
        ts,
        subject,
        Payload::Dispel(Dispel {
            cause_event_id: cause,
            target_event_ids: auras,
        }),
    )
}

pub fn summon(id: EventId, ts: Timestamp, subject: Unit, summoned: Unit) -> Event {
    Event::new(
        id,
        ts,
        subject,
        Payload::Summon(Summon {
            cause_event_id: 0,
            summoned,
        }),
    )
}

pub fn death(id: EventId, ts: Timestamp, subject: Unit) -> Event {
    Event::new(id, ts, subject, Payload::Death(Death { murder: None }))
}

pub fn loot(id: EventId, ts: Timestamp, subject: Unit, item_id: u32) -> Event {
    Event::new(id, ts, subject, Payload::Loot(Loot { item_id, count: 1 }))
}
