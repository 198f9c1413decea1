use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Deserialize;

use crate::context::{IStr, deserialize_istr, empty_istr, resolve};

pub type EventId = u64;
/// Milliseconds since the epoch
pub type Timestamp = u64;
pub type AbilityId = u32;
pub type UnitId = u64;

/// Ability id reported for melee swings
pub const MELEE_ABILITY: AbilityId = 0;

// ─────────────────────────────────────────────────────────────────────────────
// Unit
// ─────────────────────────────────────────────────────────────────────────────

/// A combat participant. Two units are the same entity iff their ids match.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Unit {
    pub unit_id: UnitId,
    #[serde(default)]
    pub is_player: bool,
    #[serde(default = "empty_istr", deserialize_with = "deserialize_istr")]
    pub name: IStr,
}

impl Unit {
    pub fn new(unit_id: UnitId, is_player: bool) -> Self {
        Self {
            unit_id,
            is_player,
            name: empty_istr(),
        }
    }

    pub fn player(unit_id: UnitId) -> Self {
        Self::new(unit_id, true)
    }

    pub fn creature(unit_id: UnitId) -> Self {
        Self::new(unit_id, false)
    }

    pub fn display_name(&self) -> &'static str {
        resolve(self.name)
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.unit_id == other.unit_id
    }
}

impl Eq for Unit {}

impl Hash for Unit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.unit_id.hash(state);
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.display_name();
        if name.is_empty() {
            write!(f, "#{}", self.unit_id)
        } else {
            write!(f, "{} #{}", name, self.unit_id)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event Kind
// ─────────────────────────────────────────────────────────────────────────────

/// The 16 event categories. Discriminants are the stable wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    SpellCast = 0,
    Death = 1,
    CombatState = 2,
    Loot = 3,
    Position = 4,
    Power = 5,
    AuraApplication = 6,
    Interrupt = 7,
    SpellSteal = 8,
    Dispel = 9,
    ThreatWipe = 10,
    Summon = 11,
    MeleeDamage = 12,
    SpellDamage = 13,
    Heal = 14,
    Threat = 15,
}

impl EventKind {
    pub const ALL: [EventKind; 16] = [
        EventKind::SpellCast,
        EventKind::Death,
        EventKind::CombatState,
        EventKind::Loot,
        EventKind::Position,
        EventKind::Power,
        EventKind::AuraApplication,
        EventKind::Interrupt,
        EventKind::SpellSteal,
        EventKind::Dispel,
        EventKind::ThreatWipe,
        EventKind::Summon,
        EventKind::MeleeDamage,
        EventKind::SpellDamage,
        EventKind::Heal,
        EventKind::Threat,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Kinds referenced by cause ids are kept in an id-indexed map
    pub fn is_indexed(self) -> bool {
        matches!(
            self,
            EventKind::SpellCast | EventKind::AuraApplication | EventKind::MeleeDamage
        )
    }

    pub fn correlates_target(self) -> bool {
        matches!(
            self,
            EventKind::SpellCast
                | EventKind::AuraApplication
                | EventKind::Interrupt
                | EventKind::SpellSteal
                | EventKind::Dispel
                | EventKind::Summon
                | EventKind::MeleeDamage
                | EventKind::SpellDamage
                | EventKind::Heal
                | EventKind::Threat
        )
    }

    pub fn correlates_abilities(self) -> bool {
        self.correlates_target() && self != EventKind::Summon
    }

    /// Kinds whose stores this kind's correlation reads through cause ids
    pub fn causes(self) -> &'static [EventKind] {
        match self {
            EventKind::Interrupt
            | EventKind::SpellSteal
            | EventKind::Dispel
            | EventKind::SpellDamage
            | EventKind::Heal => &[EventKind::SpellCast, EventKind::AuraApplication],
            EventKind::Threat => &[EventKind::SpellCast, EventKind::MeleeDamage],
            _ => &[],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::SpellCast => "SpellCast",
            EventKind::Death => "Death",
            EventKind::CombatState => "CombatState",
            EventKind::Loot => "Loot",
            EventKind::Position => "Position",
            EventKind::Power => "Power",
            EventKind::AuraApplication => "AuraApplication",
            EventKind::Interrupt => "Interrupt",
            EventKind::SpellSteal => "SpellSteal",
            EventKind::Dispel => "Dispel",
            EventKind::ThreatWipe => "ThreatWipe",
            EventKind::Summon => "Summon",
            EventKind::MeleeDamage => "MeleeDamage",
            EventKind::SpellDamage => "SpellDamage",
            EventKind::Heal => "Heal",
            EventKind::Threat => "Threat",
        }
    }

    /// Case-insensitive lookup by name or numeric code
    pub fn parse(input: &str) -> Option<Self> {
        if let Ok(code) = input.parse::<u8>() {
            return Self::from_code(code);
        }
        let wanted = input.replace(['_', '-'], "");
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(&wanted))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Payloads
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SpellCast {
    #[serde(default)]
    pub victim: Option<Unit>,
    #[serde(default)]
    pub hit_mask: u32,
    pub spell_id: AbilityId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Death {
    #[serde(default)]
    pub murder: Option<Unit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CombatState {
    pub in_combat: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Loot {
    pub item_id: u32,
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    #[serde(default)]
    pub orientation: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Power {
    pub power_type: u8,
    pub max_power: u32,
    pub current_power: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuraApplication {
    /// Originating caster of the aura
    pub caster: Unit,
    #[serde(default)]
    pub stack_amount: u32,
    pub spell_id: AbilityId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Interrupt {
    pub cause_event_id: EventId,
    pub interrupted_spell_id: AbilityId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpellSteal {
    pub cause_event_id: EventId,
    /// Aura application that was stolen
    pub target_event_id: EventId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dispel {
    pub cause_event_id: EventId,
    /// One aura application per dispelled aura
    #[serde(default)]
    pub target_event_ids: Vec<EventId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreatWipe {
    pub cause_event_id: EventId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Summon {
    pub cause_event_id: EventId,
    pub summoned: Unit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeleeDamage {
    pub victim: Unit,
    #[serde(default)]
    pub hit_mask: u32,
    #[serde(default)]
    pub amount: u64,
    #[serde(default)]
    pub absorbed: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Damage {
    pub victim: Unit,
    #[serde(default)]
    pub hit_mask: u32,
    #[serde(default)]
    pub amount: u64,
    #[serde(default)]
    pub absorbed: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpellDamage {
    pub spell_cause_id: EventId,
    pub damage: Damage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealDone {
    pub target: Unit,
    #[serde(default)]
    pub amount: u64,
    #[serde(default)]
    pub effective: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Heal {
    pub spell_cause_id: EventId,
    pub heal: HealDone,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreatDone {
    pub threatened: Unit,
    #[serde(default)]
    pub amount: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Threat {
    pub cause_event_id: EventId,
    pub threat: ThreatDone,
}

/// Kind-specific event body, externally tagged on the wire (`{"SpellCast": {..}}`).
#[derive(Debug, Clone, Deserialize)]
pub enum Payload {
    SpellCast(SpellCast),
    Death(Death),
    CombatState(CombatState),
    Loot(Loot),
    Position(Position),
    Power(Power),
    AuraApplication(AuraApplication),
    Interrupt(Interrupt),
    SpellSteal(SpellSteal),
    Dispel(Dispel),
    ThreatWipe(ThreatWipe),
    Summon(Summon),
    MeleeDamage(MeleeDamage),
    SpellDamage(SpellDamage),
    Heal(Heal),
    Threat(Threat),
}

impl Payload {
    pub fn kind(&self) -> EventKind {
        match self {
            Payload::SpellCast(_) => EventKind::SpellCast,
            Payload::Death(_) => EventKind::Death,
            Payload::CombatState(_) => EventKind::CombatState,
            Payload::Loot(_) => EventKind::Loot,
            Payload::Position(_) => EventKind::Position,
            Payload::Power(_) => EventKind::Power,
            Payload::AuraApplication(_) => EventKind::AuraApplication,
            Payload::Interrupt(_) => EventKind::Interrupt,
            Payload::SpellSteal(_) => EventKind::SpellSteal,
            Payload::Dispel(_) => EventKind::Dispel,
            Payload::ThreatWipe(_) => EventKind::ThreatWipe,
            Payload::Summon(_) => EventKind::Summon,
            Payload::MeleeDamage(_) => EventKind::MeleeDamage,
            Payload::SpellDamage(_) => EventKind::SpellDamage,
            Payload::Heal(_) => EventKind::Heal,
            Payload::Threat(_) => EventKind::Threat,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Unique within its kind
    pub id: EventId,
    pub timestamp: Timestamp,
    pub subject: Unit,
    #[serde(rename = "event")]
    pub payload: Payload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, subject: Unit, payload: Payload) -> Self {
        Self {
            id,
            timestamp,
            subject,
            payload,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn as_spell_cast(&self) -> Option<&SpellCast> {
        match &self.payload {
            Payload::SpellCast(cast) => Some(cast),
            _ => None,
        }
    }

    pub fn as_aura_application(&self) -> Option<&AuraApplication> {
        match &self.payload {
            Payload::AuraApplication(aura) => Some(aura),
            _ => None,
        }
    }

    pub fn as_melee_damage(&self) -> Option<&MeleeDamage> {
        match &self.payload {
            Payload::MeleeDamage(melee) => Some(melee),
            _ => None,
        }
    }
}
