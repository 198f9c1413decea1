//! Change notifications for consumers of a session.
//!
//! Every publish carries the logical subject that changed. Consumers hold a
//! [`Subscription`]; dropping it releases the receiver, and closing the bus
//! on session disposal ends every live subscription.

use std::fmt;

use tokio::sync::broadcast;

use crate::combat_log::EventKind;

const BUS_CAPACITY: usize = 256;

// ─────────────────────────────────────────────────────────────────────────────
// Subjects
// ─────────────────────────────────────────────────────────────────────────────

/// What changed: one of the 16 event kinds or an instance-level subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangedSubject {
    SpellCast,
    Death,
    CombatState,
    Loot,
    Position,
    Power,
    AuraApplication,
    Interrupt,
    SpellSteal,
    Dispel,
    ThreatWipe,
    Summon,
    MeleeDamage,
    SpellDamage,
    Heal,
    Threat,
    InstanceMeta,
    Participants,
    Attempts,
    Sources,
    Targets,
    Abilities,
    AttemptTotalDuration,
}

impl ChangedSubject {
    /// The event kind behind this subject, if it is one
    pub fn kind(self) -> Option<EventKind> {
        let kind = match self {
            ChangedSubject::SpellCast => EventKind::SpellCast,
            ChangedSubject::Death => EventKind::Death,
            ChangedSubject::CombatState => EventKind::CombatState,
            ChangedSubject::Loot => EventKind::Loot,
            ChangedSubject::Position => EventKind::Position,
            ChangedSubject::Power => EventKind::Power,
            ChangedSubject::AuraApplication => EventKind::AuraApplication,
            ChangedSubject::Interrupt => EventKind::Interrupt,
            ChangedSubject::SpellSteal => EventKind::SpellSteal,
            ChangedSubject::Dispel => EventKind::Dispel,
            ChangedSubject::ThreatWipe => EventKind::ThreatWipe,
            ChangedSubject::Summon => EventKind::Summon,
            ChangedSubject::MeleeDamage => EventKind::MeleeDamage,
            ChangedSubject::SpellDamage => EventKind::SpellDamage,
            ChangedSubject::Heal => EventKind::Heal,
            ChangedSubject::Threat => EventKind::Threat,
            ChangedSubject::InstanceMeta
            | ChangedSubject::Participants
            | ChangedSubject::Attempts
            | ChangedSubject::Sources
            | ChangedSubject::Targets
            | ChangedSubject::Abilities
            | ChangedSubject::AttemptTotalDuration => return None,
        };
        Some(kind)
    }
}

impl From<EventKind> for ChangedSubject {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::SpellCast => ChangedSubject::SpellCast,
            EventKind::Death => ChangedSubject::Death,
            EventKind::CombatState => ChangedSubject::CombatState,
            EventKind::Loot => ChangedSubject::Loot,
            EventKind::Position => ChangedSubject::Position,
            EventKind::Power => ChangedSubject::Power,
            EventKind::AuraApplication => ChangedSubject::AuraApplication,
            EventKind::Interrupt => ChangedSubject::Interrupt,
            EventKind::SpellSteal => ChangedSubject::SpellSteal,
            EventKind::Dispel => ChangedSubject::Dispel,
            EventKind::ThreatWipe => ChangedSubject::ThreatWipe,
            EventKind::Summon => ChangedSubject::Summon,
            EventKind::MeleeDamage => ChangedSubject::MeleeDamage,
            EventKind::SpellDamage => ChangedSubject::SpellDamage,
            EventKind::Heal => ChangedSubject::Heal,
            EventKind::Threat => ChangedSubject::Threat,
        }
    }
}

impl fmt::Display for ChangedSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bus
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ChangeBus {
    sender: Option<broadcast::Sender<ChangedSubject>>,
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self {
            sender: Some(sender),
        }
    }

    /// Subscribe to every future publish. On a closed bus the subscription is
    /// already finished.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.as_ref().map(broadcast::Sender::subscribe),
        }
    }

    pub fn publish(&self, subject: ChangedSubject) {
        if let Some(sender) = &self.sender {
            // No receivers is fine
            let _ = sender.send(subject);
        }
    }

    /// Live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.sender
            .as_ref()
            .map(broadcast::Sender::receiver_count)
            .unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_none()
    }

    /// End every subscription. Already-sent subjects are still delivered first.
    pub fn close(&mut self) {
        if self.sender.take().is_some() {
            tracing::debug!("Change bus closed");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscriptions
// ─────────────────────────────────────────────────────────────────────────────

/// Handle on the change stream. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    receiver: Option<broadcast::Receiver<ChangedSubject>>,
}

impl Subscription {
    /// Next subject, `None` once the bus is closed
    pub async fn recv(&mut self) -> Option<ChangedSubject> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(subject) => return Some(subject),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Subscription lagged behind change bus");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Next subject without waiting
    pub fn try_next(&mut self) -> Option<ChangedSubject> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.try_recv() {
                Ok(subject) => return Some(subject),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Subscription lagged behind change bus");
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Everything published since the last read
    pub fn drain(&mut self) -> Vec<ChangedSubject> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// True once the bus closed and every pending subject was read
    pub fn is_closed(&self) -> bool {
        self.receiver.is_none()
    }
}

/// Subscription narrowed to one kind's subject.
#[derive(Debug)]
pub struct KindWatch {
    kind: EventKind,
    subscription: Subscription,
}

impl KindWatch {
    pub fn new(kind: EventKind, subscription: Subscription) -> Self {
        Self { kind, subscription }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Wait for the kind's next publish. False once the bus is closed.
    pub async fn changed(&mut self) -> bool {
        let wanted = ChangedSubject::from(self.kind);
        while let Some(subject) = self.subscription.recv().await {
            if subject == wanted {
                return true;
            }
        }
        false
    }

    /// Whether the kind was published since the last check, without waiting
    pub fn has_changed(&mut self) -> bool {
        let wanted = ChangedSubject::from(self.kind);
        self.subscription
            .drain()
            .into_iter()
            .any(|subject| subject == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_maps_to_its_subject() {
        for kind in EventKind::ALL {
            assert_eq!(ChangedSubject::from(kind).kind(), Some(kind));
        }
        assert_eq!(ChangedSubject::Sources.kind(), None);
    }

    #[test]
    fn subscribers_receive_in_publish_order() {
        let bus = ChangeBus::new();
        let mut sub = bus.subscribe();
        bus.publish(ChangedSubject::SpellCast);
        bus.publish(ChangedSubject::Sources);
        assert_eq!(
            sub.drain(),
            vec![ChangedSubject::SpellCast, ChangedSubject::Sources]
        );
        assert_eq!(sub.try_next(), None);
    }

    #[test]
    fn dropping_a_subscription_releases_it() {
        let bus = ChangeBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
        drop(first);
        assert_eq!(bus.subscriber_count(), 1);
        drop(second);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn close_ends_subscriptions_after_pending_subjects() {
        let mut bus = ChangeBus::new();
        let mut sub = bus.subscribe();
        bus.publish(ChangedSubject::Attempts);
        bus.close();

        assert_eq!(sub.recv().await, Some(ChangedSubject::Attempts));
        assert_eq!(sub.recv().await, None);
        assert!(sub.is_closed());
        assert!(bus.subscribe().is_closed());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn kind_watch_ignores_other_subjects() {
        let mut bus = ChangeBus::new();
        let mut watch = KindWatch::new(EventKind::Heal, bus.subscribe());
        bus.publish(ChangedSubject::SpellCast);
        bus.publish(ChangedSubject::Heal);
        assert!(watch.changed().await);

        bus.publish(ChangedSubject::Targets);
        bus.close();
        assert!(!watch.changed().await);
    }
}
