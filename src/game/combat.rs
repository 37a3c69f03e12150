//! Kill attribution and death messages

use crate::host::PlayerId;

/// A death this soon after an attack credits the attacker's team
pub const KILL_CREDIT_WINDOW_MS: u64 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attack {
    pub attacker: PlayerId,
    pub defender: PlayerId,
    pub at_ms: u64,
}

/// Most recent attack per defender
#[derive(Debug, Clone, Default)]
pub struct AttackLog {
    pending: Vec<Attack>,
}

impl AttackLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attack, superseding any pending one on the same defender
    pub fn record(&mut self, attacker: PlayerId, defender: PlayerId, at_ms: u64) {
        self.pending.retain(|a| a.defender != defender);
        self.pending.push(Attack {
            attacker,
            defender,
            at_ms,
        });
    }

    pub fn pending_on(&self, defender: PlayerId) -> Option<&Attack> {
        self.pending.iter().find(|a| a.defender == defender)
    }

    /// Consume the pending attack on `defender`; returns the attacker if still within the window
    pub fn take_credit(&mut self, defender: PlayerId, now_ms: u64) -> Option<PlayerId> {
        let index = self.pending.iter().position(|a| a.defender == defender)?;
        let attack = self.pending.remove(index);
        (now_ms.saturating_sub(attack.at_ms) < KILL_CREDIT_WINDOW_MS).then_some(attack.attacker)
    }

    /// Drop every attack involving `player`
    pub fn forget(&mut self, player: PlayerId) {
        self.pending
            .retain(|a| a.attacker != player && a.defender != player);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// What killed a player, as reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DamageCause {
    Combat { attacker: String, weapon: String },
    Explosion,
    Combustion,
    Drowning,
    Falling,
    Suicide,
    Creature,
    Other,
}

impl DamageCause {
    pub fn death_message(&self, victim: &str) -> String {
        match self {
            DamageCause::Combat { attacker, weapon } => {
                format!("{attacker} killed {victim} using {weapon}.")
            }
            DamageCause::Explosion => format!("{victim} exploded."),
            DamageCause::Combustion => format!("{victim} burned to a crisp."),
            DamageCause::Drowning => format!("{victim} drowned."),
            DamageCause::Falling => format!("{victim} fell to their death."),
            DamageCause::Suicide => format!("{victim} committed seppuku."),
            DamageCause::Creature | DamageCause::Other => format!("{victim} died."),
        }
    }
}
