//! Match simulation: teams, kill attribution and the round lifecycle

pub mod combat;
pub mod r#match;
pub mod team;

pub use combat::{AttackLog, DamageCause, KILL_CREDIT_WINDOW_MS};
pub use r#match::{MatchCtx, MatchEngine, RESPAWN_DELAY};
pub use team::{Team, TeamColor};
