//! Warzone - team PvP arenas for a block-world game server
//!
//! The crate is host-agnostic: the world and the connected players are reached
//! through [`host::WorldAdapter`] and [`host::PlayerSession`]. Each zone keeps
//! its reference points, block snapshot, loadouts and settings in its own data
//! file ([`store::ZoneStore`]); a running match ([`game::MatchEngine`]) tracks
//! teams, scores and rounds; [`war::War`] owns everything and is driven from a
//! single authority loop, with [`gateway`] classifying host events.

pub mod app;
pub mod command;
pub mod config;
pub mod error;
pub mod game;
pub mod gateway;
pub mod geom;
pub mod host;
pub mod http;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod util;
pub mod war;
pub mod zone;

#[cfg(test)]
pub(crate) mod testing;

pub use error::WarError;
pub use war::War;
