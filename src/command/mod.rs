//! Text command shell
//!
//! Lines come from the console endpoint or from a player. Every failure is
//! turned into a chat line here; internal failures are logged in full and the
//! player only sees a generic message.

mod admin;
mod play;

use tracing::{error, info};

use crate::error::WarError;
use crate::gateway::INTERNAL_ERROR;
use crate::host::{PlayerId, PlayerSession};
use crate::war::War;

/// Prefix for error lines sent to players
pub const ERROR_COLOR: &str = "§c";

/// Who issued a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    Console,
    Player(PlayerId),
}

impl Sender {
    pub fn player(self) -> Result<PlayerId, CommandError> {
        match self {
            Sender::Player(id) => Ok(id),
            Sender::Console => Err(CommandError::NotPlayer),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    User(String),

    #[error("This command can only be used by players.")]
    NotPlayer,

    #[error("You do not have permission to do that.")]
    NoPermission,

    #[error(transparent)]
    War(#[from] WarError),
}

impl CommandError {
    /// What the sender gets to see
    pub fn user_message(&self) -> String {
        match self {
            CommandError::War(e) if e.is_internal() => {
                error!(error = ?e, "Command failed with internal error");
                INTERNAL_ERROR.to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<crate::store::StoreError> for CommandError {
    fn from(e: crate::store::StoreError) -> Self {
        CommandError::War(e.into())
    }
}

pub(crate) type CommandResult = Result<Vec<String>, CommandError>;

type Handler = fn(&mut War, Sender, &[&str]) -> CommandResult;

const COMMANDS: &[(&str, &[&str], Handler)] = &[
    ("warzone", &["zone"], play::warzone),
    ("leave", &["warleave"], play::leave),
    ("setpoint", &["point"], admin::setpoint),
    ("resetzone", &[], admin::resetzone),
    ("savezone", &[], admin::savezone),
    ("zonecfg", &["zoneconfig"], admin::zonecfg),
    ("setzone", &[], admin::setzone),
    ("delzone", &[], admin::delzone),
    ("warcfg", &[], admin::warcfg),
    ("setinventory", &["inventory", "loadout"], admin::setinventory),
];

fn find(name: &str) -> Option<Handler> {
    COMMANDS
        .iter()
        .find(|(command, aliases, _)| {
            command.eq_ignore_ascii_case(name) || aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
        })
        .map(|(_, _, handler)| *handler)
}

/// Run one command line; replies are delivered to a player sender and returned either way
pub fn dispatch(war: &mut War, sender: Sender, line: &str) -> Vec<String> {
    let line = line.trim().trim_start_matches('/');
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Vec::new();
    };
    let args: Vec<&str> = words.collect();

    let result = match find(name) {
        Some(handler) => {
            info!(command = name, sender = ?sender, "Running command");
            handler(war, sender, &args)
        }
        None => Err(CommandError::User(format!("Unknown command {name}."))),
    };

    let lines = match result {
        Ok(lines) => lines,
        Err(e) => {
            let message = e.user_message();
            match sender {
                Sender::Player(_) => vec![format!("{ERROR_COLOR}{message}")],
                Sender::Console => vec![message],
            }
        }
    };

    if let Sender::Player(id) = sender {
        for line in &lines {
            war.sessions_mut().send(id, line);
        }
    }
    lines
}

/// Players need the zone maker permission; the console always has it
pub(crate) fn require_zone_maker(war: &War, sender: Sender) -> Result<(), CommandError> {
    match sender {
        Sender::Console => Ok(()),
        Sender::Player(id) => {
            let allowed = war
                .sessions()
                .get(id)
                .map(|session| session.is_zone_maker())
                .unwrap_or(false);
            if allowed {
                Ok(())
            } else {
                Err(CommandError::NoPermission)
            }
        }
    }
}
