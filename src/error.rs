//! Game-level error type

use crate::config::war::WarConfigError;
use crate::host::PlayerId;
use crate::store::StoreError;
use crate::zone::settings::SettingError;
use crate::zone::validator::ValidationError;

/// Point placement rules relative to the zone cuboid
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("Team spawns must be inside the warzone.")]
    SpawnOutside,

    #[error("The lobby must be outside the warzone.")]
    LobbyInside,

    #[error("Gates must be outside the warzone.")]
    GateInside,
}

#[derive(Debug, thiserror::Error)]
pub enum WarError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Setting(#[from] SettingError),

    #[error("Team does not exist.")]
    UnknownTeam(String),

    #[error("Warzone is full.")]
    ZoneFull,

    #[error("Already playing in this zone.")]
    AlreadyPlaying,

    #[error("Already playing in another zone.")]
    PlayingElsewhere,

    #[error("Warzone {0} is disabled for editing.")]
    EditingEnabled(String),

    #[error("Warzone {0} has no teams.")]
    NoTeams(String),

    #[error("No game is running in warzone {0}.")]
    NoGame(String),

    #[error("A game is running in warzone {0}.")]
    GameRunning(String),

    #[error("You are not playing in a warzone.")]
    NotPlaying,

    #[error("Warzone {0} does not exist.")]
    UnknownZone(String),

    #[error("Warzone {0} already exists.")]
    ZoneExists(String),

    #[error("Cannot create more than {0} warzones.")]
    TooManyZones(u32),

    #[error("Warzone {zone} has no {what}.")]
    ZoneIncomplete { zone: String, what: String },

    #[error("Player {0} is not connected.")]
    UnknownPlayer(PlayerId),

    #[error("zone storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("war config failure: {0}")]
    Config(#[from] WarConfigError),

    #[error("file system failure: {0}")]
    Io(#[from] std::io::Error),
}

impl WarError {
    /// Failures whose detail must stay in the server log
    pub fn is_internal(&self) -> bool {
        matches!(self, WarError::Storage(_) | WarError::Config(_) | WarError::Io(_))
    }

    pub(crate) fn incomplete(zone: &str, what: impl Into<String>) -> Self {
        WarError::ZoneIncomplete {
            zone: zone.to_string(),
            what: what.into(),
        }
    }
}
