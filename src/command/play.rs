//! Commands any player may use

use crate::host::PlayerSession;
use crate::war::War;

use super::{CommandError, CommandResult, Sender};

const WARZONE_USAGE: &str = "warzone [zone]";

/// List zones, or teleport a player to a zone's lobby
pub(super) fn warzone(war: &mut War, sender: Sender, args: &[&str]) -> CommandResult {
    match args {
        [] => {
            let names: Vec<&str> = war.zones().map(|z| z.name()).collect();
            if names.is_empty() {
                Ok(vec!["There are no warzones.".to_string()])
            } else {
                Ok(vec![format!("Warzones: {}", names.join(", "))])
            }
        }
        [zone] => {
            let player = sender.player()?;
            let zone = war.zone(zone)?;
            let lobby = zone.lobby()?;
            let name = zone.name().to_string();
            if let Some(session) = war.sessions_mut().get_mut(player) {
                session.teleport(&lobby);
            }
            Ok(vec![format!("Teleported to warzone {name}.")])
        }
        _ => Err(CommandError::Usage(WARZONE_USAGE)),
    }
}

pub(super) fn leave(war: &mut War, sender: Sender, args: &[&str]) -> CommandResult {
    if !args.is_empty() {
        return Err(CommandError::Usage("leave"));
    }
    let player = sender.player()?;
    let zone = war
        .sessions()
        .playing_in(player)
        .map(str::to_string)
        .ok_or(CommandError::War(crate::error::WarError::NotPlaying))?;
    war.leave(player)?;
    Ok(vec![format!("You left warzone {zone}.")])
}
