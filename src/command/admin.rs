//! Zone maker commands: building, configuring and maintaining zones

use crate::config::war::WarSetting;
use crate::error::WarError;
use crate::geom::Cuboid;
use crate::host::PlayerSession;
use crate::session::ZoneDraft;
use crate::war::War;
use crate::zone::settings::{resolve, ZoneSetting};
use crate::zone::{AUTOASSIGN, DEFAULT_LOADOUT};

use super::{require_zone_maker, CommandError, CommandResult, Sender};

const SETPOINT_USAGE: &str = "setpoint <zone> lobby | spawn <team> [-delete] | gate <team|autoassign> [-delete]";
const SETZONE_USAGE: &str = "setzone <name> | c1 | c2";
const DELETE_FLAG: &str = "-delete";

pub(super) fn setpoint(war: &mut War, sender: Sender, args: &[&str]) -> CommandResult {
    require_zone_maker(war, sender)?;
    let (zone_name, kind, rest) = match args {
        [zone, kind, rest @ ..] => (*zone, kind.to_ascii_lowercase(), rest),
        _ => return Err(CommandError::Usage(SETPOINT_USAGE)),
    };
    let zone_name = war.zone(zone_name)?.name().to_string();

    match (kind.as_str(), rest) {
        ("lobby", []) => {
            let at = player_location(war, sender)?;
            war.zone_mut(&zone_name)?.set_lobby(&at)?;
            Ok(vec![format!("Lobby for warzone {zone_name} set.")])
        }
        ("spawn", [team, flag]) if flag.eq_ignore_ascii_case(DELETE_FLAG) => {
            if war.zone_mut(&zone_name)?.delete_team(team)? {
                Ok(vec![format!("Team {team} removed from warzone {zone_name}.")])
            } else {
                Err(WarError::UnknownTeam(team.to_string()).into())
            }
        }
        ("spawn", [team]) => {
            let at = player_location(war, sender)?;
            war.zone_mut(&zone_name)?.set_team_spawn(team, &at)?;
            Ok(vec![format!("Spawn for team {team} in warzone {zone_name} set.")])
        }
        ("gate", [name, flag]) if flag.eq_ignore_ascii_case(DELETE_FLAG) => {
            if war.zone_mut(&zone_name)?.delete_gate(name)? {
                Ok(vec![format!("Gate {name} removed from warzone {zone_name}.")])
            } else {
                Err(CommandError::User(format!("Warzone {zone_name} has no gate {name}.")))
            }
        }
        ("gate", [name]) => {
            let at = player_location(war, sender)?;
            war.zone_mut(&zone_name)?.set_gate(name, &at)?;
            let target = if name.eq_ignore_ascii_case(AUTOASSIGN) {
                "auto-assign".to_string()
            } else {
                format!("team {name}")
            };
            Ok(vec![format!("Gate for {target} in warzone {zone_name} set.")])
        }
        _ => Err(CommandError::Usage(SETPOINT_USAGE)),
    }
}

pub(super) fn resetzone(war: &mut War, sender: Sender, args: &[&str]) -> CommandResult {
    require_zone_maker(war, sender)?;
    let [zone] = args else {
        return Err(CommandError::Usage("resetzone <zone>"));
    };
    let name = war.zone(zone)?.name().to_string();
    let blocks = war.reset_zone(&name)?;
    Ok(vec![
        format!("Reloading zone {name}..."),
        format!("Reloaded {blocks} blocks in zone {name}."),
    ])
}

pub(super) fn savezone(war: &mut War, sender: Sender, args: &[&str]) -> CommandResult {
    require_zone_maker(war, sender)?;
    let [zone] = args else {
        return Err(CommandError::Usage("savezone <zone>"));
    };
    let name = war.zone(zone)?.name().to_string();
    let stats = war.save_zone(&name)?;
    Ok(vec![format!(
        "Saved {} blocks in zone {} ({:.2} seconds).",
        stats.blocks,
        name,
        stats.elapsed_ms as f64 / 1000.0
    )])
}

/// Show or change zone settings; players may omit the zone while standing in one
pub(super) fn zonecfg(war: &mut War, sender: Sender, args: &[&str]) -> CommandResult {
    let (zone_name, rest) = match args.first() {
        Some(first) if war.zone(first).is_ok() => (war.zone(first)?.name().to_string(), &args[1..]),
        _ => (standing_in(war, sender)?, args),
    };

    match rest {
        [] => {
            let defaults = &war.config().zone_defaults;
            let zone = war.zone(&zone_name)?;
            let values: Vec<String> = ZoneSetting::ALL
                .iter()
                .map(|s| format!("{}: {}", s, zone.setting(*s, defaults)))
                .collect();
            Ok(vec![format!("Warzone {zone_name} settings: {}", values.join(", "))])
        }
        [setting] => {
            let setting: ZoneSetting = setting.parse().map_err(WarError::from)?;
            let value = war.zone(&zone_name)?.setting(setting, &war.config().zone_defaults);
            Ok(vec![format!("{setting}: {value}")])
        }
        [setting, value] => {
            require_zone_maker(war, sender)?;
            let value = war.set_zone_setting(&zone_name, setting, value)?;
            Ok(vec![format!("Warzone {zone_name}: {} set to {value}.", setting.to_ascii_lowercase())])
        }
        _ => Err(CommandError::Usage("zonecfg [zone] [setting] [value]")),
    }
}

/// Two-corner zone creation
pub(super) fn setzone(war: &mut War, sender: Sender, args: &[&str]) -> CommandResult {
    let player = sender.player()?;
    require_zone_maker(war, sender)?;
    let [arg] = args else {
        return Err(CommandError::Usage(SETZONE_USAGE));
    };

    match arg.to_ascii_lowercase().as_str() {
        "c1" => {
            let corner = targeted_block(war, player)?;
            let draft = draft_mut(war, player)?;
            draft.corner1 = Some(corner.clone());
            let zone = draft.zone.clone();
            Ok(vec![format!(
                "Warzone {zone}: first corner set to {corner}. Now look at the opposite corner and use /setzone c2."
            )])
        }
        "c2" => {
            let corner2 = targeted_block(war, player)?;
            let draft = draft_mut(war, player)?;
            let zone = draft.zone.clone();
            let Some(corner1) = draft.corner1.clone() else {
                return Err(CommandError::User(format!(
                    "Warzone {zone}: set the first corner with /setzone c1 first."
                )));
            };

            let cuboid = Cuboid::new(&corner1, &corner2);
            war.create_zone(&zone, &cuboid)?;
            if let Some(context) = war.sessions_mut().context_mut(player) {
                context.draft = None;
            }

            let mut lines = vec![format!("Warzone {zone} created ({cuboid}).")];
            let here = player_location(war, sender)?;
            if cuboid.contains(&here) {
                lines.push(format!("Set a lobby outside the zone with /setpoint {zone} lobby."));
            } else {
                war.zone_mut(&zone)?.set_lobby(&here)?;
                lines.push(format!("Lobby for warzone {zone} set to your location."));
            }
            Ok(lines)
        }
        _ => {
            let validator = crate::zone::validator::ZoneValidator::new(war.config().settings.max_zone_size);
            validator.validate_name(arg).map_err(WarError::from)?;
            if war.zone(arg).is_ok() {
                return Err(WarError::ZoneExists(arg.to_string()).into());
            }
            if let Some(context) = war.sessions_mut().context_mut(player) {
                context.draft = Some(ZoneDraft {
                    zone: arg.to_string(),
                    corner1: None,
                });
            }
            Ok(vec![format!(
                "Creating warzone {arg}. Look at the first corner and use /setzone c1."
            )])
        }
    }
}

pub(super) fn delzone(war: &mut War, sender: Sender, args: &[&str]) -> CommandResult {
    require_zone_maker(war, sender)?;
    let [zone] = args else {
        return Err(CommandError::Usage("delzone <zone>"));
    };
    let name = war.zone(zone)?.name().to_string();
    war.delete_zone(&name)?;
    Ok(vec![format!("Warzone {name} deleted.")])
}

pub(super) fn warcfg(war: &mut War, sender: Sender, args: &[&str]) -> CommandResult {
    match args {
        [] => {
            let config = war.config();
            let mut values: Vec<String> = WarSetting::ALL
                .iter()
                .map(|s| format!("{}: {}", s, s.get(&config.settings)))
                .collect();
            values.extend(
                config
                    .zone_defaults
                    .iter()
                    .map(|(setting, value)| format!("default {setting}: {value}")),
            );
            Ok(vec![format!("War settings: {}", values.join(", "))])
        }
        [setting] => {
            let config = war.config();
            if let Ok(war_setting) = setting.parse::<WarSetting>() {
                return Ok(vec![format!("{war_setting}: {}", war_setting.get(&config.settings))]);
            }
            let zone_setting: ZoneSetting = setting.parse().map_err(WarError::from)?;
            let value = resolve(zone_setting, None, &config.zone_defaults);
            Ok(vec![format!("default {zone_setting}: {value}")])
        }
        [setting, value] => {
            require_zone_maker(war, sender)?;
            let applied = war.set_war_setting(setting, value)?;
            Ok(vec![format!("War setting {applied}.")])
        }
        _ => Err(CommandError::Usage("warcfg [setting] [value]")),
    }
}

/// Store the player's current inventory as a zone loadout
pub(super) fn setinventory(war: &mut War, sender: Sender, args: &[&str]) -> CommandResult {
    let player = sender.player()?;
    require_zone_maker(war, sender)?;
    let (zone, label) = match args {
        [zone] => (*zone, DEFAULT_LOADOUT),
        [zone, label] => (*zone, *label),
        _ => return Err(CommandError::Usage("setinventory <zone> [label]")),
    };
    let inventory = war
        .sessions()
        .get(player)
        .map(|session| session.state().inventory)
        .ok_or(WarError::UnknownPlayer(player))?;
    let zone = war.zone_mut(zone)?;
    zone.save_loadout(label, &inventory)?;
    Ok(vec![format!("Saved loadout {label} for warzone {}.", zone.name())])
}

fn player_location(war: &War, sender: Sender) -> Result<crate::geom::Location, CommandError> {
    let player = sender.player()?;
    war.sessions()
        .get(player)
        .map(|session| session.location())
        .ok_or_else(|| WarError::UnknownPlayer(player).into())
}

fn standing_in(war: &War, sender: Sender) -> Result<String, CommandError> {
    let here = player_location(war, sender).map_err(|_| CommandError::Usage("zonecfg <zone> [setting] [value]"))?;
    war.zone_at(&here)
        .map(|zone| zone.name().to_string())
        .ok_or_else(|| CommandError::User("You are not in a warzone.".to_string()))
}

fn targeted_block(war: &War, player: crate::host::PlayerId) -> Result<crate::geom::Location, CommandError> {
    war.sessions()
        .get(player)
        .and_then(|session| session.target_block())
        .ok_or_else(|| CommandError::User("Look at a block first.".to_string()))
}

fn draft_mut(war: &mut War, player: crate::host::PlayerId) -> Result<&mut ZoneDraft, CommandError> {
    war.sessions_mut()
        .context_mut(player)
        .and_then(|context| context.draft.as_mut())
        .ok_or_else(|| CommandError::User("Create a warzone using the command `/setzone <name>' first.".to_string()))
}
