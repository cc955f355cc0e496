//! Console command parsing into local player actions

use crate::entities::Team;
use crate::session::{GameMode, KILL_LIMIT_STEP};
use crate::weapon::WeaponClass;
use clap::ValueEnum;
use shared::Vec3;

#[derive(Debug, Clone, PartialEq)]
pub enum LocalAction {
    Start,
    Pause,
    Resume,
    TogglePause,
    ReturnToLobby,
    Restart,
    /// Single trigger pull.
    Fire,
    /// Trigger held down; automatic weapons keep firing.
    HoldTrigger,
    ReleaseTrigger,
    Reload,
    Move(Vec3),
    Look { yaw: f32, pitch: f32 },
    SetMode(GameMode),
    SetTeam(Option<Team>),
    AdjustKillLimit(i32),
    SelectWeapon(WeaponClass),
    Quit,
}

pub const HELP: &str = "commands: start | pause | resume | lobby | restart | fire | hold | release | \
reload | move <dx> <dy> <dz> | look <yaw> <pitch> | mode <ffa|tdm> | team <red|blue|none> | \
limit <+N|-N, in steps of 5> | weapon <pistol|rifle|sniper> | quit";

/// Parses one line of console input.
pub fn parse_command(line: &str) -> Result<LocalAction, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Err("empty command".to_string());
    };
    let args: Vec<&str> = words.collect();

    let action = match (command.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("start", []) => LocalAction::Start,
        ("pause", []) => LocalAction::Pause,
        ("resume", []) => LocalAction::Resume,
        ("p", []) => LocalAction::TogglePause,
        ("lobby", []) => LocalAction::ReturnToLobby,
        ("restart", []) => LocalAction::Restart,
        ("fire", []) => LocalAction::Fire,
        ("hold", []) => LocalAction::HoldTrigger,
        ("release", []) => LocalAction::ReleaseTrigger,
        ("reload", []) => LocalAction::Reload,
        ("quit" | "exit", []) => LocalAction::Quit,
        ("move", [dx, dy, dz]) => {
            LocalAction::Move(Vec3::new(number(dx)?, number(dy)?, number(dz)?))
        }
        ("look", [yaw, pitch]) => LocalAction::Look {
            yaw: number(yaw)?,
            pitch: number(pitch)?,
        },
        ("mode", [mode]) => LocalAction::SetMode(GameMode::from_str(mode, true)?),
        ("team", [team]) if team.eq_ignore_ascii_case("none") => LocalAction::SetTeam(None),
        ("team", [team]) => LocalAction::SetTeam(Some(Team::from_str(team, true)?)),
        ("limit", [delta]) => {
            let delta: i32 = delta
                .parse()
                .map_err(|_| format!("invalid kill limit step: {}", delta))?;
            // Any nonzero request moves at least one whole step
            let magnitude = delta.saturating_abs().saturating_add(KILL_LIMIT_STEP - 1)
                / KILL_LIMIT_STEP
                * KILL_LIMIT_STEP;
            LocalAction::AdjustKillLimit(delta.signum() * magnitude)
        }
        ("weapon", [class]) => LocalAction::SelectWeapon(WeaponClass::from_str(class, true)?),
        _ => return Err(format!("unknown command: {}", line.trim())),
    };
    Ok(action)
}

fn number(word: &str) -> Result<f32, String> {
    word.parse()
        .map_err(|_| format!("invalid number: {}", word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_command("start"), Ok(LocalAction::Start));
        assert_eq!(parse_command("  FIRE "), Ok(LocalAction::Fire));
        assert_eq!(parse_command("p"), Ok(LocalAction::TogglePause));
        assert_eq!(parse_command("quit"), Ok(LocalAction::Quit));
    }

    #[test]
    fn test_move_and_look() {
        assert_eq!(
            parse_command("move 1 0 -2.5"),
            Ok(LocalAction::Move(Vec3::new(1.0, 0.0, -2.5)))
        );
        assert_eq!(
            parse_command("look 90 -10"),
            Ok(LocalAction::Look {
                yaw: 90.0,
                pitch: -10.0
            })
        );
        assert!(parse_command("move 1 two 3").is_err());
        assert!(parse_command("look 90").is_err());
    }

    #[test]
    fn test_value_arguments() {
        assert_eq!(
            parse_command("mode tdm"),
            Ok(LocalAction::SetMode(GameMode::TeamDeathmatch))
        );
        assert_eq!(
            parse_command("team Red"),
            Ok(LocalAction::SetTeam(Some(Team::Red)))
        );
        assert_eq!(parse_command("team none"), Ok(LocalAction::SetTeam(None)));
        assert_eq!(
            parse_command("weapon sniper"),
            Ok(LocalAction::SelectWeapon(WeaponClass::Sniper))
        );
        assert!(parse_command("mode deathmatch").is_err());
    }

    #[test]
    fn test_limit_steps_by_five() {
        assert_eq!(parse_command("limit +5"), Ok(LocalAction::AdjustKillLimit(5)));
        assert_eq!(parse_command("limit +20"), Ok(LocalAction::AdjustKillLimit(20)));
        assert_eq!(parse_command("limit +7"), Ok(LocalAction::AdjustKillLimit(10)));
        assert_eq!(parse_command("limit -1"), Ok(LocalAction::AdjustKillLimit(-5)));
        assert_eq!(parse_command("limit -15"), Ok(LocalAction::AdjustKillLimit(-15)));
        assert_eq!(parse_command("limit 0"), Ok(LocalAction::AdjustKillLimit(0)));
        assert!(parse_command("limit lots").is_err());
    }

    #[test]
    fn test_unknown_and_empty() {
        assert!(parse_command("").is_err());
        assert!(parse_command("dance").is_err());
        assert!(parse_command("start now").is_err());
    }
}
