//! Match phase, team scoring and restart coordination
//!
//! One `SessionStateMachine` lives for the whole process and is threaded
//! through the game loop; nothing here touches entities or the network.
//!
//! Phases: `Lobby -> Active <-> Paused`, `Active/Paused -> Victory -> Lobby`.
//! Starting a match is a local decision. Peers are never synchronised into
//! `Active` together, and the relay forwards gameplay events whatever the
//! local phase is.

use crate::entities::Team;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::Vec3;
use std::collections::HashSet;

pub const DEFAULT_KILL_LIMIT: u32 = 25;
pub const MIN_KILL_LIMIT: u32 = 5;
pub const MAX_KILL_LIMIT: u32 = 200;
pub const KILL_LIMIT_STEP: i32 = 5;
/// Seconds the victory screen holds before returning to the lobby.
pub const VICTORY_HOLD: f32 = 3.0;
/// Spawn points are drawn from `[-SPAWN_RANGE, SPAWN_RANGE]` on x and z.
pub const SPAWN_RANGE: f32 = 60.0;
pub const SPAWN_HEIGHT: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum GameMode {
    #[default]
    #[value(name = "ffa")]
    FreeForAll,
    #[value(name = "tdm")]
    TeamDeathmatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lobby,
    Active,
    Paused,
    Victory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Lose,
    /// The local player has no team to judge the result by.
    MatchOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TeamScores {
    pub red: u32,
    pub blue: u32,
}

impl TeamScores {
    pub fn get(&self, team: Team) -> u32 {
        match team {
            Team::Red => self.red,
            Team::Blue => self.blue,
        }
    }

    fn credit(&mut self, team: Team) {
        match team {
            Team::Red => self.red += 1,
            Team::Blue => self.blue += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub mode: GameMode,
    pub kill_limit: u32,
    /// Local team; `None` keeps the id-based default.
    pub team: Option<Team>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::FreeForAll,
            kill_limit: DEFAULT_KILL_LIMIT,
            team: None,
        }
    }
}

#[derive(Debug)]
pub struct SessionStateMachine {
    phase: Phase,
    mode: GameMode,
    kill_limit: u32,
    scores: TeamScores,
    /// Entities whose death has already been credited.
    death_latch: HashSet<u32>,
    victory_announced: bool,
    victory_timer: f32,
    winner: Option<Team>,
    outcome: Option<Outcome>,
}

/// Rounds a kill limit to the nearest step and clamps it to the allowed range.
fn snap_kill_limit(limit: u32) -> u32 {
    let step = KILL_LIMIT_STEP.unsigned_abs();
    (limit.saturating_add(step / 2) / step * step).clamp(MIN_KILL_LIMIT, MAX_KILL_LIMIT)
}

impl SessionStateMachine {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            phase: Phase::Lobby,
            mode: config.mode,
            kill_limit: snap_kill_limit(config.kill_limit),
            scores: TeamScores::default(),
            death_latch: HashSet::new(),
            victory_announced: false,
            victory_timer: 0.0,
            winner: None,
            outcome: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn is_team_mode(&self) -> bool {
        self.mode == GameMode::TeamDeathmatch
    }

    pub fn kill_limit(&self) -> u32 {
        self.kill_limit
    }

    pub fn scores(&self) -> TeamScores {
        self.scores
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn winner(&self) -> Option<Team> {
        self.winner
    }

    /// True while the local player takes part in the round.
    pub fn in_round(&self) -> bool {
        self.phase != Phase::Lobby
    }

    /// Changes the mode. Only allowed in the lobby; entering team
    /// deathmatch zeroes the scores.
    pub fn set_mode(&mut self, mode: GameMode) -> bool {
        if self.phase != Phase::Lobby {
            return false;
        }
        self.mode = mode;
        if mode == GameMode::TeamDeathmatch {
            self.scores = TeamScores::default();
        }
        info!("Mode set to {:?}", mode);
        true
    }

    /// Moves the kill limit by `delta`, clamped to its allowed range.
    pub fn adjust_kill_limit(&mut self, delta: i32) -> bool {
        if self.phase != Phase::Lobby {
            return false;
        }
        let next = (i64::from(self.kill_limit) + i64::from(delta)).max(0);
        self.kill_limit = snap_kill_limit(u32::try_from(next).unwrap_or(MAX_KILL_LIMIT));
        info!("Kill limit set to {}", self.kill_limit);
        true
    }

    /// Lobby -> Active. Zeroes the scores and clears any victory state.
    pub fn start(&mut self) -> bool {
        if self.phase != Phase::Lobby {
            return false;
        }
        self.scores = TeamScores::default();
        self.clear_victory();
        self.phase = Phase::Active;
        info!("Match started ({:?})", self.mode);
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.phase != Phase::Active {
            return false;
        }
        self.phase = Phase::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.phase != Phase::Paused {
            return false;
        }
        self.phase = Phase::Active;
        true
    }

    pub fn toggle_pause(&mut self) -> bool {
        match self.phase {
            Phase::Active => self.pause(),
            Phase::Paused => self.resume(),
            _ => false,
        }
    }

    /// Leaves a running match for the lobby.
    pub fn return_to_lobby(&mut self) -> bool {
        if !matches!(self.phase, Phase::Active | Phase::Paused) {
            return false;
        }
        self.phase = Phase::Lobby;
        self.clear_victory();
        true
    }

    /// Credits the opposing team for the death of `entity` in team mode.
    ///
    /// Each entity is credited at most once until [`Self::clear_death`] or a
    /// restart re-arms its latch. Returns the team that scored.
    pub fn record_death(&mut self, entity: u32, team: Option<Team>) -> Option<Team> {
        if !self.is_team_mode() {
            return None;
        }
        let team = team?;
        if !self.death_latch.insert(entity) {
            debug!("Death of {} already credited", entity);
            return None;
        }

        let scorer = team.opponent();
        self.scores.credit(scorer);
        info!(
            "{:?} scores (red {} - {} blue)",
            scorer, self.scores.red, self.scores.blue
        );
        Some(scorer)
    }

    pub fn death_credited(&self, entity: u32) -> bool {
        self.death_latch.contains(&entity)
    }

    /// Re-arms the death latch of an entity that came back to life.
    pub fn clear_death(&mut self, entity: u32) {
        self.death_latch.remove(&entity);
    }

    /// Enters `Victory` the first time a team reaches the kill limit.
    pub fn check_victory(&mut self, local_team: Option<Team>) -> Option<Outcome> {
        if self.victory_announced
            || !self.is_team_mode()
            || !matches!(self.phase, Phase::Active | Phase::Paused)
        {
            return None;
        }

        let winner = if self.scores.red >= self.kill_limit {
            Team::Red
        } else if self.scores.blue >= self.kill_limit {
            Team::Blue
        } else {
            return None;
        };

        let outcome = match local_team {
            Some(team) if team == winner => Outcome::Win,
            Some(_) => Outcome::Lose,
            None => Outcome::MatchOver,
        };

        info!("{:?} team wins: {:?}", winner, outcome);
        self.victory_announced = true;
        self.victory_timer = VICTORY_HOLD;
        self.winner = Some(winner);
        self.outcome = Some(outcome);
        self.phase = Phase::Victory;
        Some(outcome)
    }

    /// Advances phase timers. Returns true when the victory hold expired and
    /// the session went back to the lobby.
    pub fn advance(&mut self, dt: f32) -> bool {
        if self.phase != Phase::Victory {
            return false;
        }
        self.victory_timer -= dt;
        if self.victory_timer > 0.0 {
            return false;
        }

        self.scores = TeamScores::default();
        self.clear_victory();
        self.phase = Phase::Lobby;
        info!("Returning to lobby");
        true
    }

    /// Session side of a restart: scores and death latches reset and a
    /// paused match resumes.
    pub fn restart(&mut self) {
        self.scores = TeamScores::default();
        self.death_latch.clear();
        if self.phase == Phase::Paused {
            self.phase = Phase::Active;
        }
    }

    fn clear_victory(&mut self) {
        self.victory_announced = false;
        self.victory_timer = 0.0;
        self.winner = None;
        self.outcome = None;
    }

    /// Deterministic spawn point for `player_id` under a restart `seed`.
    ///
    /// Peers sharing a seed get reproducible, per-player distinct spawns.
    pub fn spawn_point(seed: u64, player_id: u32) -> Vec3 {
        let mixed = seed
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .rotate_left(17)
            ^ u64::from(player_id).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        let mut rng = StdRng::seed_from_u64(mixed);

        let x = rng.gen_range(-SPAWN_RANGE..=SPAWN_RANGE);
        let z = rng.gen_range(-SPAWN_RANGE..=SPAWN_RANGE);
        Vec3::new(x, SPAWN_HEIGHT, z)
    }

    /// Fresh seed for a locally triggered restart.
    pub fn new_seed() -> u64 {
        rand::thread_rng().gen_range(1..=1_000_000)
    }
}
