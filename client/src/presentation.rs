//! Notifications from the simulation to whatever renders it
//!
//! The game loop never calls into a renderer. It queues [`PresentationEvent`]s
//! and hands them to a [`Presenter`] once per tick.

use crate::entities::Team;
use crate::session::{Outcome, Phase, TeamScores};
use crate::weapon::WeaponClass;
use log::{debug, info};
use shared::Vec3;

/// Beyond this distance shots are heard at the floor volume.
pub const SHOT_AUDIBLE_DISTANCE: f32 = 60.0;
pub const SHOT_MIN_VOLUME: f32 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub enum PresentationEvent {
    PlayerJoined { id: u32, username: String },
    PlayerLeft { id: u32 },
    LobbyCount { players: usize },
    BulletSpawned { position: Vec3, replica: bool },
    Impact { point: Vec3 },
    ShotHeard { position: Vec3, volume: f32 },
    HealthChanged { id: u32, health: i32 },
    EntityDied { id: u32 },
    EntityRevived { id: u32 },
    ScoreChanged { scores: TeamScores },
    PhaseChanged { phase: Phase },
    Victory { winner: Option<Team>, outcome: Outcome },
    Respawned { position: Vec3 },
    WeaponStatus {
        class: WeaponClass,
        ammo: u32,
        reloading: bool,
    },
}

/// Volume of a shot fired at `source` as heard from `listener`.
///
/// Falls off linearly with distance and never drops below the floor.
pub fn shot_volume(listener: Vec3, source: Vec3, base: f32) -> f32 {
    let distance = listener.distance(source);
    let falloff = (1.0 - distance / SHOT_AUDIBLE_DISTANCE).max(0.0);
    (base * falloff).max(SHOT_MIN_VOLUME)
}

pub trait Presenter {
    fn present(&mut self, event: &PresentationEvent);
}

/// Presenter that writes every event to the log.
#[derive(Debug, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn present(&mut self, event: &PresentationEvent) {
        match event {
            PresentationEvent::PlayerJoined { id, username } => {
                info!("{} joined (id {})", username, id)
            }
            PresentationEvent::PlayerLeft { id } => info!("Player {} left", id),
            PresentationEvent::LobbyCount { players } => info!("Players in lobby: {}", players),
            PresentationEvent::BulletSpawned { position, replica } => {
                debug!("Bullet at {:?} (replica: {})", position, replica)
            }
            PresentationEvent::Impact { point } => debug!("Impact at {:?}", point),
            PresentationEvent::ShotHeard { position, volume } => {
                debug!("Shot heard from {:?} at volume {:.2}", position, volume)
            }
            PresentationEvent::HealthChanged { id, health } => {
                info!("Player {} health: {}", id, health)
            }
            PresentationEvent::EntityDied { id } => info!("Player {} died", id),
            PresentationEvent::EntityRevived { id } => info!("Player {} is back", id),
            PresentationEvent::ScoreChanged { scores } => {
                info!("Score: red {} - {} blue", scores.red, scores.blue)
            }
            PresentationEvent::PhaseChanged { phase } => info!("Phase: {:?}", phase),
            PresentationEvent::Victory { winner, outcome } => match winner {
                Some(team) => info!("{:?} team wins! ({:?})", team, outcome),
                None => info!("Match over ({:?})", outcome),
            },
            PresentationEvent::Respawned { position } => info!("Respawned at {:?}", position),
            PresentationEvent::WeaponStatus {
                class,
                ammo,
                reloading,
            } => {
                if *reloading {
                    info!("{:?}: reloading", class)
                } else {
                    info!("{:?}: {} rounds", class, ammo)
                }
            }
        }
    }
}
