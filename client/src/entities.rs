//! Simulation entities and the registry that owns them
//!
//! The registry holds exactly one local player, the remote players keyed by
//! their relay id, and the live bullets. Presentation never holds references
//! into these types; it reacts to notifications produced by the game loop.

use crate::weapon::Weapon;
use log::debug;
use shared::{
    BulletRecord, PlayerRecord, Vec3, BULLET_LIFETIME, MAX_HEALTH, PLAY_AREA_HALF_WIDTH,
    PLAY_AREA_MAX_Y, PLAY_AREA_MIN_Y,
};
use std::collections::HashMap;

/// Horizontal distance the local player may stray from the arena centre.
pub const MOVE_BOUNDS: f32 = 75.0;
/// Muzzle height above the local player's base position.
pub const MUZZLE_HEIGHT: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }

    /// Default team for a relay id: even ids play blue, odd ids red.
    pub fn for_id(id: u32) -> Team {
        if id % 2 == 0 {
            Team::Blue
        } else {
            Team::Red
        }
    }
}

/// Capability of entities that belong to a team.
pub trait Teamable {
    fn team(&self) -> Option<Team>;
}

#[derive(Debug, Clone)]
pub struct LocalPlayer {
    pub id: u32,
    pub username: String,
    team: Option<Team>,
    pub health: i32,
    pub position: Vec3,
    /// Heading in degrees.
    pub yaw: f32,
    /// Look elevation in degrees, positive up.
    pub pitch: f32,
    pub weapon: Weapon,
    pub trigger_held: bool,
}

impl LocalPlayer {
    pub fn new(id: u32, username: impl Into<String>, position: Vec3) -> Self {
        Self {
            id,
            username: username.into(),
            team: Some(Team::for_id(id)),
            health: MAX_HEALTH,
            position,
            yaw: 0.0,
            pitch: 0.0,
            weapon: Weapon::default(),
            trigger_held: false,
        }
    }

    pub fn set_team(&mut self, team: Option<Team>) {
        self.team = team;
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn muzzle(&self) -> Vec3 {
        self.position + Vec3::new(0.0, MUZZLE_HEIGHT, 0.0)
    }

    /// Moves by `delta`, keeping clear of the perimeter walls.
    pub fn move_by(&mut self, delta: Vec3) {
        let mut next = self.position + delta;
        next.x = next.x.clamp(-MOVE_BOUNDS, MOVE_BOUNDS);
        next.z = next.z.clamp(-MOVE_BOUNDS, MOVE_BOUNDS);
        self.position = next;
    }

    pub fn respawn(&mut self, position: Vec3) {
        self.health = MAX_HEALTH;
        self.position = position;
        self.yaw = 0.0;
        self.pitch = 0.0;
        self.trigger_held = false;
        self.weapon.refill();
    }

    pub fn to_record(&self) -> PlayerRecord {
        PlayerRecord {
            id: self.id,
            username: self.username.clone(),
            position: self.position.to_array(),
            rotation: self.yaw,
            joined: false,
            left: false,
            health: self.health,
        }
    }
}

impl Teamable for LocalPlayer {
    fn team(&self) -> Option<Team> {
        self.team
    }
}

#[derive(Debug, Clone)]
pub struct RemoteEnemy {
    pub id: u32,
    pub username: String,
    team: Option<Team>,
    pub health: i32,
    pub position: Vec3,
    pub yaw: f32,
    /// Hitboxes are only swept while this is set; cleared on death.
    pub collidable: bool,
}

impl RemoteEnemy {
    pub fn new(id: u32, username: impl Into<String>, position: Vec3, health: i32) -> Self {
        Self {
            id,
            username: username.into(),
            team: Some(Team::for_id(id)),
            health,
            position,
            yaw: 0.0,
            collidable: health > 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn revive(&mut self) {
        self.collidable = true;
    }

    pub fn die(&mut self) {
        self.collidable = false;
    }
}

impl Teamable for RemoteEnemy {
    fn team(&self) -> Option<Team> {
        self.team
    }
}

/// Read access to any tracked entity by id.
#[derive(Debug, Clone, Copy)]
pub enum TrackedEntity<'a> {
    Local(&'a LocalPlayer),
    Remote(&'a RemoteEnemy),
}

impl<'a> TrackedEntity<'a> {
    pub fn id(&self) -> u32 {
        match self {
            TrackedEntity::Local(p) => p.id,
            TrackedEntity::Remote(e) => e.id,
        }
    }

    pub fn health(&self) -> i32 {
        match self {
            TrackedEntity::Local(p) => p.health,
            TrackedEntity::Remote(e) => e.health,
        }
    }

    pub fn as_teamable(&self) -> &'a dyn Teamable {
        match *self {
            TrackedEntity::Local(p) => p,
            TrackedEntity::Remote(e) => e,
        }
    }
}

/// Mutable access to any tracked entity by id.
#[derive(Debug)]
pub enum TrackedEntityMut<'a> {
    Local(&'a mut LocalPlayer),
    Remote(&'a mut RemoteEnemy),
}

impl TrackedEntityMut<'_> {
    pub fn health(&self) -> i32 {
        match self {
            TrackedEntityMut::Local(p) => p.health,
            TrackedEntityMut::Remote(e) => e.health,
        }
    }

    pub fn set_health(&mut self, health: i32) {
        match self {
            TrackedEntityMut::Local(p) => p.health = health,
            TrackedEntityMut::Remote(e) => e.health = health,
        }
    }

    pub fn team(&self) -> Option<Team> {
        match self {
            TrackedEntityMut::Local(p) => p.team(),
            TrackedEntityMut::Remote(e) => e.team(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Fired by this client; the only kind allowed to apply damage.
    Local,
    /// Spawned from a relayed bullet event; cosmetic only.
    Replica,
}

pub type BulletId = u64;

#[derive(Debug, Clone)]
pub struct Bullet {
    pub id: BulletId,
    pub ownership: Ownership,
    pub position: Vec3,
    pub velocity: Vec3,
    pub damage: i32,
    pub shooter_team: Option<Team>,
    /// Seconds since spawn.
    pub age: f32,
    alive: bool,
    muzzle: Vec3,
    yaw: f32,
    pitch: f32,
    speed: f32,
}

impl Bullet {
    /// Spawns a bullet one unit ahead of `muzzle` travelling along the
    /// given heading and elevation (degrees).
    pub fn new(
        muzzle: Vec3,
        yaw: f32,
        pitch: f32,
        damage: i32,
        speed: f32,
        shooter_team: Option<Team>,
        ownership: Ownership,
    ) -> Self {
        let (yaw_rad, pitch_rad) = (yaw.to_radians(), pitch.to_radians());
        let direction = Vec3::new(
            yaw_rad.sin() * pitch_rad.cos(),
            pitch_rad.sin(),
            yaw_rad.cos() * pitch_rad.cos(),
        );

        Self {
            id: 0,
            ownership,
            position: muzzle + direction,
            velocity: direction * speed,
            damage,
            shooter_team,
            age: 0.0,
            alive: true,
            muzzle,
            yaw,
            pitch,
            speed,
        }
    }

    /// Builds the cosmetic replica of a relayed bullet.
    pub fn replica(record: &BulletRecord) -> Self {
        Self::new(
            record.position.into(),
            record.direction,
            record.x_direction,
            record.damage,
            record.speed,
            None,
            Ownership::Replica,
        )
    }

    pub fn to_record(&self) -> BulletRecord {
        BulletRecord {
            position: self.muzzle.to_array(),
            direction: self.yaw,
            x_direction: self.pitch,
            damage: self.damage,
            speed: self.speed,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_replica(&self) -> bool {
        self.ownership == Ownership::Replica
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn retire(&mut self) {
        self.alive = false;
    }

    /// Moves the bullet along an unobstructed step and ages it.
    pub fn advance(&mut self, step: Vec3, dt: f32) {
        self.position += step;
        self.age += dt;
    }

    pub fn expired(&self) -> bool {
        self.age >= BULLET_LIFETIME
    }

    pub fn outside_play_area(&self) -> bool {
        self.position.x.abs() > PLAY_AREA_HALF_WIDTH
            || self.position.z.abs() > PLAY_AREA_HALF_WIDTH
            || self.position.y < PLAY_AREA_MIN_Y
            || self.position.y > PLAY_AREA_MAX_Y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Updated,
    /// The record named the local player and was not applied.
    Ignored,
}

#[derive(Debug)]
pub struct EntityRegistry {
    local: LocalPlayer,
    remotes: HashMap<u32, RemoteEnemy>,
    bullets: Vec<Bullet>,
    next_bullet_id: BulletId,
}

impl EntityRegistry {
    pub fn new(local: LocalPlayer) -> Self {
        Self {
            local,
            remotes: HashMap::new(),
            bullets: Vec::new(),
            next_bullet_id: 1,
        }
    }

    pub fn local(&self) -> &LocalPlayer {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut LocalPlayer {
        &mut self.local
    }

    pub fn local_id(&self) -> u32 {
        self.local.id
    }

    /// Creates or updates a remote player from a relayed record.
    pub fn upsert_remote(&mut self, record: &PlayerRecord) -> Upsert {
        if record.id == self.local.id {
            debug!("Ignoring player record that names the local player");
            return Upsert::Ignored;
        }

        let position = Vec3::from(record.position);
        match self.remotes.get_mut(&record.id) {
            Some(enemy) => {
                enemy.position = position;
                enemy.yaw = record.rotation;
                Upsert::Updated
            }
            None => {
                let mut enemy =
                    RemoteEnemy::new(record.id, record.username.clone(), position, record.health);
                enemy.yaw = record.rotation;
                self.remotes.insert(record.id, enemy);
                Upsert::Created
            }
        }
    }

    pub fn remove_remote(&mut self, id: u32) -> Option<RemoteEnemy> {
        self.remotes.remove(&id)
    }

    pub fn remote(&self, id: u32) -> Option<&RemoteEnemy> {
        self.remotes.get(&id)
    }

    pub fn remote_mut(&mut self, id: u32) -> Option<&mut RemoteEnemy> {
        self.remotes.get_mut(&id)
    }

    pub fn remotes(&self) -> impl Iterator<Item = &RemoteEnemy> {
        self.remotes.values()
    }

    pub fn remotes_mut(&mut self) -> impl Iterator<Item = &mut RemoteEnemy> {
        self.remotes.values_mut()
    }

    pub fn remote_count(&self) -> usize {
        self.remotes.len()
    }

    /// Looks up the local player or a remote player by id.
    pub fn get(&self, id: u32) -> Option<TrackedEntity<'_>> {
        if id == self.local.id {
            Some(TrackedEntity::Local(&self.local))
        } else {
            self.remotes.get(&id).map(TrackedEntity::Remote)
        }
    }

    pub fn get_mut(&mut self, id: u32) -> Option<TrackedEntityMut<'_>> {
        if id == self.local.id {
            Some(TrackedEntityMut::Local(&mut self.local))
        } else {
            self.remotes.get_mut(&id).map(TrackedEntityMut::Remote)
        }
    }

    pub fn register_bullet(&mut self, mut bullet: Bullet) -> BulletId {
        bullet.id = self.next_bullet_id;
        self.next_bullet_id += 1;
        let id = bullet.id;
        self.bullets.push(bullet);
        id
    }

    pub fn bullet(&self, id: BulletId) -> Option<&Bullet> {
        self.bullets.iter().find(|b| b.id == id)
    }

    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    pub fn bullets_mut(&mut self) -> &mut [Bullet] {
        &mut self.bullets
    }

    /// Drops every bullet that has been retired. Returns how many went.
    pub fn retire_dead_bullets(&mut self) -> usize {
        let before = self.bullets.len();
        self.bullets.retain(Bullet::is_alive);
        before - self.bullets.len()
    }
}
