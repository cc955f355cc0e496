//! Client simulation: inbound dispatch, local actions and the per-tick step
//!
//! `Game` exclusively owns every entity and the session. It never performs
//! I/O; messages for the relay accumulate in an outbox and notifications for
//! the presenter in a second list, both drained by the caller once per tick.

use crate::ballistics::{
    BallisticSweep, HitPart, HitboxRayCaster, Obstruction, RayHit, SweepOutcome, TargetHandle,
};
use crate::entities::{
    Bullet, BulletId, EntityRegistry, LocalPlayer, Ownership, Team, Teamable, Upsert,
};
use crate::error::SessionError;
use crate::events::{InboundEvent, NetworkEventQueue};
use crate::geometry::StaticGeometryIndex;
use crate::hit::{HitEffect, HitResolutionAuthority};
use crate::input::LocalAction;
use crate::presentation::{shot_volume, PresentationEvent};
use crate::session::{Phase, SessionConfig, SessionStateMachine};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{BulletRecord, Message, PlayerRecord, Vec3, MAX_HEALTH};

/// Seed used for the spawn point before any restart has happened.
const INITIAL_SPAWN_SEED: u64 = 0;

pub struct Game {
    registry: EntityRegistry,
    session: SessionStateMachine,
    geometry: StaticGeometryIndex,
    authority: HitResolutionAuthority,
    outbound: Vec<Message>,
    presentation: Vec<PresentationEvent>,
    /// Position and heading last announced to the relay.
    last_sent: (Vec3, f32),
    rng: StdRng,
}

impl Game {
    pub fn new(client_id: u32, username: &str, config: &SessionConfig) -> Self {
        Self::with_geometry(client_id, username, config, StaticGeometryIndex::arena())
    }

    pub fn with_geometry(
        client_id: u32,
        username: &str,
        config: &SessionConfig,
        geometry: StaticGeometryIndex,
    ) -> Self {
        let spawn = SessionStateMachine::spawn_point(INITIAL_SPAWN_SEED, client_id);
        let mut local = LocalPlayer::new(client_id, username, spawn);
        if let Some(team) = config.team {
            local.set_team(Some(team));
        }

        Self {
            registry: EntityRegistry::new(local),
            session: SessionStateMachine::new(config),
            geometry,
            authority: HitResolutionAuthority::new(),
            outbound: Vec::new(),
            presentation: Vec::new(),
            last_sent: (spawn, 0.0),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    pub fn session(&self) -> &SessionStateMachine {
        &self.session
    }

    pub fn geometry(&self) -> &StaticGeometryIndex {
        &self.geometry
    }

    pub fn local_id(&self) -> u32 {
        self.registry.local_id()
    }

    /// Messages queued for the relay since the last call.
    pub fn take_outbound(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbound)
    }

    /// Notifications queued for the presenter since the last call.
    pub fn take_presentation(&mut self) -> Vec<PresentationEvent> {
        std::mem::take(&mut self.presentation)
    }

    /// Applies every queued inbound event in arrival order.
    ///
    /// Returns the number of messages handled, or `RelayClosed` once the
    /// relay has gone away.
    pub fn drain_events(&mut self, queue: &mut NetworkEventQueue) -> Result<usize, SessionError> {
        let mut handled = 0;
        for event in queue.drain() {
            match event {
                InboundEvent::Message(message) => {
                    self.handle_message(message);
                    handled += 1;
                }
                InboundEvent::RelayClosed => return Err(SessionError::RelayClosed),
            }
        }
        Ok(handled)
    }

    pub fn handle_message(&mut self, message: Message) {
        match message {
            Message::Player(record) => self.handle_player(record),
            Message::Bullet(record) => self.handle_bullet(&record),
            Message::HealthUpdate { id, health } => self.settle_health(id, health),
            Message::Restart { seed } => {
                self.restart(Some(seed), false);
            }
            other => warn!("Unexpected {} message during session", other.kind()),
        }
    }

    fn handle_player(&mut self, record: PlayerRecord) {
        if record.left {
            match self.registry.remove_remote(record.id) {
                Some(enemy) => {
                    info!("{} left", enemy.username);
                    self.presentation
                        .push(PresentationEvent::PlayerLeft { id: record.id });
                    self.push_lobby_count();
                }
                None => debug!("Leave for unknown player {}", record.id),
            }
            return;
        }

        if !record.joined && self.registry.remote(record.id).is_none() {
            debug!("Update for unknown player {}", record.id);
            return;
        }

        if self.registry.upsert_remote(&record) == Upsert::Created {
            self.presentation.push(PresentationEvent::PlayerJoined {
                id: record.id,
                username: record.username.clone(),
            });
            self.push_lobby_count();
        }
    }

    fn handle_bullet(&mut self, record: &BulletRecord) {
        let replica = Bullet::replica(record);
        let origin = Vec3::from(record.position);
        let listener = self.registry.local().position;

        self.presentation.push(PresentationEvent::BulletSpawned {
            position: replica.position,
            replica: true,
        });
        self.presentation.push(PresentationEvent::ShotHeard {
            position: origin,
            volume: shot_volume(listener, origin, 1.0),
        });
        self.registry.register_bullet(replica);
    }

    /// Applies an authoritative absolute health value.
    fn settle_health(&mut self, id: u32, health: i32) {
        let Some(mut entity) = self.registry.get_mut(id) else {
            debug!("Health update for unknown entity {}", id);
            return;
        };
        let previous = entity.health();
        entity.set_health(health);

        self.presentation
            .push(PresentationEvent::HealthChanged { id, health });
        self.on_health_transition(id, previous, health);
    }

    /// Death and revival bookkeeping shared by inbound updates and local hits.
    fn on_health_transition(&mut self, id: u32, previous: i32, current: i32) {
        let is_local = id == self.registry.local_id();

        if previous > 0 && current <= 0 {
            if let Some(enemy) = self.registry.remote_mut(id) {
                enemy.die();
            }
            self.presentation.push(PresentationEvent::EntityDied { id });

            // The local death is credited from the tick, not from echoes
            if !is_local {
                let team = self.registry.get(id).and_then(|e| e.as_teamable().team());
                self.credit_death(id, team);
            }
        } else if previous <= 0 && current > 0 {
            if let Some(enemy) = self.registry.remote_mut(id) {
                enemy.revive();
            }
            self.session.clear_death(id);
            self.presentation.push(PresentationEvent::EntityRevived { id });
        }
    }

    fn credit_death(&mut self, id: u32, team: Option<Team>) {
        if self.session.record_death(id, team).is_none() {
            return;
        }
        self.presentation.push(PresentationEvent::ScoreChanged {
            scores: self.session.scores(),
        });

        let local_team = self.registry.local().team();
        if let Some(outcome) = self.session.check_victory(local_team) {
            self.presentation.push(PresentationEvent::Victory {
                winner: self.session.winner(),
                outcome,
            });
            self.presentation.push(PresentationEvent::PhaseChanged {
                phase: Phase::Victory,
            });
        }
    }

    /// Respawns everyone for a new round.
    ///
    /// The local spawn point is derived from `seed` and the local id. A
    /// locally triggered restart picks a fresh seed when none is given and
    /// announces it together with the new position. Returns the seed used.
    pub fn restart(&mut self, seed: Option<u64>, local: bool) -> u64 {
        let seed = seed.unwrap_or_else(SessionStateMachine::new_seed);
        let spawn = SessionStateMachine::spawn_point(seed, self.registry.local_id());
        let phase = self.session.phase();
        info!("Restarting round with seed {}", seed);

        self.registry.local_mut().respawn(spawn);
        self.session.restart();
        for enemy in self.registry.remotes_mut() {
            let was_dead = !enemy.is_alive();
            enemy.health = MAX_HEALTH;
            enemy.revive();
            if was_dead {
                self.presentation
                    .push(PresentationEvent::EntityRevived { id: enemy.id });
            }
        }
        self.last_sent = (spawn, 0.0);

        self.presentation
            .push(PresentationEvent::Respawned { position: spawn });
        self.presentation.push(PresentationEvent::ScoreChanged {
            scores: self.session.scores(),
        });
        if self.session.phase() != phase {
            self.presentation.push(PresentationEvent::PhaseChanged {
                phase: self.session.phase(),
            });
        }
        self.push_weapon_status();

        if local {
            self.outbound.push(Message::Restart { seed });
            self.outbound
                .push(Message::Player(self.registry.local().to_record()));
        }
        seed
    }

    /// Applies one local command. Returns false when the current phase does
    /// not allow it.
    pub fn apply_action(&mut self, action: &LocalAction) -> bool {
        let phase = self.session.phase();
        let controls = matches!(phase, Phase::Active | Phase::Victory);
        let alive = self.registry.local().is_alive();

        let applied = match action {
            LocalAction::Start => {
                let started = self.session.start();
                if started {
                    let local = self.registry.local();
                    self.last_sent = (local.position, local.yaw);
                    self.outbound.push(Message::Player(local.to_record()));
                    self.presentation.push(PresentationEvent::ScoreChanged {
                        scores: self.session.scores(),
                    });
                }
                started
            }
            LocalAction::Pause => self.session.pause(),
            LocalAction::Resume => self.session.resume(),
            LocalAction::TogglePause => self.session.toggle_pause(),
            LocalAction::ReturnToLobby => self.session.return_to_lobby(),
            LocalAction::Restart => {
                if matches!(phase, Phase::Active | Phase::Paused) {
                    self.restart(None, true);
                    true
                } else {
                    false
                }
            }
            LocalAction::Fire if controls && alive => {
                self.registry.local_mut().trigger_held = false;
                self.fire().is_some()
            }
            LocalAction::HoldTrigger if controls && alive => {
                self.registry.local_mut().trigger_held = true;
                self.fire();
                true
            }
            LocalAction::ReleaseTrigger => {
                self.registry.local_mut().trigger_held = false;
                true
            }
            LocalAction::Reload if controls && alive => {
                let started = self.registry.local_mut().weapon.start_reload();
                if started {
                    self.push_weapon_status();
                }
                started
            }
            LocalAction::Move(delta) if controls && alive => {
                self.registry.local_mut().move_by(*delta);
                true
            }
            LocalAction::Look { yaw, pitch } if controls && alive => {
                let local = self.registry.local_mut();
                local.yaw = (*yaw).rem_euclid(360.0);
                local.pitch = (*pitch).clamp(-90.0, 90.0);
                true
            }
            LocalAction::SetMode(mode) => self.session.set_mode(*mode),
            LocalAction::SetTeam(team) if phase == Phase::Lobby => {
                self.registry.local_mut().set_team(*team);
                info!("Team set to {:?}", team);
                true
            }
            LocalAction::AdjustKillLimit(delta) => self.session.adjust_kill_limit(*delta),
            LocalAction::SelectWeapon(class) if phase == Phase::Lobby => {
                self.registry.local_mut().weapon.select(*class);
                self.push_weapon_status();
                true
            }
            _ => false,
        };

        if !applied {
            debug!("{:?} ignored in {:?}", action, phase);
            return false;
        }
        // Restart reports its own phase change
        if self.session.phase() != phase && *action != LocalAction::Restart {
            if self.session.phase() != Phase::Active {
                self.registry.local_mut().trigger_held = false;
            }
            self.presentation.push(PresentationEvent::PhaseChanged {
                phase: self.session.phase(),
            });
        }
        true
    }

    /// Fires one bullet from the local muzzle if the weapon allows it.
    fn fire(&mut self) -> Option<BulletId> {
        let team_mode = self.session.is_team_mode();
        let local = self.registry.local_mut();
        if !local.is_alive() || !local.weapon.can_fire() {
            return None;
        }

        let damage = local.weapon.roll_damage(&mut self.rng);
        let shooter_team = if team_mode { local.team() } else { None };
        let bullet = Bullet::new(
            local.muzzle(),
            local.yaw,
            local.pitch,
            damage,
            local.weapon.spec().bullet_speed,
            shooter_team,
            Ownership::Local,
        );
        local.weapon.record_shot();

        self.outbound.push(Message::Bullet(bullet.to_record()));
        self.presentation.push(PresentationEvent::BulletSpawned {
            position: bullet.position,
            replica: false,
        });
        self.push_weapon_status();
        Some(self.registry.register_bullet(bullet))
    }

    /// Advances the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        if self.session.advance(dt) {
            self.registry.local_mut().trigger_held = false;
            self.presentation.push(PresentationEvent::ScoreChanged {
                scores: self.session.scores(),
            });
            self.presentation.push(PresentationEvent::PhaseChanged {
                phase: Phase::Lobby,
            });
        }

        if self.session.in_round() {
            self.step_local_player(dt);
        }
        self.step_bullets(dt);
    }

    fn step_local_player(&mut self, dt: f32) {
        let paused = self.session.phase() == Phase::Paused;
        let local = self.registry.local_mut();

        if local.weapon.tick(dt) {
            self.push_weapon_status();
        }

        let local = self.registry.local();
        if !local.is_alive() {
            let (id, team) = (local.id, local.team());
            if !self.session.death_credited(id) {
                self.credit_death(id, team);
            }
            return;
        }

        if !paused && local.trigger_held && local.weapon.spec().automatic {
            self.fire();
        }

        let local = self.registry.local();
        if (local.position, local.yaw) != self.last_sent {
            self.last_sent = (local.position, local.yaw);
            self.outbound.push(Message::Player(local.to_record()));
        }
    }

    /// Sweeps every live bullet along this tick's travel, then resolves the
    /// hits it found and drops retired bullets.
    fn step_bullets(&mut self, dt: f32) {
        if self.registry.bullets().is_empty() {
            return;
        }

        let caster = HitboxRayCaster::from_registry(&self.registry, self.session.in_round());
        let own_hitbox = [TargetHandle {
            entity: self.registry.local_id(),
            part: HitPart::Body,
        }];
        let sweep = BallisticSweep::new(&self.geometry, &caster);
        let mut hits: Vec<(usize, RayHit)> = Vec::new();

        for (index, bullet) in self.registry.bullets_mut().iter_mut().enumerate() {
            if !bullet.is_alive() {
                continue;
            }

            let speed = bullet.velocity.length();
            let direction = if speed > 0.0 {
                bullet.velocity / speed
            } else {
                Vec3::ZERO
            };
            let ignore: &[TargetHandle] = if bullet.is_replica() { &[] } else { &own_hitbox };

            match sweep.sweep(bullet.position, direction, speed * dt, ignore) {
                SweepOutcome::Stationary => bullet.advance(Vec3::ZERO, dt),
                SweepOutcome::Clear => {
                    let step = bullet.velocity * dt;
                    bullet.advance(step, dt);
                }
                SweepOutcome::Blocked(obstruction) => {
                    self.presentation.push(PresentationEvent::Impact {
                        point: obstruction.point(),
                    });
                    match obstruction {
                        Obstruction::Static { .. } => bullet.retire(),
                        Obstruction::Dynamic(hit) => hits.push((index, hit)),
                    }
                }
            }

            if bullet.is_alive() && (bullet.expired() || bullet.outside_play_area()) {
                bullet.retire();
            }
        }

        for (index, hit) in hits {
            self.resolve_hit(index, &hit);
        }
        self.registry.retire_dead_bullets();
    }

    fn resolve_hit(&mut self, index: usize, hit: &RayHit) {
        let Some(bullet) = self.registry.bullets().get(index).cloned() else {
            return;
        };
        let resolution = self.authority.resolve(&bullet, hit, &mut self.registry);
        // Every collision ends the bullet, friendly fire included
        if let Some(bullet) = self.registry.bullets_mut().get_mut(index) {
            bullet.retire();
        }

        if let HitEffect::Damaged {
            previous_health,
            new_health,
            ..
        } = resolution.effect
        {
            self.outbound.extend(resolution.outbound);
            self.presentation.push(PresentationEvent::HealthChanged {
                id: resolution.target,
                health: new_health,
            });
            self.on_health_transition(resolution.target, previous_health, new_health);
        }
    }

    fn push_lobby_count(&mut self) {
        self.presentation.push(PresentationEvent::LobbyCount {
            players: self.registry.remote_count() + 1,
        });
    }

    fn push_weapon_status(&mut self) {
        let weapon = &self.registry.local().weapon;
        self.presentation.push(PresentationEvent::WeaponStatus {
            class: weapon.class(),
            ammo: weapon.ammo,
            reloading: weapon.is_reloading(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Aabb;
    use crate::session::{GameMode, Outcome};
    use crate::weapon::WeaponClass;
    use assert_approx_eq::assert_approx_eq;

    const LOCAL_ID: u32 = 2;

    fn game(mode: GameMode) -> Game {
        let config = SessionConfig {
            mode,
            ..SessionConfig::default()
        };
        let mut game = Game::with_geometry(LOCAL_ID, "me", &config, StaticGeometryIndex::new());
        game.registry_mut().local_mut().position = Vec3::ZERO;
        game.last_sent = (Vec3::ZERO, 0.0);
        game
    }

    fn join(game: &mut Game, id: u32, position: [f32; 3]) {
        game.handle_message(Message::Player(PlayerRecord {
            id,
            username: format!("p{}", id),
            position,
            rotation: 0.0,
            joined: true,
            left: false,
            health: MAX_HEALTH,
        }));
    }

    fn local_bullet(game: &mut Game, damage: i32, team: Option<Team>) -> BulletId {
        let muzzle = game.registry().local().muzzle();
        game.registry_mut().register_bullet(Bullet::new(
            muzzle,
            0.0,
            0.0,
            damage,
            80.0,
            team,
            Ownership::Local,
        ))
    }

    fn health_updates(messages: &[Message]) -> Vec<(u32, i32)> {
        messages
            .iter()
            .filter_map(|m| match m {
                Message::HealthUpdate { id, health } => Some((*id, *health)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_unobstructed_bullet_moves_by_velocity() {
        let mut game = game(GameMode::FreeForAll);
        let id = local_bullet(&mut game, 10, None);
        let before = game.registry().bullet(id).unwrap().clone();

        game.tick(0.016);

        let after = game.registry().bullet(id).unwrap();
        assert_eq!(after.position, before.position + before.velocity * 0.016);
        assert_approx_eq!(after.position.distance(before.position), 1.28, 1e-4);
        assert_approx_eq!(after.age, 0.016);
    }

    #[test]
    fn test_bullets_expire_after_lifetime() {
        let mut game = game(GameMode::FreeForAll);
        game.registry_mut().register_bullet(Bullet::new(
            Vec3::new(0.0, 10.0, 0.0),
            0.0,
            90.0,
            10,
            1.0,
            None,
            Ownership::Local,
        ));

        for _ in 0..200 {
            game.tick(0.016);
            assert!(game.registry().bullets().iter().all(|b| b.age <= 2.0));
        }
        assert!(game.registry().bullets().is_empty());
    }

    #[test]
    fn test_wall_retires_bullet() {
        let mut game = game(GameMode::FreeForAll);
        game.geometry = StaticGeometryIndex::with_boxes(vec![Aabb::new(
            Vec3::new(0.0, 1.5, 5.0),
            Vec3::new(3.0, 3.0, 0.5),
        )]);
        local_bullet(&mut game, 10, None);

        game.tick(0.1);
        assert!(game.registry().bullets().is_empty());

        let impacts = game
            .take_presentation()
            .into_iter()
            .filter(|e| matches!(e, PresentationEvent::Impact { .. }))
            .count();
        assert_eq!(impacts, 1);

        game.tick(0.1);
        assert!(game.take_presentation().is_empty());
    }

    #[test]
    fn test_local_hit_broadcasts_new_health() {
        let mut game = game(GameMode::FreeForAll);
        join(&mut game, 3, [0.0, 0.0, 10.0]);
        game.apply_action(&LocalAction::Start);
        local_bullet(&mut game, 20, None);

        game.tick(0.1);
        game.tick(0.1);

        assert_eq!(health_updates(&game.take_outbound()), vec![(3, 80)]);
        assert_eq!(game.registry().remote(3).unwrap().health, 80);
        assert!(game.registry().bullets().is_empty());

        game.tick(0.1);
        assert!(health_updates(&game.take_outbound()).is_empty());
    }

    #[test]
    fn test_friendly_fire_retires_bullet_without_damage() {
        let mut game = game(GameMode::TeamDeathmatch);
        // Id 3 plays red by default
        join(&mut game, 3, [0.0, 0.0, 10.0]);
        game.apply_action(&LocalAction::SetTeam(Some(Team::Red)));
        game.apply_action(&LocalAction::Start);
        game.take_outbound();

        assert!(game.apply_action(&LocalAction::Fire));
        assert_eq!(game.registry().bullets()[0].shooter_team, Some(Team::Red));

        game.tick(0.1);
        game.tick(0.1);

        assert_eq!(game.registry().remote(3).unwrap().health, MAX_HEALTH);
        assert!(game.registry().bullets().is_empty());
        assert!(health_updates(&game.take_outbound()).is_empty());
        assert!(game
            .take_presentation()
            .iter()
            .any(|e| matches!(e, PresentationEvent::Impact { .. })));
    }

    #[test]
    fn test_replica_bullet_is_cosmetic() {
        let mut game = game(GameMode::FreeForAll);
        join(&mut game, 3, [0.0, 0.0, 10.0]);
        game.take_presentation();

        game.handle_message(Message::Bullet(BulletRecord {
            position: [0.0, 1.5, -5.0],
            direction: 0.0,
            x_direction: 0.0,
            damage: 50,
            speed: 80.0,
        }));
        let events = game.take_presentation();
        assert!(events.iter().any(|e| matches!(e, PresentationEvent::ShotHeard { .. })));

        for _ in 0..5 {
            game.tick(0.1);
        }
        assert_eq!(game.registry().remote(3).unwrap().health, MAX_HEALTH);
        assert!(health_updates(&game.take_outbound()).is_empty());
    }

    #[test]
    fn test_inbound_kill_scores_once() {
        let mut game = game(GameMode::TeamDeathmatch);
        join(&mut game, 3, [0.0, 0.0, 10.0]);
        game.apply_action(&LocalAction::Start);

        game.handle_message(Message::HealthUpdate { id: 3, health: 0 });
        game.handle_message(Message::HealthUpdate { id: 3, health: -20 });

        assert_eq!(game.session().scores().blue, 1);
        assert_eq!(game.session().scores().red, 0);
        assert!(!game.registry().remote(3).unwrap().collidable);

        game.handle_message(Message::HealthUpdate { id: 3, health: 100 });
        assert!(game.registry().remote(3).unwrap().collidable);
        game.handle_message(Message::HealthUpdate { id: 3, health: 0 });
        assert_eq!(game.session().scores().blue, 2);
    }

    #[test]
    fn test_twenty_five_kills_reach_victory() {
        let mut game = game(GameMode::TeamDeathmatch);
        let red_ids: Vec<u32> = (0..25).map(|n| n * 2 + 1).collect();
        for &id in &red_ids {
            join(&mut game, id, [id as f32, 0.0, 30.0]);
        }
        game.apply_action(&LocalAction::Start);

        for &id in &red_ids {
            game.handle_message(Message::HealthUpdate { id, health: 0 });
            game.handle_message(Message::HealthUpdate { id, health: 0 });
        }

        assert_eq!(game.session().scores().blue, 25);
        assert_eq!(game.session().phase(), Phase::Victory);
        assert_eq!(game.session().outcome(), Some(Outcome::Win));

        let victories = game
            .take_presentation()
            .into_iter()
            .filter(|e| matches!(e, PresentationEvent::Victory { .. }))
            .count();
        assert_eq!(victories, 1);

        game.tick(3.1);
        assert_eq!(game.session().phase(), Phase::Lobby);
        assert_eq!(game.session().scores().blue, 0);
    }

    #[test]
    fn test_local_death_credited_once_in_round() {
        let mut game = game(GameMode::TeamDeathmatch);

        game.handle_message(Message::HealthUpdate {
            id: LOCAL_ID,
            health: -5,
        });
        game.tick(0.016);
        assert_eq!(game.session().scores().red, 0);

        game.apply_action(&LocalAction::Start);
        game.tick(0.016);
        game.tick(0.016);
        assert_eq!(game.session().scores().red, 1);
    }

    #[test]
    fn test_restart_is_deterministic_and_resets() {
        let mut a = game(GameMode::TeamDeathmatch);
        let mut b = game(GameMode::TeamDeathmatch);
        join(&mut a, 3, [0.0, 0.0, 10.0]);
        a.apply_action(&LocalAction::Start);
        a.handle_message(Message::HealthUpdate { id: 3, health: 0 });
        a.apply_action(&LocalAction::Pause);

        a.handle_message(Message::Restart { seed: 4242 });
        b.restart(Some(4242), false);

        assert_eq!(a.registry().local().position, b.registry().local().position);
        assert_eq!(a.session().scores().blue, 0);
        assert_eq!(a.session().phase(), Phase::Active);
        let enemy = a.registry().remote(3).unwrap();
        assert_eq!(enemy.health, MAX_HEALTH);
        assert!(enemy.collidable);
        assert!(a.take_outbound().iter().all(|m| !matches!(m, Message::Restart { .. })));
    }

    #[test]
    fn test_local_restart_announces_seed_and_position() {
        let mut game = game(GameMode::FreeForAll);
        game.apply_action(&LocalAction::Start);
        game.take_outbound();

        assert!(game.apply_action(&LocalAction::Restart));
        let outbound = game.take_outbound();
        assert_eq!(outbound.len(), 2);
        let Message::Restart { seed } = outbound[0] else {
            panic!("Expected restart first, got {:?}", outbound[0]);
        };
        let expected = SessionStateMachine::spawn_point(seed, LOCAL_ID);
        match &outbound[1] {
            Message::Player(record) => assert_eq!(Vec3::from(record.position), expected),
            other => panic!("Expected player record, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let mut game = game(GameMode::TeamDeathmatch);
        game.handle_message(Message::HealthUpdate { id: 99, health: 0 });
        game.handle_message(Message::Player(PlayerRecord {
            id: 98,
            username: "ghost".to_string(),
            position: [0.0; 3],
            rotation: 0.0,
            joined: false,
            left: false,
            health: 100,
        }));
        game.handle_message(Message::Player(PlayerRecord {
            id: 97,
            username: "gone".to_string(),
            position: [0.0; 3],
            rotation: 0.0,
            joined: false,
            left: true,
            health: 100,
        }));

        assert_eq!(game.registry().remote_count(), 0);
        assert!(game.take_presentation().is_empty());
        assert_eq!(game.session().scores().blue, 0);
    }

    #[test]
    fn test_drain_applies_in_order_and_stops_on_close() {
        let mut game = game(GameMode::FreeForAll);
        let (sender, mut queue) = NetworkEventQueue::channel();
        let record = PlayerRecord {
            id: 5,
            username: "p5".to_string(),
            position: [1.0, 1.0, 1.0],
            rotation: 0.0,
            joined: true,
            left: false,
            health: 100,
        };
        sender.push(InboundEvent::Message(Message::Player(record.clone())));
        sender.push(InboundEvent::Message(Message::Player(PlayerRecord {
            position: [2.0, 1.0, 2.0],
            joined: false,
            ..record.clone()
        })));
        sender.push(InboundEvent::Message(Message::Player(PlayerRecord {
            left: true,
            joined: false,
            ..record
        })));

        assert_eq!(game.drain_events(&mut queue), Ok(3));
        assert_eq!(game.registry().remote_count(), 0);

        sender.push(InboundEvent::RelayClosed);
        assert_eq!(game.drain_events(&mut queue), Err(SessionError::RelayClosed));
    }

    #[test]
    fn test_lobby_blocks_firing_and_sends() {
        let mut game = game(GameMode::FreeForAll);
        assert!(!game.apply_action(&LocalAction::Fire));
        assert!(!game.apply_action(&LocalAction::Move(Vec3::new(1.0, 0.0, 0.0))));

        game.tick(0.016);
        assert!(game.registry().bullets().is_empty());
        assert!(game.take_outbound().is_empty());
    }

    #[test]
    fn test_pause_freezes_input_but_not_bullets() {
        let mut game = game(GameMode::FreeForAll);
        game.apply_action(&LocalAction::Start);
        let id = local_bullet(&mut game, 10, None);
        game.apply_action(&LocalAction::Pause);

        assert!(!game.apply_action(&LocalAction::Fire));
        let before = game.registry().bullet(id).unwrap().position;
        game.tick(0.016);
        assert_ne!(game.registry().bullet(id).unwrap().position, before);
    }

    #[test]
    fn test_restart_from_pause_reports_phase_once() {
        fn phase_changes(events: &[PresentationEvent]) -> usize {
            events
                .iter()
                .filter(|e| matches!(e, PresentationEvent::PhaseChanged { phase: Phase::Active }))
                .count()
        }

        let mut game = game(GameMode::FreeForAll);
        game.apply_action(&LocalAction::Start);
        game.apply_action(&LocalAction::Pause);
        game.take_presentation();

        assert!(game.apply_action(&LocalAction::Restart));
        assert_eq!(game.session().phase(), Phase::Active);
        assert_eq!(phase_changes(&game.take_presentation()), 1);

        game.apply_action(&LocalAction::Pause);
        game.take_presentation();
        game.handle_message(Message::Restart { seed: 9 });
        assert_eq!(game.session().phase(), Phase::Active);
        assert_eq!(phase_changes(&game.take_presentation()), 1);
    }

    #[test]
    fn test_position_sent_only_on_change() {
        let mut game = game(GameMode::FreeForAll);
        game.apply_action(&LocalAction::Start);
        game.take_outbound();

        game.tick(0.016);
        assert!(game.take_outbound().is_empty());

        game.apply_action(&LocalAction::Move(Vec3::new(1.0, 0.0, 0.0)));
        game.tick(0.016);
        game.tick(0.016);
        let outbound = game.take_outbound();
        assert_eq!(outbound.len(), 1);
        assert!(matches!(outbound[0], Message::Player(_)));
    }

    #[test]
    fn test_held_trigger_auto_fires_rifle() {
        let mut game = game(GameMode::FreeForAll);
        game.apply_action(&LocalAction::SelectWeapon(WeaponClass::Rifle));
        game.apply_action(&LocalAction::Start);
        game.take_outbound();

        game.apply_action(&LocalAction::HoldTrigger);
        for _ in 0..10 {
            game.tick(0.05);
        }
        game.apply_action(&LocalAction::ReleaseTrigger);
        for _ in 0..10 {
            game.tick(0.05);
        }

        let shots = game
            .take_outbound()
            .iter()
            .filter(|m| matches!(m, Message::Bullet(_)))
            .count();
        // One shot on press, then one every 0.12s while held
        assert!((4..=6).contains(&shots), "unexpected shot count {}", shots);
        assert_eq!(game.registry().local().weapon.ammo, 30 - shots as u32);
    }
}
