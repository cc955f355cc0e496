//! Damage authority for bullet impacts
//!
//! Every client judges only the hits of bullets it fired itself. Those hits
//! decrement the target's local health and yield a health update carrying
//! the new absolute value; replica bullets never change health.

use crate::ballistics::{is_headshot, RayHit, ENEMY_SCALE_Y};
use crate::entities::{Bullet, EntityRegistry, Teamable};
use log::debug;
use shared::Message;

pub const HEADSHOT_MULTIPLIER: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitEffect {
    Damaged {
        amount: i32,
        previous_health: i32,
        new_health: i32,
    },
    /// Shooter and target share a team; health is left untouched.
    FriendlyFire,
    /// Impact effect only: replica bullet, or a target that cannot take
    /// damage from this client.
    Cosmetic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub target: u32,
    pub headshot: bool,
    pub effect: HitEffect,
    /// Health update to broadcast, present only when damage was applied.
    pub outbound: Option<Message>,
}

#[derive(Debug, Clone)]
pub struct HitResolutionAuthority {
    headshot_multiplier: i32,
}

impl HitResolutionAuthority {
    pub fn new() -> Self {
        Self {
            headshot_multiplier: HEADSHOT_MULTIPLIER,
        }
    }

    /// Turns a dynamic hit into a damage decision.
    pub fn resolve(&self, bullet: &Bullet, hit: &RayHit, registry: &mut EntityRegistry) -> Resolution {
        let target = hit.target.entity;

        let Some(enemy) = registry.remote_mut(target) else {
            return Resolution {
                target,
                headshot: false,
                effect: HitEffect::Cosmetic,
                outbound: None,
            };
        };

        let headshot = is_headshot(hit.target.part, hit.point.y, enemy.position.y, ENEMY_SCALE_Y);

        if bullet.is_replica() {
            return Resolution {
                target,
                headshot,
                effect: HitEffect::Cosmetic,
                outbound: None,
            };
        }

        if let Some(shooter_team) = bullet.shooter_team {
            if enemy.team() == Some(shooter_team) {
                debug!("Friendly fire on {} suppressed", target);
                return Resolution {
                    target,
                    headshot,
                    effect: HitEffect::FriendlyFire,
                    outbound: None,
                };
            }
        }

        let amount = if headshot {
            bullet.damage * self.headshot_multiplier
        } else {
            bullet.damage
        };
        let previous_health = enemy.health;
        enemy.health -= amount;

        debug!(
            "Hit {} for {}{} ({} -> {})",
            target,
            amount,
            if headshot { " (headshot)" } else { "" },
            previous_health,
            enemy.health
        );

        Resolution {
            target,
            headshot,
            effect: HitEffect::Damaged {
                amount,
                previous_health,
                new_health: enemy.health,
            },
            outbound: Some(Message::HealthUpdate {
                id: target,
                health: enemy.health,
            }),
        }
    }
}

impl Default for HitResolutionAuthority {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballistics::{HitPart, TargetHandle};
    use crate::entities::{LocalPlayer, Ownership, Team};
    use shared::{PlayerRecord, Vec3};

    // Ids 3 (red) and 4 (blue) by the default team assignment
    fn registry() -> EntityRegistry {
        let mut registry = EntityRegistry::new(LocalPlayer::new(2, "me", Vec3::ZERO));
        for id in [3, 4] {
            registry.upsert_remote(&PlayerRecord {
                id,
                username: format!("p{}", id),
                position: [0.0, 0.0, 10.0],
                rotation: 0.0,
                joined: true,
                left: false,
                health: 100,
            });
        }
        registry
    }

    fn bullet(damage: i32, team: Option<Team>, ownership: Ownership) -> Bullet {
        Bullet::new(Vec3::ZERO, 0.0, 0.0, damage, 80.0, team, ownership)
    }

    fn hit(entity: u32, part: HitPart, y: f32) -> RayHit {
        RayHit {
            point: Vec3::new(0.0, y, 9.45),
            distance: 9.45,
            target: TargetHandle { entity, part },
        }
    }

    #[test]
    fn test_body_hit_applies_base_damage() {
        let mut registry = registry();
        let authority = HitResolutionAuthority::new();

        let resolution = authority.resolve(
            &bullet(15, None, Ownership::Local),
            &hit(3, HitPart::Body, 0.5),
            &mut registry,
        );

        assert!(!resolution.headshot);
        assert_eq!(
            resolution.effect,
            HitEffect::Damaged {
                amount: 15,
                previous_health: 100,
                new_health: 85
            }
        );
        assert_eq!(
            resolution.outbound,
            Some(Message::HealthUpdate { id: 3, health: 85 })
        );
        assert_eq!(registry.remote(3).unwrap().health, 85);
    }

    #[test]
    fn test_head_hitbox_doubles_damage() {
        let mut registry = registry();
        let authority = HitResolutionAuthority::new();

        let resolution = authority.resolve(
            &bullet(15, None, Ownership::Local),
            &hit(3, HitPart::Head, 1.5),
            &mut registry,
        );

        assert!(resolution.headshot);
        assert_eq!(registry.remote(3).unwrap().health, 70);
    }

    #[test]
    fn test_inferred_headshot_from_height() {
        let mut registry = registry();
        let authority = HitResolutionAuthority::new();

        let resolution = authority.resolve(
            &bullet(10, None, Ownership::Local),
            &hit(3, HitPart::Body, 1.7),
            &mut registry,
        );

        assert!(resolution.headshot);
        assert_eq!(registry.remote(3).unwrap().health, 80);
    }

    #[test]
    fn test_health_may_go_negative() {
        let mut registry = registry();
        registry.remote_mut(3).unwrap().health = 10;
        let authority = HitResolutionAuthority::new();

        let resolution = authority.resolve(
            &bullet(60, None, Ownership::Local),
            &hit(3, HitPart::Body, 0.0),
            &mut registry,
        );

        assert_eq!(
            resolution.outbound,
            Some(Message::HealthUpdate { id: 3, health: -50 })
        );
    }

    #[test]
    fn test_friendly_fire_leaves_health_unchanged() {
        let mut registry = registry();
        let authority = HitResolutionAuthority::new();

        let resolution = authority.resolve(
            &bullet(20, Some(Team::Blue), Ownership::Local),
            &hit(4, HitPart::Head, 2.0),
            &mut registry,
        );

        assert_eq!(resolution.effect, HitEffect::FriendlyFire);
        assert!(resolution.outbound.is_none());
        assert_eq!(registry.remote(4).unwrap().health, 100);
    }

    #[test]
    fn test_opposing_team_takes_damage() {
        let mut registry = registry();
        let authority = HitResolutionAuthority::new();

        authority.resolve(
            &bullet(20, Some(Team::Blue), Ownership::Local),
            &hit(3, HitPart::Body, 0.0),
            &mut registry,
        );

        assert_eq!(registry.remote(3).unwrap().health, 80);
    }

    #[test]
    fn test_replica_is_cosmetic() {
        let mut registry = registry();
        let authority = HitResolutionAuthority::new();

        let resolution = authority.resolve(
            &bullet(20, None, Ownership::Replica),
            &hit(3, HitPart::Head, 2.0),
            &mut registry,
        );

        assert_eq!(resolution.effect, HitEffect::Cosmetic);
        assert!(resolution.outbound.is_none());
        assert_eq!(registry.remote(3).unwrap().health, 100);
    }

    #[test]
    fn test_local_player_is_not_a_damage_target() {
        let mut registry = registry();
        let authority = HitResolutionAuthority::new();

        let resolution = authority.resolve(
            &bullet(20, None, Ownership::Local),
            &hit(2, HitPart::Body, 1.0),
            &mut registry,
        );

        assert_eq!(resolution.effect, HitEffect::Cosmetic);
        assert_eq!(registry.local().health, 100);
    }
}
