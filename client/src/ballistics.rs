//! Per-tick bullet sweep against static boxes and dynamic hitboxes
//!
//! Static geometry comes from the [`StaticGeometryIndex`]; moving targets are
//! queried through a [`RayCaster`], so any backend that honours its contract
//! can stand in for the built-in [`HitboxRayCaster`].

use crate::entities::EntityRegistry;
use crate::geometry::{Aabb, StaticGeometryIndex};
use shared::Vec3;

/// Vertical scale applied to remote player models.
pub const ENEMY_SCALE_Y: f32 = 2.2;
/// Head centre height in model units, before vertical scaling.
pub const HEAD_HEIGHT: f32 = 0.82;
/// Slack below the head centre that still counts as a headshot.
pub const HEADSHOT_TOLERANCE: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitPart {
    Head,
    Body,
}

/// Opaque handle identifying what a ray struck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetHandle {
    pub entity: u32,
    pub part: HitPart,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub distance: f32,
    pub target: TargetHandle,
}

/// Ray query against dynamic entity hitboxes.
///
/// Given an origin, a unit direction, a maximum distance and handles to
/// skip, returns the nearest hit within range or `None`.
pub trait RayCaster {
    fn ray_cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        ignore: &[TargetHandle],
    ) -> Option<RayHit>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    pub bounds: Aabb,
    pub target: TargetHandle,
}

/// Body and head boxes of a remote player standing at `base`.
pub fn enemy_hitboxes(id: u32, base: Vec3) -> [Hitbox; 2] {
    let body = Hitbox {
        bounds: Aabb::from_size(
            base + Vec3::new(0.0, -0.1 * ENEMY_SCALE_Y, 0.0),
            Vec3::new(1.1, 1.95 * ENEMY_SCALE_Y, 1.1),
        ),
        target: TargetHandle {
            entity: id,
            part: HitPart::Body,
        },
    };
    let head = Hitbox {
        bounds: Aabb::from_size(
            base + Vec3::new(0.0, HEAD_HEIGHT * ENEMY_SCALE_Y, 0.0),
            Vec3::new(0.45, 0.5 * ENEMY_SCALE_Y, 0.45),
        ),
        target: TargetHandle {
            entity: id,
            part: HitPart::Head,
        },
    };
    [body, head]
}

/// Collision box of the local player standing at `base`.
pub fn local_hitbox(id: u32, base: Vec3) -> Hitbox {
    Hitbox {
        bounds: Aabb::new(base + Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.5, 1.0, 0.5)),
        target: TargetHandle {
            entity: id,
            part: HitPart::Body,
        },
    }
}

/// Headshot test for a hit point on a target whose base sits at `base_y`.
///
/// A direct head hit always counts; otherwise the impact height is compared
/// against the head height minus a tolerance band.
pub fn is_headshot(part: HitPart, hit_y: f32, base_y: f32, scale_y: f32) -> bool {
    part == HitPart::Head || hit_y >= base_y + HEAD_HEIGHT * scale_y - HEADSHOT_TOLERANCE
}

/// Ray caster over a snapshot of entity hitboxes.
#[derive(Debug, Clone, Default)]
pub struct HitboxRayCaster {
    hitboxes: Vec<Hitbox>,
}

impl HitboxRayCaster {
    pub fn new(hitboxes: Vec<Hitbox>) -> Self {
        Self { hitboxes }
    }

    /// Snapshots every collidable remote player, plus the local player when
    /// it is taking part in the round.
    pub fn from_registry(registry: &EntityRegistry, include_local: bool) -> Self {
        let mut hitboxes: Vec<Hitbox> = registry
            .remotes()
            .filter(|enemy| enemy.collidable && enemy.is_alive())
            .flat_map(|enemy| enemy_hitboxes(enemy.id, enemy.position))
            .collect();

        let local = registry.local();
        if include_local && local.is_alive() {
            hitboxes.push(local_hitbox(local.id, local.position));
        }

        Self { hitboxes }
    }

    pub fn hitboxes(&self) -> &[Hitbox] {
        &self.hitboxes
    }
}

impl RayCaster for HitboxRayCaster {
    fn ray_cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        ignore: &[TargetHandle],
    ) -> Option<RayHit> {
        let end = origin + direction * max_distance;

        self.hitboxes
            .iter()
            .filter(|hitbox| !ignore.contains(&hitbox.target))
            .filter_map(|hitbox| {
                hitbox
                    .bounds
                    .segment_intersection(origin, end)
                    .map(|t| (t, hitbox.target))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(t, target)| RayHit {
                point: origin + direction * (t * max_distance),
                distance: t * max_distance,
                target,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Obstruction {
    Static { point: Vec3, distance: f32 },
    Dynamic(RayHit),
}

impl Obstruction {
    pub fn point(&self) -> Vec3 {
        match self {
            Obstruction::Static { point, .. } => *point,
            Obstruction::Dynamic(hit) => hit.point,
        }
    }

    pub fn distance(&self) -> f32 {
        match self {
            Obstruction::Static { distance, .. } => *distance,
            Obstruction::Dynamic(hit) => hit.distance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SweepOutcome {
    /// Nothing to sweep this tick; the bullet stays put.
    Stationary,
    Clear,
    Blocked(Obstruction),
}

pub struct BallisticSweep<'a, R: RayCaster + ?Sized> {
    statics: &'a StaticGeometryIndex,
    caster: &'a R,
}

impl<'a, R: RayCaster + ?Sized> BallisticSweep<'a, R> {
    pub fn new(statics: &'a StaticGeometryIndex, caster: &'a R) -> Self {
        Self { statics, caster }
    }

    /// Finds the first obstruction along `origin + direction * distance`.
    ///
    /// `direction` must be a unit vector. A zero distance is reported as
    /// [`SweepOutcome::Stationary`] rather than a miss. On equal distances a
    /// dynamic hit wins over a wall.
    pub fn sweep(
        &self,
        origin: Vec3,
        direction: Vec3,
        distance: f32,
        ignore: &[TargetHandle],
    ) -> SweepOutcome {
        if distance <= 0.0 {
            return SweepOutcome::Stationary;
        }

        let end = origin + direction * distance;
        let wall = self
            .statics
            .first_hit(origin, end)
            .map(|hit| Obstruction::Static {
                point: hit.point,
                distance: hit.distance,
            });
        let body = self
            .caster
            .ray_cast(origin, direction, distance, ignore)
            .map(Obstruction::Dynamic);

        match (wall, body) {
            (Some(w), Some(b)) if w.distance() < b.distance() => SweepOutcome::Blocked(w),
            (_, Some(b)) => SweepOutcome::Blocked(b),
            (Some(w), None) => SweepOutcome::Blocked(w),
            (None, None) => SweepOutcome::Clear,
        }
    }
}
