//! Weapon classes and per-player fire/reload state

use rand::Rng;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum WeaponClass {
    #[default]
    Pistol,
    Rifle,
    Sniper,
}

/// Fixed characteristics of a weapon class.
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponSpec {
    pub mag_size: u32,
    /// Seconds to refill the magazine.
    pub reload_time: f32,
    /// Minimum seconds between shots.
    pub fire_interval: f32,
    pub damage: RangeInclusive<i32>,
    pub automatic: bool,
    pub bullet_speed: f32,
}

impl WeaponClass {
    pub fn spec(self) -> WeaponSpec {
        match self {
            WeaponClass::Pistol => WeaponSpec {
                mag_size: 12,
                reload_time: 2.3,
                fire_interval: 0.35,
                damage: 12..=22,
                automatic: false,
                bullet_speed: 80.0,
            },
            // About half the pistol's damage, but faster and a bigger mag
            WeaponClass::Rifle => WeaponSpec {
                mag_size: 30,
                reload_time: 2.0,
                fire_interval: 0.12,
                damage: 6..=11,
                automatic: true,
                bullet_speed: 95.0,
            },
            WeaponClass::Sniper => WeaponSpec {
                mag_size: 5,
                reload_time: 3.0,
                fire_interval: 2.4,
                damage: 55..=75,
                automatic: false,
                bullet_speed: 180.0,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Weapon {
    class: WeaponClass,
    spec: WeaponSpec,
    pub ammo: u32,
    reloading: bool,
    reload_timer: f32,
    cooldown: f32,
}

impl Weapon {
    pub fn new(class: WeaponClass) -> Self {
        let spec = class.spec();
        Self {
            class,
            ammo: spec.mag_size,
            spec,
            reloading: false,
            reload_timer: 0.0,
            cooldown: 0.0,
        }
    }

    pub fn class(&self) -> WeaponClass {
        self.class
    }

    pub fn spec(&self) -> &WeaponSpec {
        &self.spec
    }

    pub fn is_reloading(&self) -> bool {
        self.reloading
    }

    /// Switches class, resetting ammo and all timers.
    pub fn select(&mut self, class: WeaponClass) {
        *self = Weapon::new(class);
    }

    pub fn refill(&mut self) {
        self.ammo = self.spec.mag_size;
        self.reloading = false;
        self.reload_timer = 0.0;
        self.cooldown = 0.0;
    }

    pub fn can_fire(&self) -> bool {
        !self.reloading && self.ammo > 0 && self.cooldown <= 0.0
    }

    /// Books a shot: starts the cooldown, spends a round and begins a
    /// reload when the magazine runs dry.
    pub fn record_shot(&mut self) {
        self.cooldown = self.spec.fire_interval;
        if self.reloading || self.ammo == 0 {
            return;
        }
        self.ammo -= 1;
        if self.ammo == 0 {
            self.start_reload();
        }
    }

    /// Returns false when already reloading or the magazine is full.
    pub fn start_reload(&mut self) -> bool {
        if self.reloading || self.ammo == self.spec.mag_size {
            return false;
        }
        self.reloading = true;
        self.reload_timer = self.spec.reload_time;
        true
    }

    /// Advances timers. Returns true on the tick a reload completes.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.cooldown = (self.cooldown - dt).max(0.0);

        if self.reloading {
            self.reload_timer -= dt;
            if self.reload_timer <= 0.0 {
                self.reloading = false;
                self.ammo = self.spec.mag_size;
                return true;
            }
        }
        false
    }

    pub fn roll_damage<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        rng.gen_range(self.spec.damage.clone())
    }
}

impl Default for Weapon {
    fn default() -> Self {
        Self::new(WeaponClass::default())
    }
}
