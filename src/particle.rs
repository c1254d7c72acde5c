//! Particle records and the store that owns them.
//!
//! Particles are ephemeral: created by the factory at init or on count
//! growth, destroyed by tail truncation on shrink or on disposal. They never
//! reference each other; all inter-particle relationships are recomputed
//! transiently each tick by the simulator.

use glam::{Vec2, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

use crate::capability::Tier;

// Per-instance steering parameter ranges, in canvas pixels and px/tick.
// Tier-independent; the tier only scales the population and sprite size.
const COHESION_RADIUS_MIN: f32 = 60.0;
const COHESION_RADIUS_MAX: f32 = 120.0;
const SEPARATION_RADIUS_MIN: f32 = 20.0;
const SEPARATION_RADIUS_MAX: f32 = 40.0;
const ALIGNMENT_RADIUS_MIN: f32 = 40.0;
const ALIGNMENT_RADIUS_MAX: f32 = 80.0;
const MAX_SPEED_MIN: f32 = 0.5;
const MAX_SPEED_MAX: f32 = 1.5;
const MAX_FORCE_MIN: f32 = 0.02;
const MAX_FORCE_MAX: f32 = 0.06;

/// Initial velocity magnitude per axis.
const SPAWN_SPEED: f32 = 0.25;
/// Random addition to the tier base sprite size.
const SIZE_JITTER: f32 = 1.5;
const OPACITY_MIN: f32 = 0.4;
const OPACITY_MAX: f32 = 0.9;

/// Per-instance steering behavior, randomized at creation.
#[derive(Debug, Clone, Copy)]
pub struct Behavior {
    pub cohesion_radius: f32,
    pub separation_radius: f32,
    pub alignment_radius: f32,
    pub max_speed: f32,
    pub max_force: f32,
}

/// One visual dot in the field.
#[derive(Debug, Clone)]
pub struct Particle {
    /// Position in canvas pixel space.
    pub position: Vec2,
    pub velocity: Vec2,
    /// Current sprite size in pixels. Always > 0.
    pub size: f32,
    pub original_size: f32,
    /// Always within [0, 1].
    pub opacity: f32,
    /// Linear RGB, each channel in [0, 1].
    pub color: Vec3,
    /// Random angle used for breathing and wander. In [0, 2π).
    pub phase: f32,
    pub active: bool,
    pub behavior: Behavior,
}

/// Owns the live particle array and the factory that fills it.
pub struct ParticleStore {
    pub particles: Vec<Particle>,
    width: f32,
    height: f32,
    tier: Tier,
    rng: SmallRng,
}

impl ParticleStore {
    pub fn new(width: f32, height: f32, tier: Tier) -> Self {
        Self {
            particles: Vec::new(),
            width,
            height,
            tier,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Deterministic store for tests and benchmarks.
    pub fn with_seed(width: f32, height: f32, tier: Tier, seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            width,
            height,
            tier,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// The caller must update the stored dimensions before the next tick;
    /// GPU buffers need no explicit resize since they are rebuilt per frame.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    /// Factory for a single particle. `color` is the shared current color at
    /// creation time.
    pub fn create_particle(&mut self, color: Vec3) -> Particle {
        let rng = &mut self.rng;
        let size = self.tier.base_size() + rng.gen_range(0.0..SIZE_JITTER);
        Particle {
            position: Vec2::new(
                rng.gen_range(0.0..self.width),
                rng.gen_range(0.0..self.height),
            ),
            velocity: Vec2::new(
                rng.gen_range(-SPAWN_SPEED..SPAWN_SPEED),
                rng.gen_range(-SPAWN_SPEED..SPAWN_SPEED),
            ),
            size,
            original_size: size,
            opacity: rng.gen_range(OPACITY_MIN..OPACITY_MAX),
            color,
            phase: rng.gen_range(0.0..TAU),
            active: true,
            behavior: Behavior {
                cohesion_radius: rng.gen_range(COHESION_RADIUS_MIN..COHESION_RADIUS_MAX),
                separation_radius: rng.gen_range(SEPARATION_RADIUS_MIN..SEPARATION_RADIUS_MAX),
                alignment_radius: rng.gen_range(ALIGNMENT_RADIUS_MIN..ALIGNMENT_RADIUS_MAX),
                max_speed: rng.gen_range(MAX_SPEED_MIN..MAX_SPEED_MAX),
                max_force: rng.gen_range(MAX_FORCE_MIN..MAX_FORCE_MAX),
            },
        }
    }

    /// Build exactly `count` particles, replacing any existing population.
    pub fn initialize(&mut self, count: usize, color: Vec3) {
        self.particles.clear();
        self.particles.reserve(count);
        for _ in 0..count {
            let p = self.create_particle(color);
            self.particles.push(p);
        }
    }

    /// Grow by appending freshly-created particles, or shrink by truncating
    /// the tail. Truncation discards the most-recently-added particles, not
    /// a weighted subset; this is a deliberate simplification.
    pub fn resize(&mut self, new_count: usize, color: Vec3) {
        if new_count > self.particles.len() {
            let missing = new_count - self.particles.len();
            self.particles.reserve(missing);
            for _ in 0..missing {
                let p = self.create_particle(color);
                self.particles.push(p);
            }
        } else {
            self.particles.truncate(new_count);
        }
    }
}
