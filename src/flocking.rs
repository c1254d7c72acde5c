//! Boids-style steering forces and motion integration.
//!
//! Each tick, every active particle accumulates a steering force from six
//! weighted terms: cohesion, separation, alignment, wander, pointer
//! influence and hover influence. The force is added to the velocity and
//! the velocity to the position, with a toroidal wrap at the viewport edges.
//!
//! Each steering term clamps its own contribution; no clamp is applied to
//! the integrated total. Neighbor relationships are recomputed from scratch
//! every tick against the live array, so particles early in the array see
//! partially-updated neighbors — the emergent motion does not care.
//!
//! The render loop advances the simulation by exactly one fixed ~16.67 ms
//! tick per frame regardless of wall-clock time; all steering constants are
//! expressed per tick, so no dt appears in the integration.

use glam::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::interaction::{HoverTarget, PointerState, HOVER_RADIUS, POINTER_RADIUS};
use crate::particle::{Particle, ParticleStore};

/// Toroidal wrap margin in pixels on all four viewport edges.
pub const WRAP_MARGIN: f32 = 50.0;

const COHESION_WEIGHT: f32 = 1.0;
const SEPARATION_WEIGHT: f32 = 1.5;
const ALIGNMENT_WEIGHT: f32 = 0.5;
const WANDER_WEIGHT: f32 = 0.8;

/// Wander is a fresh random deviation from the particle's phase angle every
/// tick, not a persistent heading.
const WANDER_JITTER: f32 = 0.15;
const WANDER_MAGNITUDE: f32 = 0.1;

const POINTER_STRENGTH_DOWN: f32 = 0.5;
const POINTER_STRENGTH_UP: f32 = 0.2;
const POINTER_VELOCITY_SHARE: f32 = 0.1;
const HOVER_STRENGTH: f32 = 0.2;

/// Computes steering forces and integrates particle motion.
pub struct FlockingSimulator {
    rng: SmallRng,
}

impl FlockingSimulator {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    /// Deterministic simulator for tests and benchmarks.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Advance the simulation by one fixed tick.
    pub fn step(&mut self, store: &mut ParticleStore, pointer: &PointerState, hover: &HoverTarget) {
        let width = store.width();
        let height = store.height();

        for i in 0..store.particles.len() {
            if !store.particles[i].active {
                continue;
            }

            let force = {
                let particles = &store.particles;
                let p = &particles[i];
                cohesion(particles, i) * COHESION_WEIGHT
                    + separation(particles, i) * SEPARATION_WEIGHT
                    + alignment(particles, i) * ALIGNMENT_WEIGHT
                    + self.wander(p) * WANDER_WEIGHT
                    + pointer_influence(p, pointer)
                    + hover_influence(p, hover)
            };

            let p = &mut store.particles[i];
            p.velocity += force;
            p.position += p.velocity;
            wrap(&mut p.position, width, height);
        }
    }

    /// Small directional nudge at a fresh random deviation from the phase
    /// angle. Recomputed stochastically every tick.
    fn wander(&mut self, p: &Particle) -> Vec2 {
        let angle = p.phase + self.rng.gen_range(-WANDER_JITTER..WANDER_JITTER);
        Vec2::new(angle.cos(), angle.sin()) * WANDER_MAGNITUDE
    }
}

impl Default for FlockingSimulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Seek the centroid of neighbors within the cohesion radius. Zero vector
/// when no neighbor is in range.
fn cohesion(particles: &[Particle], index: usize) -> Vec2 {
    let p = &particles[index];
    let mut centroid = Vec2::ZERO;
    let mut count = 0u32;

    for (j, other) in particles.iter().enumerate() {
        if j == index || !other.active {
            continue;
        }
        if p.position.distance(other.position) < p.behavior.cohesion_radius {
            centroid += other.position;
            count += 1;
        }
    }

    if count == 0 {
        return Vec2::ZERO;
    }
    centroid /= count as f32;
    steer_toward(p, centroid - p.position)
}

/// Inverse-distance-weighted repulsion from neighbors within the separation
/// radius. Pairs at exactly zero distance are excluded.
fn separation(particles: &[Particle], index: usize) -> Vec2 {
    let p = &particles[index];
    let mut push = Vec2::ZERO;
    let mut count = 0u32;

    for (j, other) in particles.iter().enumerate() {
        if j == index || !other.active {
            continue;
        }
        let d = p.position.distance(other.position);
        if d > 0.0 && d < p.behavior.separation_radius {
            push += (p.position - other.position).normalize_or_zero() / d;
            count += 1;
        }
    }

    if count == 0 {
        return Vec2::ZERO;
    }
    steer_toward(p, push)
}

/// Match the average velocity of neighbors within the alignment radius.
/// Unlike the other terms this one is not capped by max_force.
fn alignment(particles: &[Particle], index: usize) -> Vec2 {
    let p = &particles[index];
    let mut avg_velocity = Vec2::ZERO;
    let mut count = 0u32;

    for (j, other) in particles.iter().enumerate() {
        if j == index || !other.active {
            continue;
        }
        if p.position.distance(other.position) < p.behavior.alignment_radius {
            avg_velocity += other.velocity;
            count += 1;
        }
    }

    if count == 0 {
        return Vec2::ZERO;
    }
    avg_velocity /= count as f32;
    avg_velocity.normalize_or_zero() * p.behavior.max_speed - p.velocity
}

/// Normalize the desired direction to max_speed, subtract the current
/// velocity, cap the result at max_force.
fn steer_toward(p: &Particle, desired: Vec2) -> Vec2 {
    let desired = desired.normalize_or_zero() * p.behavior.max_speed;
    (desired - p.velocity).clamp_length_max(p.behavior.max_force)
}

/// Repulsion away from the pointer, stronger while the button is down, plus
/// a 10% share of the pointer's per-tick velocity. A particle exactly at the
/// pointer position gets no contribution: the direction is undefined there,
/// so the term is skipped rather than inventing one.
fn pointer_influence(p: &Particle, pointer: &PointerState) -> Vec2 {
    let offset = p.position - pointer.position;
    let d = offset.length();
    if d > POINTER_RADIUS || d <= f32::EPSILON {
        return Vec2::ZERO;
    }
    let strength = (1.0 - d / POINTER_RADIUS)
        * if pointer.down {
            POINTER_STRENGTH_DOWN
        } else {
            POINTER_STRENGTH_UP
        };
    (offset / d) * strength + pointer.velocity * POINTER_VELOCITY_SHARE
}

/// Tangential push around an active hover target, producing an orbiting
/// deflection rather than attraction or repulsion. Skipped at zero distance
/// for the same reason as the pointer term.
fn hover_influence(p: &Particle, hover: &HoverTarget) -> Vec2 {
    if !hover.active {
        return Vec2::ZERO;
    }
    let offset = p.position - hover.position;
    let d = offset.length();
    if d > HOVER_RADIUS || d <= f32::EPSILON {
        return Vec2::ZERO;
    }
    let radial = offset / d;
    let tangent = Vec2::new(-radial.y, radial.x);
    tangent * (1.0 - d / HOVER_RADIUS) * HOVER_STRENGTH
}

/// Toroidal wrap: a particle exceeding `dimension + margin` reappears at
/// `-margin`, and vice versa.
fn wrap(position: &mut Vec2, width: f32, height: f32) {
    if position.x > width + WRAP_MARGIN {
        position.x = -WRAP_MARGIN;
    } else if position.x < -WRAP_MARGIN {
        position.x = width + WRAP_MARGIN;
    }
    if position.y > height + WRAP_MARGIN {
        position.y = -WRAP_MARGIN;
    } else if position.y < -WRAP_MARGIN {
        position.y = height + WRAP_MARGIN;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Tier;
    use glam::Vec3;

    fn store_with(count: usize) -> ParticleStore {
        let mut s = ParticleStore::with_seed(800.0, 600.0, Tier::High, 11);
        s.initialize(count, Vec3::ONE);
        s
    }

    fn assert_finite(store: &ParticleStore) {
        for (i, p) in store.particles.iter().enumerate() {
            assert!(p.position.is_finite(), "particle {i} position {:?}", p.position);
            assert!(p.velocity.is_finite(), "particle {i} velocity {:?}", p.velocity);
        }
    }

    #[test]
    fn test_boundary_invariant_holds_after_every_tick() {
        let mut store = store_with(60);
        let mut sim = FlockingSimulator::with_seed(1);
        let pointer = PointerState::default();
        let hover = HoverTarget::default();

        for _ in 0..200 {
            sim.step(&mut store, &pointer, &hover);
            for p in &store.particles {
                assert!(p.position.x >= -WRAP_MARGIN && p.position.x <= 800.0 + WRAP_MARGIN);
                assert!(p.position.y >= -WRAP_MARGIN && p.position.y <= 600.0 + WRAP_MARGIN);
            }
        }
    }

    #[test]
    fn test_lone_particle_gets_zero_neighbor_forces() {
        let store = store_with(1);
        assert_eq!(cohesion(&store.particles, 0), Vec2::ZERO);
        assert_eq!(separation(&store.particles, 0), Vec2::ZERO);
        assert_eq!(alignment(&store.particles, 0), Vec2::ZERO);
    }

    #[test]
    fn test_out_of_range_neighbors_are_ignored() {
        let mut store = store_with(2);
        store.particles[0].position = Vec2::new(0.0, 0.0);
        store.particles[1].position = Vec2::new(500.0, 500.0);
        assert_eq!(cohesion(&store.particles, 0), Vec2::ZERO);
        assert_eq!(separation(&store.particles, 0), Vec2::ZERO);
        assert_eq!(alignment(&store.particles, 0), Vec2::ZERO);
    }

    #[test]
    fn test_cohesion_and_separation_respect_max_force() {
        let mut store = store_with(8);
        // Cluster everything tightly so both terms fire.
        for (i, p) in store.particles.iter_mut().enumerate() {
            p.position = Vec2::new(100.0 + i as f32 * 3.0, 100.0);
        }
        for i in 0..store.len() {
            let max_force = store.particles[i].behavior.max_force;
            assert!(cohesion(&store.particles, i).length() <= max_force + 1e-5);
            assert!(separation(&store.particles, i).length() <= max_force + 1e-5);
        }
    }

    #[test]
    fn test_coincident_pair_is_excluded_from_separation() {
        let mut store = store_with(2);
        store.particles[0].position = Vec2::new(200.0, 200.0);
        store.particles[1].position = Vec2::new(200.0, 200.0);

        // The zero-distance pair contributes nothing, so with only that pair
        // in range the term is the zero vector and never NaN.
        let force = separation(&store.particles, 0);
        assert_eq!(force, Vec2::ZERO);
        assert!(force.is_finite());
    }

    #[test]
    fn test_pointer_exactly_on_particle_is_guarded() {
        let mut store = store_with(5);
        let target = store.particles[0].position;
        let mut pointer = PointerState::default();
        pointer.set(target.x, target.y, true);
        pointer.tick();

        let mut sim = FlockingSimulator::with_seed(2);
        for _ in 0..10 {
            sim.step(&mut store, &pointer, &HoverTarget::default());
        }
        assert_finite(&store);
    }

    #[test]
    fn test_pointer_pushes_particles_away() {
        let mut store = store_with(1);
        store.particles[0].position = Vec2::new(400.0, 300.0);
        store.particles[0].velocity = Vec2::ZERO;

        let mut pointer = PointerState::default();
        pointer.set(390.0, 300.0, false);

        let force = pointer_influence(&store.particles[0], &pointer);
        // Pointer is to the left, push points right.
        assert!(force.x > 0.0);
        assert_eq!(force.y, 0.0);
    }

    #[test]
    fn test_pointer_down_pushes_harder() {
        let mut store = store_with(1);
        store.particles[0].position = Vec2::new(400.0, 300.0);

        let mut up = PointerState::default();
        up.set(390.0, 300.0, false);
        let mut down = up;
        down.down = true;

        let weak = pointer_influence(&store.particles[0], &up).length();
        let strong = pointer_influence(&store.particles[0], &down).length();
        assert!(strong > weak);
    }

    #[test]
    fn test_hover_push_is_tangential() {
        let mut store = store_with(1);
        store.particles[0].position = Vec2::new(450.0, 300.0);

        let mut hover = HoverTarget::default();
        hover.set(400.0, 300.0, true);

        let force = hover_influence(&store.particles[0], &hover);
        assert!(force.length() > 0.0);
        // Perpendicular to the radial direction (+x here).
        assert!(force.x.abs() < 1e-6);

        hover.active = false;
        assert_eq!(hover_influence(&store.particles[0], &hover), Vec2::ZERO);
    }

    #[test]
    fn test_wrap_reenters_at_opposite_margin() {
        let mut store = store_with(1);
        store.particles[0].position = Vec2::new(800.0 + WRAP_MARGIN + 5.0, -WRAP_MARGIN - 5.0);
        store.particles[0].velocity = Vec2::ZERO;

        let mut sim = FlockingSimulator::with_seed(3);
        sim.step(&mut store, &PointerState::default(), &HoverTarget::default());

        let p = &store.particles[0];
        assert!(p.position.x <= 800.0 + WRAP_MARGIN);
        assert!(p.position.y >= -WRAP_MARGIN);
    }

    #[test]
    fn test_inactive_particles_do_not_move_or_steer_others() {
        let mut store = store_with(3);
        store.particles[2].active = false;
        let frozen = store.particles[2].position;

        let mut sim = FlockingSimulator::with_seed(4);
        for _ in 0..20 {
            sim.step(&mut store, &PointerState::default(), &HoverTarget::default());
        }
        assert_eq!(store.particles[2].position, frozen);
    }
}
