//! Shared dominant-color animation.
//!
//! The host supplies a target color (extracted elsewhere from the current
//! wallpaper); the engine eases the shared current color toward it and
//! copies the result into every particle each tick. Particles share one
//! global, slowly-shifting hue rather than individual colors.
//!
//! The color pair is an explicit struct owned by the engine instance, so
//! multiple engines can coexist without interference.

use glam::Vec3;

use crate::particle::ParticleStore;

/// Per-tick easing factor toward the target color.
const EASE: f32 = 0.02;

/// Current and target dominant color, both linear RGB in [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct SharedColor {
    pub current: Vec3,
    pub target: Vec3,
}

impl SharedColor {
    pub fn new(initial: Vec3) -> Self {
        Self {
            current: initial,
            target: initial,
        }
    }

    /// Move each channel 2% of the remaining distance toward the target.
    /// The residual error shrinks geometrically with ratio 0.98 per tick.
    pub fn step(&mut self) {
        self.current += (self.target - self.current) * EASE;
    }

    /// Copy the current color verbatim into every particle.
    pub fn apply(&self, store: &mut ParticleStore) {
        for p in &mut store.particles {
            p.color = self.current;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Tier;

    #[test]
    fn test_residual_shrinks_geometrically() {
        let mut color = SharedColor::new(Vec3::ZERO);
        color.target = Vec3::ONE;

        let mut residual = (color.target - color.current).x.abs();
        for _ in 0..50 {
            color.step();
            let next = (color.target - color.current).x.abs();
            assert!((next - residual * 0.98).abs() < 1e-6);
            residual = next;
        }
    }

    #[test]
    fn test_converges_within_300_ticks() {
        // setColor((1,0,0)) then 300 ticks. 0.98^300 ≈ 2.3e-3, so a warm
        // starting hue within 0.4 per channel lands under 1e-3.
        let mut color = SharedColor::new(Vec3::new(0.8, 0.2, 0.1));
        color.target = Vec3::new(1.0, 0.0, 0.0);
        for _ in 0..300 {
            color.step();
        }
        let residual = color.target - color.current;
        assert!(residual.x.abs() < 1e-3);
        assert!(residual.y.abs() < 1e-3);
        assert!(residual.z.abs() < 1e-3);
    }

    #[test]
    fn test_apply_copies_into_every_particle() {
        let mut store = ParticleStore::with_seed(800.0, 600.0, Tier::Low, 3);
        store.initialize(20, Vec3::ZERO);

        let mut color = SharedColor::new(Vec3::new(0.3, 0.6, 0.9));
        color.apply(&mut store);
        for p in &store.particles {
            assert_eq!(p.color, Vec3::new(0.3, 0.6, 0.9));
        }
    }
}
