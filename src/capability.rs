//! Device capability profiling and particle budgets.
//!
//! The field scales its particle population to the rendering hardware: a
//! coarse performance tier is derived from the GPU renderer identifier
//! string, and the tier drives both a density-based ceiling and a budget
//! factor applied to the host-configured count.
//!
//! Tier detection via name substrings is a brittle heuristic tightly coupled
//! to vendor marketing strings, so it lives behind the [`CapabilityProvider`]
//! trait. Alternate strategies (feature probing, an explicit benchmark, a
//! user override via [`FixedTier`]) can be substituted without touching the
//! simulator or the pipeline.

/// Coarse rendering-hardware classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    High,
    Medium,
    Low,
}

impl Tier {
    /// Particles per square pixel of viewport for this tier.
    fn density(self) -> f32 {
        match self {
            Tier::High => 1.0e-4,
            Tier::Medium => 0.7e-4,
            Tier::Low => 0.4e-4,
        }
    }

    /// Multiplier applied to the configured particle count.
    fn budget_factor(self) -> f32 {
        match self {
            Tier::High => 1.0,
            Tier::Medium => 0.8,
            Tier::Low => 0.5,
        }
    }

    /// Base sprite size in pixels for particles spawned on this tier.
    pub(crate) fn base_size(self) -> f32 {
        match self {
            Tier::High => 2.5,
            Tier::Medium => 2.0,
            Tier::Low => 1.5,
        }
    }
}

/// Strategy for classifying the rendering hardware.
pub trait CapabilityProvider {
    fn detect_tier(&self) -> Tier;
}

/// Default provider: substring matching on the GPU renderer identifier
/// string (e.g. `wgpu::AdapterInfo::name`). Falls back to [`Tier::Low`] when
/// the string matches nothing known.
pub struct RendererHeuristic {
    renderer: String,
}

const HIGH_TIER_MARKERS: &[&str] = &["nvidia", "geforce", "rtx", "radeon rx", "apple m"];
const MEDIUM_TIER_MARKERS: &[&str] = &["intel", "iris", "radeon", "adreno", "mali"];

impl RendererHeuristic {
    pub fn new(renderer: &str) -> Self {
        Self {
            renderer: renderer.to_lowercase(),
        }
    }
}

impl CapabilityProvider for RendererHeuristic {
    fn detect_tier(&self) -> Tier {
        if HIGH_TIER_MARKERS.iter().any(|m| self.renderer.contains(m)) {
            Tier::High
        } else if MEDIUM_TIER_MARKERS.iter().any(|m| self.renderer.contains(m)) {
            Tier::Medium
        } else {
            Tier::Low
        }
    }
}

/// Provider that always reports a fixed tier. Backs the config override.
pub struct FixedTier(pub Tier);

impl CapabilityProvider for FixedTier {
    fn detect_tier(&self) -> Tier {
        self.0
    }
}

/// Hard floor and ceiling on the density-derived particle budget.
const MIN_PARTICLES: usize = 20;
const MAX_PARTICLES: usize = 200;

/// Ceiling on the particle count for a viewport of the given size.
pub fn max_particle_count(width: f32, height: f32, tier: Tier) -> usize {
    let by_area = (width * height * tier.density()).floor() as usize;
    by_area.clamp(MIN_PARTICLES, MAX_PARTICLES)
}

/// Scale the host-configured count to the device budget.
///
/// The configured count is first capped by `max`, then scaled by the tier
/// budget factor, then reduced a further 40% when the field is not visible.
/// The result is truncated, so it is monotonic non-increasing across tiers
/// and across visibility loss for fixed inputs.
pub fn adjusted_count(configured: usize, max: usize, tier: Tier, visible: bool) -> usize {
    let base = configured.min(max) as f32;
    let mut scaled = base * tier.budget_factor();
    if !visible {
        scaled *= 0.6;
    }
    scaled as usize
}

/// Convenience composition of [`max_particle_count`] and [`adjusted_count`].
pub fn target_count(configured: usize, width: f32, height: f32, tier: Tier, visible: bool) -> usize {
    adjusted_count(
        configured,
        max_particle_count(width, height, tier),
        tier,
        visible,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_tier_from_renderer_string() {
        let cases = [
            ("NVIDIA GeForce RTX 4070", Tier::High),
            ("AMD Radeon RX 6800 XT", Tier::High),
            ("Apple M2 Pro", Tier::High),
            ("Intel(R) Iris(R) Xe Graphics", Tier::Medium),
            ("Adreno (TM) 650", Tier::Medium),
            ("llvmpipe (LLVM 15.0.7, 256 bits)", Tier::Low),
            ("", Tier::Low),
        ];
        for (name, expected) in cases {
            assert_eq!(
                RendererHeuristic::new(name).detect_tier(),
                expected,
                "renderer {name:?}"
            );
        }
    }

    #[test]
    fn test_fixed_tier_override() {
        assert_eq!(FixedTier(Tier::Medium).detect_tier(), Tier::Medium);
    }

    #[test]
    fn test_max_count_clamped_to_floor_and_ceiling() {
        // Tiny viewport hits the floor regardless of tier.
        assert_eq!(max_particle_count(100.0, 100.0, Tier::High), 20);
        // Large viewport hits the ceiling.
        assert_eq!(max_particle_count(3840.0, 2160.0, Tier::High), 200);
    }

    #[test]
    fn test_adjusted_count_scenario_full_hd_high_visible() {
        // 1920x1080, High, configured 80, visible.
        let max = max_particle_count(1920.0, 1080.0, Tier::High);
        let n = adjusted_count(80, max, Tier::High, true);
        assert_eq!(n, 80.min(max));
        assert_eq!(n, 80);
    }

    #[test]
    fn test_adjusted_count_scenario_hidden_is_60_percent() {
        let max = max_particle_count(1920.0, 1080.0, Tier::High);
        let visible = adjusted_count(80, max, Tier::High, true);
        let hidden = adjusted_count(80, max, Tier::High, false);
        assert_eq!(hidden, (visible as f32 * 0.6) as usize);
        assert_eq!(hidden, 48);
    }

    #[test]
    fn test_tier_monotonicity() {
        for &(w, h) in &[(800.0, 600.0), (1920.0, 1080.0), (2560.0, 1440.0)] {
            for configured in [10, 50, 80, 150, 500] {
                let high = target_count(configured, w, h, Tier::High, true);
                let medium = target_count(configured, w, h, Tier::Medium, true);
                let low = target_count(configured, w, h, Tier::Low, true);
                assert!(high >= medium && medium >= low, "{w}x{h} n={configured}");
            }
        }
    }

    #[test]
    fn test_visibility_loss_never_increases_count() {
        for configured in [20, 80, 200] {
            let shown = target_count(configured, 1920.0, 1080.0, Tier::Medium, true);
            let hidden = target_count(configured, 1920.0, 1080.0, Tier::Medium, false);
            assert!(hidden <= shown);
        }
    }
}
