//! Engine lifecycle and the per-frame update→render cadence.
//!
//! The engine owns one animation session: the particle store, the flocking
//! simulator, the shared color and the GPU pipeline. The host drives it by
//! calling [`FieldEngine::frame`] from its animation-frame callback and
//! mutates it through synchronous, fire-and-forget setters consumed on the
//! next tick. Everything runs on one thread; no locking is needed.
//!
//! Lifecycle: `Uninitialized → Initializing → Running → Disposed`. A failed
//! initialization (no GPU adapter, shader rejected) moves to the terminal
//! `Disabled` state instead: logged once, no simulation, no drawing, no
//! retry. Recovery means constructing a new engine.

use std::sync::Arc;
use std::time::Instant;

use glam::Vec3;
use winit::window::Window;

use crate::capability::{self, CapabilityProvider, FixedTier, RendererHeuristic, Tier};
use crate::color::SharedColor;
use crate::flocking::FlockingSimulator;
use crate::gpu::FieldPipeline;
use crate::interaction::{HoverTarget, PointerState};
use crate::particle::ParticleStore;

/// Engine lifecycle states. `Disabled` and `Disposed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Running,
    Disabled,
    Disposed,
}

/// Host-supplied configuration, consumed at construction.
#[derive(Debug, Clone)]
pub struct FieldConfig {
    pub particle_count: usize,
    pub color: Vec3,
    pub global_opacity: f32,
    pub tier_override: Option<Tier>,
}

impl FieldConfig {
    pub fn new() -> Self {
        Self {
            particle_count: 80,
            color: Vec3::new(0.55, 0.75, 0.95),
            global_opacity: 1.0,
            tier_override: None,
        }
    }

    /// Configured particle count, before device budgeting.
    pub fn with_particle_count(mut self, count: usize) -> Self {
        self.particle_count = count;
        self
    }

    /// Initial dominant color, linear RGB in [0, 1].
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    pub fn with_global_opacity(mut self, opacity: f32) -> Self {
        self.global_opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Skip renderer-string tier detection and use a fixed tier.
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier_override = Some(tier);
        self
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One particle-field animation session.
pub struct FieldEngine {
    state: EngineState,
    pipeline: Option<FieldPipeline>,
    store: ParticleStore,
    simulator: FlockingSimulator,
    color: SharedColor,
    pointer: PointerState,
    hover: HoverTarget,
    tier: Tier,
    configured_count: usize,
    visible: bool,
    global_opacity: f32,
    start: Instant,
}

impl FieldEngine {
    /// Bring up the GPU pipeline, profile the device and build the initial
    /// population. On GPU failure the engine is returned in the `Disabled`
    /// state with the cause logged once.
    pub fn new(window: Arc<Window>, config: FieldConfig) -> Self {
        // Uninitialized and Initializing both live inside this constructor;
        // callers only ever observe Running, Disabled or Disposed.
        let size = window.inner_size();
        let (width, height) = (size.width as f32, size.height as f32);

        let pipeline = match FieldPipeline::new(window, config.particle_count) {
            Ok(p) => Some(p),
            Err(e) => {
                log::error!("particle field disabled: {e}");
                None
            }
        };

        let tier = match (&pipeline, config.tier_override) {
            (_, Some(tier)) => FixedTier(tier).detect_tier(),
            (Some(p), None) => RendererHeuristic::new(p.renderer_name()).detect_tier(),
            (None, None) => Tier::Low,
        };

        let color = SharedColor::new(config.color);
        let mut store = ParticleStore::new(width, height, tier);

        let state = if pipeline.is_some() {
            let count = capability::target_count(config.particle_count, width, height, tier, true);
            store.initialize(count, color.current);
            log::info!(
                "particle field running: tier {:?}, {} of {} configured particles",
                tier,
                count,
                config.particle_count
            );
            EngineState::Running
        } else {
            EngineState::Disabled
        };

        Self {
            state,
            pipeline,
            store,
            simulator: FlockingSimulator::new(),
            color,
            pointer: PointerState::default(),
            hover: HoverTarget::default(),
            tier,
            configured_count: config.particle_count,
            visible: true,
            global_opacity: config.global_opacity,
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn state(&self) -> EngineState {
        self.state
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    /// Live particle count after device budgeting.
    pub fn particle_count(&self) -> usize {
        self.store.len()
    }

    /// One frame: advance the simulation by exactly one fixed tick, ease the
    /// shared color, then draw with the actual elapsed wall-clock timestamp.
    /// Simulation stepping and shader-time effects are deliberately
    /// decoupled.
    pub fn frame(&mut self) {
        if self.state != EngineState::Running {
            return;
        }

        self.pointer.tick();
        self.simulator.step(&mut self.store, &self.pointer, &self.hover);
        self.color.step();
        self.color.apply(&mut self.store);

        let elapsed = self.start.elapsed().as_secs_f32();
        let pipeline = match self.pipeline.as_mut() {
            Some(p) => p,
            None => return,
        };
        match pipeline.render(&self.store, elapsed, self.global_opacity, self.visible) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                // Common during window resizes; reconfigure and skip the frame.
                pipeline.reconfigure();
            }
            Err(wgpu::SurfaceError::Timeout) => {}
            Err(e) => {
                log::error!("particle field disabled mid-session: {e}");
                self.pipeline = None;
                self.state = EngineState::Disabled;
            }
        }
    }

    /// Set the target dominant color; the current color eases toward it over
    /// the following ticks.
    pub fn set_color(&mut self, color: Vec3) {
        self.color.target = color;
    }

    /// Change the configured particle count. The live population is resized
    /// to the device-budgeted value on the spot.
    pub fn set_particle_count(&mut self, count: usize) {
        self.configured_count = count;
        self.retarget_population();
    }

    /// Toggle global visibility. An invisible field keeps animating with a
    /// reduced population and a damped breathing amplitude.
    pub fn set_visibility(&mut self, visible: bool) {
        self.visible = visible;
        self.retarget_population();
    }

    /// Host-forwarded pointer event, in canvas pixel coordinates.
    pub fn set_pointer(&mut self, x: f32, y: f32, down: bool) {
        self.pointer.set(x, y, down);
    }

    /// Host-forwarded hover enter/leave for a UI element.
    pub fn set_hover_target(&mut self, x: f32, y: f32, active: bool) {
        self.hover.set(x, y, active);
    }

    /// The caller must forward viewport resizes before the next tick.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.store.set_viewport(width as f32, height as f32);
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.resize(width, height);
        }
        self.retarget_population();
    }

    /// End the session: no further frames are simulated or drawn, then GPU
    /// program, buffers and the particle array are released. Idempotent.
    pub fn dispose(&mut self) {
        if self.state == EngineState::Disposed {
            return;
        }
        // Flip the state first so a frame callback racing disposal in the
        // host's queue becomes a no-op before resources go away.
        self.state = EngineState::Disposed;
        self.pipeline = None;
        self.store.resize(0, self.color.current);
        self.color = SharedColor::new(self.color.target);
        log::debug!("particle field disposed");
    }

    fn retarget_population(&mut self) {
        if self.state != EngineState::Running {
            return;
        }
        let count = capability::target_count(
            self.configured_count,
            self.store.width(),
            self.store.height(),
            self.tier,
            self.visible,
        );
        self.store.resize(count, self.color.current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = FieldConfig::default();
        assert_eq!(config.particle_count, 80);
        assert_eq!(config.global_opacity, 1.0);
        assert!(config.tier_override.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = FieldConfig::new()
            .with_particle_count(120)
            .with_color(Vec3::new(1.0, 0.0, 0.0))
            .with_global_opacity(2.5)
            .with_tier(Tier::Medium);
        assert_eq!(config.particle_count, 120);
        assert_eq!(config.color, Vec3::new(1.0, 0.0, 0.0));
        // Opacity is clamped into [0, 1].
        assert_eq!(config.global_opacity, 1.0);
        assert_eq!(config.tier_override, Some(Tier::Medium));
    }
}
