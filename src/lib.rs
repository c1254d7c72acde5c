//! # driftfield
//!
//! An ambient, continuously animated field of flocking particles rendered
//! over a page or desktop background. Particles steer with boids-style
//! forces (cohesion, separation, alignment), wander gently, shy away from
//! the pointer and orbit hovered UI elements, all tinted by a slowly-easing
//! dominant color the host extracts from the current wallpaper.
//!
//! ## Quick Start
//!
//! ```ignore
//! use driftfield::{FieldConfig, FieldEngine, Vec3};
//!
//! // Host owns the window and the frame cadence.
//! let mut engine = FieldEngine::new(
//!     window,
//!     FieldConfig::new()
//!         .with_particle_count(80)
//!         .with_color(Vec3::new(0.4, 0.7, 1.0)),
//! );
//!
//! // Per animation frame:
//! engine.frame();
//!
//! // Fire-and-forget mutations, consumed on the next tick:
//! engine.set_pointer(x, y, is_down);
//! engine.set_color(Vec3::new(1.0, 0.5, 0.2));
//! engine.dispose();
//! ```
//!
//! ## Architecture
//!
//! - [`capability`] — device tier detection and particle budgets.
//! - [`particle`] — the particle records and the store/factory owning them.
//! - [`flocking`] — per-tick steering forces and motion integration.
//! - [`color`] — the shared dominant-color easing.
//! - [`gpu`] — shader program, vertex streams, the draw call.
//! - [`engine`] — lifecycle state machine and the update→render cadence.
//!
//! The simulation advances one fixed ~16.67 ms tick per frame while shader
//! time effects use the actual wall-clock timestamp. The population is
//! capped by viewport area and hardware tier (20–200 particles), and every
//! vertex stream is rebuilt wholesale each frame — small arrays, simple
//! code.

pub mod capability;
pub mod color;
pub mod engine;
pub mod error;
pub mod flocking;
pub mod gpu;
pub mod interaction;
pub mod particle;
pub mod window;

pub use capability::{CapabilityProvider, FixedTier, RendererHeuristic, Tier};
pub use color::SharedColor;
pub use engine::{EngineState, FieldConfig, FieldEngine};
pub use error::GpuError;
pub use flocking::FlockingSimulator;
pub use glam::{Vec2, Vec3};
pub use interaction::{HoverTarget, PointerState};
pub use particle::{Behavior, Particle, ParticleStore};
