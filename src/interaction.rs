//! Host-forwarded pointer and hover state.
//!
//! The engine never reads raw input events. The host UI forwards pointer
//! moves and hover enter/leave as plain field writes, and the simulator
//! consumes the state on its next tick.

use glam::Vec2;

/// Pixels around the pointer inside which particles are pushed away.
pub const POINTER_RADIUS: f32 = 100.0;
/// Pixels around a hover target inside which particles are deflected.
/// Intentionally distinct from [`POINTER_RADIUS`].
pub const HOVER_RADIUS: f32 = 120.0;

/// Pointer position, button state and per-tick velocity.
#[derive(Debug, Default, Clone, Copy)]
pub struct PointerState {
    pub position: Vec2,
    pub down: bool,
    /// Position delta over the last tick, sampled by [`PointerState::tick`].
    pub velocity: Vec2,
    last_position: Vec2,
}

impl PointerState {
    /// Host-forwarded pointer event.
    pub fn set(&mut self, x: f32, y: f32, down: bool) {
        self.position = Vec2::new(x, y);
        self.down = down;
    }

    /// Sample per-tick velocity from the position delta. Called once per
    /// simulation tick, before steering forces are computed.
    pub fn tick(&mut self) {
        self.velocity = self.position - self.last_position;
        self.last_position = self.position;
    }
}

/// Hover proximity to a UI element (e.g. a bookmark icon).
#[derive(Debug, Default, Clone, Copy)]
pub struct HoverTarget {
    pub position: Vec2,
    pub active: bool,
}

impl HoverTarget {
    pub fn set(&mut self, x: f32, y: f32, active: bool) {
        self.position = Vec2::new(x, y);
        self.active = active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_velocity_is_per_tick_delta() {
        let mut pointer = PointerState::default();
        pointer.set(10.0, 20.0, false);
        pointer.tick();
        assert_eq!(pointer.velocity, Vec2::new(10.0, 20.0));

        // Several host events between ticks collapse into one delta.
        pointer.set(12.0, 20.0, false);
        pointer.set(16.0, 24.0, true);
        pointer.tick();
        assert_eq!(pointer.velocity, Vec2::new(6.0, 4.0));
        assert!(pointer.down);
    }

    #[test]
    fn test_pointer_velocity_decays_when_idle() {
        let mut pointer = PointerState::default();
        pointer.set(50.0, 50.0, false);
        pointer.tick();
        pointer.tick();
        assert_eq!(pointer.velocity, Vec2::ZERO);
    }
}
