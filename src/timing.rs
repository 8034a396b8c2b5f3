//! Fall timing for the active challenge. Stateless; the session feeds in the
//! current position and gets the next one back.

/// Position after falling for `dt` seconds at `velocity` units per second.
pub fn advance(position: f64, velocity: f64, dt: f64) -> f64 {
    position + velocity * dt
}

/// True once the sprite's bottom edge has passed `boundary`.
pub fn has_crossed_boundary(position: f64, sprite_extent: f64, boundary: f64) -> bool {
    position + sprite_extent > boundary
}
