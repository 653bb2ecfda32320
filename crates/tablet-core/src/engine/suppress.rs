//! Suppression of samples that did not change enough to be worth reporting.

use crate::domain::tool::ToolState;

/// Full turn of a puck's rotation, in tenths of a degree.
const ROTATION_RANGE: i32 = 1800;

/// Returns `true` when `cur` is close enough to `prev` to be dropped.
///
/// A sample passes (is *not* suppressed) when the buttons or proximity
/// changed, or when x, y, pressure, rotation or wheel moved by at least
/// `threshold`.  A wheel change of exactly one always passes so single
/// scroll ticks are never lost, even with a threshold above one.
///
/// Samples from a different tool or serial than `prev` always pass.
pub fn should_suppress(prev: &ToolState, cur: &ToolState, threshold: i32) -> bool {
    if prev.tool != cur.tool || prev.serial != cur.serial {
        return false;
    }
    if prev.buttons != cur.buttons || prev.proximity != cur.proximity {
        return false;
    }
    if (prev.x - cur.x).abs() >= threshold
        || (prev.y - cur.y).abs() >= threshold
        || (prev.pressure - cur.pressure).abs() >= threshold
    {
        return false;
    }
    if (ROTATION_RANGE + prev.rotation - cur.rotation).rem_euclid(ROTATION_RANGE) >= threshold
        && (ROTATION_RANGE + cur.rotation - prev.rotation).rem_euclid(ROTATION_RANGE) >= threshold
    {
        return false;
    }

    let wheel = (prev.wheel - cur.wheel).abs();
    if wheel >= threshold || wheel == 1 {
        return false;
    }

    true
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tool::ToolType;

    fn state() -> ToolState {
        ToolState {
            tool: Some(ToolType::Cursor),
            serial: 3,
            proximity: true,
            x: 5000,
            y: 4000,
            pressure: 10,
            buttons: 0,
            rotation: 900,
            wheel: 20,
            ..ToolState::default()
        }
    }

    #[test]
    fn test_identical_state_is_suppressed() {
        let s = state();
        assert!(should_suppress(&s, &s, 1));
        assert!(should_suppress(&s, &s, 50));
    }

    #[test]
    fn test_small_motion_is_suppressed() {
        let cur = ToolState { x: 5001, y: 4001, ..state() };
        assert!(should_suppress(&state(), &cur, 2));
    }

    #[test]
    fn test_motion_at_threshold_passes() {
        let cur = ToolState { x: 5002, ..state() };
        assert!(!should_suppress(&state(), &cur, 2));
    }

    #[test]
    fn test_button_change_always_passes() {
        let cur = ToolState { buttons: 1, ..state() };
        assert!(!should_suppress(&state(), &cur, 100));
    }

    #[test]
    fn test_proximity_change_always_passes() {
        let cur = ToolState { proximity: false, ..state() };
        assert!(!should_suppress(&state(), &cur, 100));
    }

    #[test]
    fn test_single_wheel_tick_passes_any_threshold() {
        let up = ToolState { wheel: 21, ..state() };
        let down = ToolState { wheel: 19, ..state() };
        assert!(!should_suppress(&state(), &up, 10));
        assert!(!should_suppress(&state(), &down, 10));
    }

    #[test]
    fn test_two_wheel_ticks_below_threshold_are_suppressed() {
        let cur = ToolState { wheel: 22, ..state() };
        assert!(should_suppress(&state(), &cur, 10));
    }

    #[test]
    fn test_rotation_wraps_around_full_turn() {
        // 1795 and 5 are 10 tenths apart across the wrap point
        let prev = ToolState { rotation: 1795, ..state() };
        let near = ToolState { rotation: 5, ..state() };
        assert!(should_suppress(&prev, &near, 20));
        assert!(!should_suppress(&prev, &near, 5));
    }

    #[test]
    fn test_different_tool_passes() {
        let cur = ToolState { tool: Some(ToolType::Stylus), ..state() };
        assert!(!should_suppress(&state(), &cur, 100));
    }
}
