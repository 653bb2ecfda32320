//! Button bitmask diffing.
//!
//! Bit `n - 1` of a mask set means button `n` is held.

use crate::domain::device::MAX_BUTTONS;

/// One press or release of a physical button (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonTransition {
    pub button: u16,
    pub pressed: bool,
}

/// Returns a transition for every button whose state differs between `old`
/// and `new`, in ascending button order.
pub fn diff(old: u16, new: u16) -> Vec<ButtonTransition> {
    let changed = old ^ new;
    (1..=MAX_BUTTONS as u16)
        .filter(|b| changed & mask(*b) != 0)
        .map(|button| ButtonTransition {
            button,
            pressed: new & mask(button) != 0,
        })
        .collect()
}

/// Applies `transitions` to `state`, returning the resulting button state.
pub fn apply(mut state: u16, transitions: &[ButtonTransition]) -> u16 {
    for t in transitions {
        if t.pressed {
            state |= mask(t.button);
        } else {
            state &= !mask(t.button);
        }
    }
    state
}

fn mask(button: u16) -> u16 {
    1 << (button - 1)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_of_equal_masks_is_empty() {
        assert!(diff(0b1011, 0b1011).is_empty());
    }

    #[test]
    fn test_diff_reports_press_and_release_in_ascending_order() {
        // Button 1 released, button 3 pressed
        let transitions = diff(0b001, 0b100);
        assert_eq!(
            transitions,
            vec![
                ButtonTransition { button: 1, pressed: false },
                ButtonTransition { button: 3, pressed: true },
            ]
        );
    }

    #[test]
    fn test_diff_covers_button_sixteen() {
        let transitions = diff(0, 0x8000);
        assert_eq!(transitions, vec![ButtonTransition { button: 16, pressed: true }]);
    }

    #[test]
    fn test_apply_reproduces_new_mask() {
        let old = 0b1010_0000_0000_0110;
        let new = 0b0010_0000_1000_0011;
        assert_eq!(apply(old, &diff(old, new)), new);
    }

    #[test]
    fn test_release_all_produces_one_release_per_held_button() {
        let transitions = diff(0b0101, 0);
        assert_eq!(transitions.len(), 2);
        assert!(transitions.iter().all(|t| !t.pressed));
    }
}
