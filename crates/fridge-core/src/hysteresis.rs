//! Bang-bang control policy.
//!
//! Two-state hysteresis with no deadband: the actuator switches exactly
//! at the crossing of the target temperature. A reading equal to the
//! target never changes the actuator state.

/// Actuator change requested by one evaluation of the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    /// Turn the cooler on
    On,
    /// Turn the cooler off
    Off,
    /// Leave the actuator as it is
    Hold,
}

impl Switch {
    /// Returns the commanded actuator level, if any.
    pub fn level(self) -> Option<bool> {
        match self {
            Switch::On => Some(true),
            Switch::Off => Some(false),
            Switch::Hold => None,
        }
    }
}

/// Evaluates the policy for one control tick.
///
/// Too warm with the cooler off turns it on; too cold with the cooler on
/// turns it off. Every other combination, including equality, holds.
pub fn decide(current: f32, target: f32, actuator_on: bool) -> Switch {
    if current > target && !actuator_on {
        Switch::On
    } else if current < target && actuator_on {
        Switch::Off
    } else {
        Switch::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_target_with_cooler_off_holds() {
        assert_eq!(decide(5.0, 10.0, false), Switch::Hold);
    }

    #[test]
    fn test_above_target_with_cooler_off_turns_on() {
        assert_eq!(decide(15.0, 10.0, false), Switch::On);
    }

    #[test]
    fn test_below_target_with_cooler_on_turns_off() {
        assert_eq!(decide(5.0, 10.0, true), Switch::Off);
    }

    #[test]
    fn test_above_target_with_cooler_on_holds() {
        assert_eq!(decide(15.0, 10.0, true), Switch::Hold);
    }

    #[test]
    fn test_equality_never_switches() {
        assert_eq!(decide(10.0, 10.0, false), Switch::Hold);
        assert_eq!(decide(10.0, 10.0, true), Switch::Hold);
    }

    #[test]
    fn test_nan_reading_holds() {
        assert_eq!(decide(f32::NAN, 10.0, false), Switch::Hold);
        assert_eq!(decide(f32::NAN, 10.0, true), Switch::Hold);
    }

    #[test]
    fn test_switch_level() {
        assert_eq!(Switch::On.level(), Some(true));
        assert_eq!(Switch::Off.level(), Some(false));
        assert_eq!(Switch::Hold.level(), None);
    }
}
