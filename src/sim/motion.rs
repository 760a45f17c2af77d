//! Kinematic motion timing, shared verbatim by the elevator subsystem's
//! travel sleep and the scheduler's ETA estimate.
//!
//! The plateau branch below mixes units on purpose: `max_speed * time_to_top_speed`
//! is dimensionally a distance only if `time_to_top_speed` weren't already
//! `max_speed / acceleration` (seconds); the source carried this anomaly and
//! this implementation preserves it rather than silently substituting the
//! physically correct `time_to_top_speed + (delta - 0.5 * acceleration *
//! time_to_top_speed^2) / max_speed`. See the design notes for why.

use crate::config::BuildingParams;

/// Seconds of travel time to cover `delta` floors at the building's top
/// speed/acceleration, using the source formula (anomaly preserved).
pub fn travel_seconds(params: &BuildingParams, delta: u8) -> f64 {
    let delta = delta as f64;
    if delta == 0.0 {
        return 0.0;
    }
    let max_speed = params.max_speed;
    let acceleration = params.acceleration;
    let time_to_top_speed = params.time_to_top_speed();

    if 2.0 * time_to_top_speed >= delta / max_speed {
        (2.0 * delta / acceleration).sqrt()
    } else {
        time_to_top_speed + (delta - max_speed * time_to_top_speed) / max_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(max_speed: f64, acceleration: f64) -> BuildingParams {
        BuildingParams {
            max_speed,
            acceleration,
            ..BuildingParams::default()
        }
    }

    #[test]
    fn zero_delta_is_instant() {
        assert_eq!(travel_seconds(&params(1.0, 1.0), 0), 0.0);
    }

    #[test]
    fn short_hop_uses_sqrt_branch() {
        // time_to_top_speed = 1s; a 1-floor hop never reaches top speed.
        let t = travel_seconds(&params(1.0, 1.0), 1);
        assert!((t - (2.0f64).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn long_hop_uses_plateau_branch() {
        // V=1.71, A=0.182 matches scenario S5; delta=21 floors is long enough
        // to reach the plateau branch.
        let t = travel_seconds(&params(1.71, 0.182), 21);
        let time_to_top_speed = 1.71f64 / 0.182;
        assert!(2.0 * time_to_top_speed < 21.0 / 1.71);
        assert!(t > time_to_top_speed);
    }

    #[test]
    fn monotonic_in_delta() {
        let p = params(1.0, 0.5);
        let mut last = 0.0;
        for delta in 1..30u8 {
            let t = travel_seconds(&p, delta);
            assert!(t > last);
            last = t;
        }
    }
}
