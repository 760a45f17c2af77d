//! Shared domain types for the building simulation: directions, requests,
//! faults, and the per-car state every subsystem reasons about.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Travel direction of a car, or the direction a call is requesting service in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Direction from `from` towards `to`. Defaults to `Up` when equal, matching
    /// the convention used for synthesized orphaned-stop requests.
    pub fn towards(from: u8, to: u8) -> Self {
        if to > from {
            Direction::Up
        } else {
            Direction::Down
        }
    }
}

/// Whether a request names a specific car (`Internal`, from a car's own
/// destination panel) or leaves dispatch open (`External`, a floor call).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Internal,
    External,
}

/// A call for service, either a floor call (external) or a destination
/// request originating at a car's own panel (internal).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub floor: u8,
    pub elevator_number: u8,
    pub direction: Direction,
    /// Seconds since the Unix epoch, matching the floor subsystem's scenario
    /// clock; not wall-clock precise, but monotonic with respect to the run.
    pub request_time: f64,
    pub request_type: RequestType,
}

impl Request {
    pub fn external(floor: u8, direction: Direction, request_time: f64) -> Self {
        Self {
            floor,
            elevator_number: 0,
            direction,
            request_time,
            request_type: RequestType::External,
        }
    }

    pub fn internal(floor: u8, elevator_number: u8, direction: Direction, request_time: f64) -> Self {
        Self {
            floor,
            elevator_number,
            direction,
            request_time,
            request_type: RequestType::Internal,
        }
    }
}

/// A simulated fault, scheduled by the floor subsystem or synthesized by the
/// scheduler's ETA watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    DoorIssue,
    Stuck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultEvent {
    pub kind: FaultKind,
    pub elevator_number: u8,
    pub scheduled_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorState {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Health {
    InService,
    OutOfService,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Motion {
    Idle,
    Moving,
    ServicingStop,
}

/// Seconds since the Unix epoch, as an `f64` so sub-second scenario timing
/// and sleep durations compose without an extra conversion layer.
pub fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_secs_f64()
}

/// Insert `floor` into `stops` keeping the no-duplicates, no-current-floor
/// invariant (Invariant 1 in the data model).
pub fn insert_stop(stops: &mut Vec<u8>, floor: u8, current_floor: u8) {
    if floor == current_floor {
        return;
    }
    if !stops.contains(&floor) {
        stops.push(floor);
    }
}

/// Reorder `stops` for the current sweep per the stop-ordering policy: from
/// `current_floor` traveling `direction`, visit same-direction stops first in
/// sweep order, then the remainder in the opposite sweep order.
pub fn order_stops(stops: &mut Vec<u8>, current_floor: u8, direction: Direction) {
    let (mut same_dir, mut opposite): (Vec<u8>, Vec<u8>) = match direction {
        Direction::Up => stops
            .iter()
            .copied()
            .partition(|&s| s >= current_floor),
        Direction::Down => stops
            .iter()
            .copied()
            .partition(|&s| s <= current_floor),
    };
    match direction {
        Direction::Up => {
            same_dir.sort_unstable();
            opposite.sort_unstable_by(|a, b| b.cmp(a));
        }
        Direction::Down => {
            same_dir.sort_unstable_by(|a, b| b.cmp(a));
            opposite.sort_unstable();
        }
    }
    same_dir.extend(opposite);
    *stops = same_dir;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_stop_drops_current_floor_and_duplicates() {
        let mut stops = vec![3, 5];
        insert_stop(&mut stops, 5, 2);
        assert_eq!(stops, vec![3, 5]);
        insert_stop(&mut stops, 2, 2);
        assert_eq!(stops, vec![3, 5]);
        insert_stop(&mut stops, 7, 2);
        assert_eq!(stops, vec![3, 5, 7]);
    }

    #[test]
    fn order_stops_up_visits_ascending_then_descending() {
        let mut stops = vec![1, 8, 4, 2];
        order_stops(&mut stops, 3, Direction::Up);
        assert_eq!(stops, vec![4, 8, 2, 1]);
    }

    #[test]
    fn order_stops_down_visits_descending_then_ascending() {
        let mut stops = vec![1, 8, 4, 2];
        order_stops(&mut stops, 3, Direction::Down);
        assert_eq!(stops, vec![2, 1, 4, 8]);
    }

    #[test]
    fn direction_towards_picks_down_on_tie() {
        assert_eq!(Direction::towards(4, 4), Direction::Down);
        assert_eq!(Direction::towards(4, 7), Direction::Up);
        assert_eq!(Direction::towards(7, 4), Direction::Down);
    }
}
