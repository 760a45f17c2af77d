//! The floor subsystem: scenario driver and per-floor call lamp matrix.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{NaiveTime, Timelike};
use tokio::net::UdpSocket;
use tokio::time::sleep;

use crate::config::BuildingConfig;
use crate::error::ScenarioError;
use crate::net::priority_queue::{spawn_udp_receiver, PriorityQueue};
use crate::net::wire::Message;
use crate::net::{loopback, send};
use crate::sim::model::{Direction, FaultEvent, FaultKind, Request, RequestType};

/// Grace period at startup before the scenario clock starts, giving peer
/// subsystems time to bind their sockets.
const STARTUP_GRACE: Duration = Duration::from_millis(300);
const TICK: Duration = Duration::from_millis(50);

/// Parse a scenario file into its two chronologically sorted sequences.
///
/// Call record: `HH:MM:SS.mmm floor UP|DOWN elevatorNumber INTERNAL|EXTERNAL`.
/// Fault record: `HH:MM:SS.mmm floor DOOR_ISSUE|ELEVATOR_STUCK`.
pub fn parse_scenario(text: &str) -> Result<(VecDeque<Request>, VecDeque<FaultEvent>), ScenarioError> {
    let mut calls = Vec::new();
    let mut faults = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if !matches!(tokens.len(), 3 | 4 | 5) {
            return Err(ScenarioError::TooFewFields {
                line,
                found: tokens.len(),
            });
        }
        let time = parse_timestamp(tokens[0], line)?;
        let floor = parse_floor(tokens[1], line)?;

        match tokens.len() {
            3 => {
                let kind = parse_fault_kind(tokens[2], line)?;
                faults.push(FaultEvent {
                    kind,
                    elevator_number: floor,
                    scheduled_time: time,
                });
            }
            5 => {
                let direction = parse_direction(tokens[2], line)?;
                let elevator_number: u8 = tokens[3]
                    .parse()
                    .map_err(|_| ScenarioError::IncompleteCall { line })?;
                let request_type = parse_request_type(tokens[4], line)?;
                calls.push(match request_type {
                    RequestType::Internal => {
                        Request::internal(floor, elevator_number, direction, time)
                    }
                    RequestType::External => {
                        let req = Request::external(floor, direction, time);
                        Request { elevator_number, ..req }
                    }
                });
            }
            4 => return Err(ScenarioError::IncompleteCall { line }),
            _ => unreachable!("arity checked above"),
        }
    }

    calls.sort_by(|a, b| a.request_time.partial_cmp(&b.request_time).unwrap());
    faults.sort_by(|a, b| a.scheduled_time.partial_cmp(&b.scheduled_time).unwrap());
    Ok((calls.into(), faults.into()))
}

/// Parses `HH:MM:SS.mmm` into seconds since midnight. The scenario clock
/// treats this as an elapsed offset from each subsystem's own startup, not a
/// literal wall-clock time-of-day, matching the example scenarios' use of
/// `00:00:00.000` to mean "immediately".
fn parse_timestamp(value: &str, line: usize) -> Result<f64, ScenarioError> {
    let time = NaiveTime::parse_from_str(value, "%H:%M:%S%.f").map_err(|e| ScenarioError::BadTimestamp {
        line,
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    Ok(time.num_seconds_from_midnight() as f64 + time.nanosecond() as f64 / 1_000_000_000.0)
}

fn parse_floor(value: &str, line: usize) -> Result<u8, ScenarioError> {
    value
        .parse()
        .map_err(|_| ScenarioError::BadFloor { line, value: value.to_string() })
}

fn parse_direction(value: &str, line: usize) -> Result<Direction, ScenarioError> {
    match value {
        "UP" => Ok(Direction::Up),
        "DOWN" => Ok(Direction::Down),
        other => Err(ScenarioError::UnknownKind { line, value: other.to_string() }),
    }
}

fn parse_request_type(value: &str, line: usize) -> Result<RequestType, ScenarioError> {
    match value {
        "INTERNAL" => Ok(RequestType::Internal),
        "EXTERNAL" => Ok(RequestType::External),
        other => Err(ScenarioError::UnknownKind { line, value: other.to_string() }),
    }
}

fn parse_fault_kind(value: &str, line: usize) -> Result<FaultKind, ScenarioError> {
    match value {
        "DOOR_ISSUE" => Ok(FaultKind::DoorIssue),
        "ELEVATOR_STUCK" => Ok(FaultKind::Stuck),
        other => Err(ScenarioError::UnknownKind { line, value: other.to_string() }),
    }
}

pub struct Floor {
    config: BuildingConfig,
    socket: Arc<UdpSocket>,
    queue: PriorityQueue,
    pending_calls: VecDeque<Request>,
    pending_faults: VecDeque<FaultEvent>,
    /// `lamps[floor][car]`, `true` when the call lamp is lit.
    lamps: Vec<Vec<bool>>,
    start_time: f64,
}

impl Floor {
    pub async fn bind(config: BuildingConfig, scenario_path: &str) -> Result<Self> {
        let text = tokio::fs::read_to_string(scenario_path).await?;
        let (pending_calls, pending_faults) = parse_scenario(&text)?;

        let addr = loopback(config.network.floor_port);
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        let queue = PriorityQueue::new(config.building.max_queue);
        spawn_udp_receiver(socket.clone(), queue.clone());

        let lamps = vec![vec![false; config.building.elevators as usize]; config.building.floors as usize];

        Ok(Self {
            config,
            socket,
            queue,
            pending_calls,
            pending_faults,
            lamps,
            start_time: 0.0,
        })
    }

    fn scheduler_addr(&self) -> SocketAddr {
        loopback(self.config.network.scheduler_port)
    }

    fn viz_addr(&self) -> SocketAddr {
        loopback(self.config.network.visualization_port)
    }

    pub async fn run(&mut self) -> Result<()> {
        sleep(STARTUP_GRACE).await;
        self.start_time = crate::sim::model::now_seconds();
        log::info!(
            "floor subsystem listening on {}, {} pending calls, {} pending faults",
            loopback(self.config.network.floor_port),
            self.pending_calls.len(),
            self.pending_faults.len(),
        );
        loop {
            if !self.queue.is_empty().await {
                let (bytes, src) = self.queue.poll().await;
                self.handle_datagram(&bytes, src).await;
            } else {
                self.emit_due().await;
                sleep(TICK).await;
            }
        }
    }

    async fn handle_datagram(&mut self, bytes: &[u8], src: SocketAddr) {
        let msg = match Message::decode(bytes) {
            Ok(m) => m,
            Err(e) => {
                log::debug!("floor: dropping malformed datagram from {}: {}", src, e);
                return;
            }
        };
        match msg {
            Message::ElevatorArrival { car, floor } => {
                self.set_lamp(floor, car, false);
                send(&self.socket, &Message::ElevatorArrival { car, floor }, self.viz_addr()).await;
            }
            Message::RequestElevator { car, floor } => {
                self.set_lamp(floor, car, true);
                send(&self.socket, &Message::RequestElevator { car, floor }, self.viz_addr()).await;
            }
            other => {
                log::debug!("floor: unexpected inbound message {:?}", other);
            }
        }
    }

    fn set_lamp(&mut self, floor: u8, car: u8, on: bool) {
        if let Some(row) = self.lamps.get_mut(floor as usize) {
            if let Some(lamp) = row.get_mut(car as usize) {
                *lamp = on;
            }
        }
    }

    async fn emit_due(&mut self) {
        let elapsed = crate::sim::model::now_seconds() - self.start_time;

        if let Some(call) = self.pending_calls.front() {
            if call.request_time <= elapsed {
                let call = self.pending_calls.pop_front().unwrap();
                send(&self.socket, &Message::Req(call), self.scheduler_addr()).await;
                return;
            }
        }

        if let Some(fault) = self.pending_faults.front() {
            if fault.scheduled_time <= elapsed {
                let fault = self.pending_faults.pop_front().unwrap();
                let msg = match fault.kind {
                    FaultKind::DoorIssue => Message::DoorIssue { car: fault.elevator_number },
                    FaultKind::Stuck => Message::Stuck { car: fault.elevator_number },
                };
                send(&self.socket, &msg, self.scheduler_addr()).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_call_and_one_fault() {
        let text = "00:00:00.000 3 UP 0 EXTERNAL\n00:00:01.500 1 DOOR_ISSUE\n";
        let (calls, faults) = parse_scenario(text).expect("parse");
        assert_eq!(calls.len(), 1);
        assert_eq!(faults.len(), 1);
        assert_eq!(calls[0].floor, 3);
        assert_eq!(calls[0].direction, Direction::Up);
        assert_eq!(calls[0].request_type, RequestType::External);
        assert_eq!(faults[0].kind, FaultKind::DoorIssue);
        assert_eq!(faults[0].elevator_number, 1);
    }

    #[test]
    fn sorts_records_chronologically() {
        let text = "00:00:05.000 2 UP 0 EXTERNAL\n00:00:01.000 1 DOWN 0 EXTERNAL\n";
        let (calls, _) = parse_scenario(text).expect("parse");
        assert_eq!(calls[0].floor, 1);
        assert_eq!(calls[1].floor, 2);
    }

    #[test]
    fn internal_call_keeps_its_elevator_number() {
        let text = "00:00:00.000 7 DOWN 2 INTERNAL\n";
        let (calls, _) = parse_scenario(text).expect("parse");
        assert_eq!(calls[0].elevator_number, 2);
        assert_eq!(calls[0].request_type, RequestType::Internal);
    }

    #[test]
    fn unknown_record_kind_is_rejected() {
        let text = "00:00:00.000 1 SIDEWAYS\n";
        assert!(matches!(
            parse_scenario(text),
            Err(ScenarioError::UnknownKind { .. })
        ));
    }

    #[test]
    fn malformed_timestamp_is_rejected() {
        let text = "not-a-time 1 DOOR_ISSUE\n";
        assert!(matches!(
            parse_scenario(text),
            Err(ScenarioError::BadTimestamp { .. })
        ));
    }

    #[test]
    fn too_few_fields_is_rejected() {
        let text = "00:00:00.000\n";
        assert!(matches!(
            parse_scenario(text),
            Err(ScenarioError::TooFewFields { .. })
        ));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let text = "\n00:00:00.000 0 UP 0 EXTERNAL\n\n";
        let (calls, _) = parse_scenario(text).expect("parse");
        assert_eq!(calls.len(), 1);
    }
}
