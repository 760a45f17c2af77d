//! The elevator subsystem: one instance per car, a three-state sequencer
//! that absorbs stop orders, drives doors, and reports arrivals.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::UdpSocket;
use tokio::time::sleep;

use crate::config::BuildingConfig;
use crate::net::priority_queue::{spawn_udp_receiver, PriorityQueue};
use crate::net::wire::{Message, TAG_REQUEST_ELEVATOR};
use crate::net::{loopback, send};
use crate::sim::model::{
    insert_stop, now_seconds, order_stops, Direction, DoorState, Health, Motion, Request,
};
use crate::sim::motion::travel_seconds;

pub struct Elevator {
    config: BuildingConfig,
    car: u8,
    socket: Arc<UdpSocket>,
    queue: PriorityQueue,
    current_floor: u8,
    direction: Direction,
    door_state: DoorState,
    health: Health,
    motion: Motion,
    pending_stops: Vec<u8>,
}

impl Elevator {
    pub async fn bind(config: BuildingConfig, car: u8) -> Result<Self> {
        let addr = loopback(config.network.elevator_port(car));
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        let queue = PriorityQueue::new(config.building.max_queue);
        spawn_udp_receiver(socket.clone(), queue.clone());
        Ok(Self {
            config,
            car,
            socket,
            queue,
            current_floor: 0,
            direction: Direction::Up,
            door_state: DoorState::Closed,
            health: Health::InService,
            motion: Motion::Idle,
            pending_stops: Vec::new(),
        })
    }

    fn scheduler_addr(&self) -> SocketAddr {
        loopback(self.config.network.scheduler_port)
    }

    fn viz_addr(&self) -> SocketAddr {
        loopback(self.config.network.visualization_port)
    }

    pub async fn run(&mut self) -> Result<()> {
        log::info!(
            "elevator {} listening on {}",
            self.car,
            loopback(self.config.network.elevator_port(self.car))
        );
        loop {
            let has_work = self.receiving_message().await;
            if !has_work {
                continue;
            }
            while let Some(dest) = self.pop_next_stop().await {
                self.new_floor(dest).await;
                if self.health == Health::OutOfService {
                    break;
                }
            }
        }
    }

    /// `RECEIVING_MESSAGE`: handle at most one control message, then absorb
    /// every `REQUEST_ELEVATOR` currently queued. Returns whether there is
    /// now work to do (`MOVING_ELEVATOR` should run).
    async fn receiving_message(&mut self) -> bool {
        let should_block = self.pending_stops.is_empty() && self.queue.is_empty().await;
        if should_block {
            let (bytes, src) = self.queue.poll().await;
            self.handle_control_message(&bytes, src).await;
        } else if self.queue.peek_priority().await != Some(TAG_REQUEST_ELEVATOR) {
            if let Some((bytes, src)) = self.queue.try_pop().await {
                self.handle_control_message(&bytes, src).await;
            }
        }

        while self.queue.peek_priority().await == Some(TAG_REQUEST_ELEVATOR) {
            if let Some((bytes, _src)) = self.queue.try_pop().await {
                if let Ok(Message::RequestElevator { floor, .. }) = Message::decode(&bytes) {
                    insert_stop(&mut self.pending_stops, floor, self.current_floor);
                }
            }
        }

        !self.pending_stops.is_empty()
    }

    async fn handle_control_message(&mut self, bytes: &[u8], src: SocketAddr) {
        let msg = match Message::decode(bytes) {
            Ok(m) => m,
            Err(e) => {
                log::debug!("elevator {}: dropping malformed datagram from {}: {}", self.car, src, e);
                return;
            }
        };
        match msg {
            Message::DoorIssue { .. } => {
                self.health = Health::OutOfService;
                send(&self.socket, &Message::DoorIssue { car: self.car }, self.viz_addr()).await;
                send(
                    &self.socket,
                    &Message::FixElevatorError { car: self.car },
                    self.scheduler_addr(),
                )
                .await;
            }
            Message::Stuck { .. } => {
                self.health = Health::OutOfService;
                send(&self.socket, &Message::Stuck { car: self.car }, self.viz_addr()).await;
            }
            Message::IssueFixed { .. } => {
                self.health = Health::InService;
                send(&self.socket, &Message::IssueFixed { car: self.car }, self.viz_addr()).await;
            }
            Message::GetElevatorRequest => {
                let now = now_seconds();
                for stop in self.pending_stops.drain(..) {
                    let req = Request::external(stop, Direction::Up, now);
                    let req = Request {
                        elevator_number: self.car,
                        ..req
                    };
                    send(&self.socket, &Message::Req(req), self.scheduler_addr()).await;
                }
            }
            Message::RequestElevator { floor, .. } => {
                insert_stop(&mut self.pending_stops, floor, self.current_floor);
            }
            other => {
                log::debug!("elevator {}: unexpected inbound message {:?}", self.car, other);
            }
        }
    }

    /// `MOVING_ELEVATOR`: resort stops for the current sweep and pop the
    /// next one. `None` means return to `RECEIVING_MESSAGE`.
    async fn pop_next_stop(&mut self) -> Option<u8> {
        if self.pending_stops.is_empty() || self.health == Health::OutOfService {
            return None;
        }
        order_stops(&mut self.pending_stops, self.current_floor, self.direction);
        let dest = self.pending_stops.remove(0);
        self.direction = Direction::towards(self.current_floor, dest);
        self.motion = Motion::ServicingStop;
        Some(dest)
    }

    /// `NEW_FLOOR`: travel to `dest`, cycle the doors, and report arrival.
    async fn new_floor(&mut self, dest: u8) {
        let delta = (dest as i16 - self.current_floor as i16).unsigned_abs() as u8;
        let travel = travel_seconds(&self.config.building, delta);
        self.motion = Motion::Moving;
        sleep(Duration::from_secs_f64(travel)).await;

        self.current_floor = dest;
        self.door_state = DoorState::Open;
        sleep(Duration::from_secs_f64(self.config.building.door_cycle_seconds)).await;
        self.door_state = DoorState::Closed;
        sleep(Duration::from_secs_f64(self.config.building.door_cycle_seconds)).await;
        self.motion = Motion::Idle;

        send(
            &self.socket,
            &Message::ElevatorArrival { car: self.car, floor: dest },
            self.scheduler_addr(),
        )
        .await;
        send(
            &self.socket,
            &Message::AverageTravelTime {
                car: self.car,
                seconds: travel.round().clamp(0.0, 255.0) as u8,
            },
            self.viz_addr(),
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orphaned_stop_requests_use_direction_up_and_external_type() {
        // Mirrors the GET_ELEVATOR_REQUEST handler's synthesis logic without
        // needing a bound socket.
        let mut stops = vec![4, 2];
        insert_stop(&mut stops, 4, 0);
        let now = 10.0;
        let reqs: Vec<Request> = stops
            .drain(..)
            .map(|floor| {
                let req = Request::external(floor, Direction::Up, now);
                Request { elevator_number: 1, ..req }
            })
            .collect();
        assert!(reqs.iter().all(|r| r.direction == Direction::Up));
        assert!(reqs
            .iter()
            .all(|r| r.request_type == crate::sim::model::RequestType::External));
        assert!(reqs.iter().all(|r| r.elevator_number == 1));
        assert_eq!(reqs.len(), 2);
        assert!(stops.is_empty());
    }
}
