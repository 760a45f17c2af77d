//! The scheduler: global dispatcher, ETA tracker, and fault arbiter.
//!
//! Runs as a single cooperative loop. Each iteration either drains one
//! ingress datagram (classifying it and running any side effects) or, on a
//! periodic tick, re-checks every in-motion car against its ETA. The ticks
//! are what let the stuck-detection watchdog (`CHECK_ELEVATOR_STUCK`) make
//! progress even when no new traffic arrives — the 1980s-style "only reached
//! from SCHEDULING or FIXING_ELEVATOR_ERROR" state machine is otherwise
//! starved whenever the pending-request list and repair traffic are both
//! quiet, which is most of a simulation's run.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use tokio::net::UdpSocket;
use tokio::time::sleep;

use crate::config::BuildingConfig;
use crate::metrics;
use crate::net::priority_queue::{spawn_udp_receiver, PriorityQueue};
use crate::net::wire::Message;
use crate::net::{loopback, send};
use crate::sim::model::{now_seconds, Health, RequestType};
use crate::sim::motion::travel_seconds;

const STUCK_CHECK_TICK: Duration = Duration::from_millis(200);

/// The scheduler's exclusively-owned view of one car.
#[derive(Debug, Clone, Copy)]
pub struct CarMirror {
    pub current_floor: u8,
    pub next_floor: u8,
    pub health: Health,
    pub estimated_arrival: Option<f64>,
}

impl CarMirror {
    fn at_rest(&self) -> bool {
        self.current_floor == self.next_floor
    }
}

fn initial_mirror(elevators: u8) -> Vec<CarMirror> {
    (0..elevators)
        .map(|_| CarMirror {
            current_floor: 0,
            next_floor: 0,
            health: Health::InService,
            estimated_arrival: None,
        })
        .collect()
}

/// Nearest-car dispatch policy: the in-service car minimizing
/// `|next_floor - floor|`, ties broken by lowest index. `None` if no car is
/// in service.
pub fn select_car(mirror: &[CarMirror], floor: u8) -> Option<u8> {
    mirror
        .iter()
        .enumerate()
        .filter(|(_, car)| car.health == Health::InService)
        .min_by_key(|(idx, car)| {
            let distance = (car.next_floor as i16 - floor as i16).unsigned_abs();
            (distance, *idx as u16)
        })
        .map(|(idx, _)| idx as u8)
}

pub struct Scheduler {
    config: BuildingConfig,
    socket: Arc<UdpSocket>,
    queue: PriorityQueue,
    mirror: Vec<CarMirror>,
    pending: VecDeque<crate::sim::model::Request>,
    start_time: f64,
}

impl Scheduler {
    pub async fn bind(config: BuildingConfig) -> Result<Self> {
        let addr = loopback(config.network.scheduler_port);
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        let queue = PriorityQueue::new(config.building.max_queue);
        spawn_udp_receiver(socket.clone(), queue.clone());
        let mirror = initial_mirror(config.building.elevators);
        Ok(Self {
            config,
            socket,
            queue,
            mirror,
            pending: VecDeque::new(),
            start_time: now_seconds(),
        })
    }

    fn elevator_addr(&self, car: u8) -> SocketAddr {
        loopback(self.config.network.elevator_port(car))
    }

    fn floor_addr(&self) -> SocketAddr {
        loopback(self.config.network.floor_port)
    }

    fn viz_addr(&self) -> SocketAddr {
        loopback(self.config.network.visualization_port)
    }

    /// Runs until the process is killed; never returns under normal
    /// operation.
    pub async fn run(&mut self) -> Result<()> {
        log::info!(
            "scheduler listening on {}",
            loopback(self.config.network.scheduler_port)
        );
        loop {
            tokio::select! {
                (bytes, src) = self.queue.poll() => {
                    self.handle_datagram(&bytes, src).await;
                }
                _ = sleep(STUCK_CHECK_TICK) => {
                    self.check_stuck().await;
                }
            }
        }
    }

    async fn handle_datagram(&mut self, bytes: &[u8], src: SocketAddr) {
        let msg = match Message::decode(bytes) {
            Ok(m) => m,
            Err(e) => {
                log::debug!("scheduler: dropping malformed datagram from {}: {}", src, e);
                return;
            }
        };
        match msg {
            Message::Req(req) => {
                self.pending.push_back(req);
                self.drain_scheduling().await;
            }
            Message::DoorIssue { car } => {
                if !self.valid_car(car) {
                    return;
                }
                self.mark_out_of_service(car);
                send(&self.socket, &Message::DoorIssue { car }, self.elevator_addr(car)).await;
            }
            Message::Stuck { car } => {
                if !self.valid_car(car) {
                    return;
                }
                self.mark_out_of_service(car);
                send(&self.socket, &Message::Stuck { car }, self.elevator_addr(car)).await;
                send(
                    &self.socket,
                    &Message::GetElevatorRequest,
                    self.elevator_addr(car),
                )
                .await;
            }
            Message::ElevatorArrival { car, floor } => {
                if !self.valid_car(car) {
                    return;
                }
                self.mirror[car as usize].current_floor = floor;
                self.mirror[car as usize].next_floor = floor;
                self.mirror[car as usize].estimated_arrival = None;
                metrics::inc_arrivals_total();
                send(
                    &self.socket,
                    &Message::ElevatorArrival { car, floor },
                    self.floor_addr(),
                )
                .await;
                if self.mirror.iter().all(|c| c.at_rest()) {
                    let elapsed = (now_seconds() - self.start_time).round().clamp(0.0, 255.0) as u8;
                    send(
                        &self.socket,
                        &Message::TotalSimulationTime { seconds: elapsed },
                        self.viz_addr(),
                    )
                    .await;
                }
            }
            Message::FixElevatorError { car } => {
                if !self.valid_car(car) {
                    return;
                }
                self.fixing_elevator_error(car).await;
            }
            other => {
                log::debug!("scheduler: unexpected inbound message {:?}", other);
            }
        }
    }

    fn valid_car(&self, car: u8) -> bool {
        if let Err(e) = crate::net::wire::check_car_range(car, self.mirror.len() as u8) {
            log::debug!("scheduler: {}, dropping", e);
            false
        } else {
            true
        }
    }

    /// Marks `car` out of service, upholding Invariant 2 (§3): `next_floor`
    /// collapses onto `current_floor` and any stale ETA is cleared so the
    /// watchdog never consults it again until a fresh dispatch sets one.
    fn mark_out_of_service(&mut self, car: u8) {
        let mirror = &mut self.mirror[car as usize];
        mirror.health = Health::OutOfService;
        mirror.next_floor = mirror.current_floor;
        mirror.estimated_arrival = None;
    }

    async fn drain_scheduling(&mut self) {
        while let Some(req) = self.pending.pop_front() {
            self.dispatch(req).await;
        }
        self.check_stuck().await;
    }

    async fn dispatch(&mut self, req: crate::sim::model::Request) {
        let car = match req.request_type {
            RequestType::Internal => {
                let car = req.elevator_number;
                if !self.valid_car(car) {
                    return;
                }
                if self.mirror[car as usize].health == Health::OutOfService {
                    log::error!(
                        "dispatch policy error: internal request for out-of-service car {}",
                        car
                    );
                    metrics::inc_dispatches_dropped();
                    return;
                }
                car
            }
            RequestType::External => match select_car(&self.mirror, req.floor) {
                Some(car) => car,
                None => {
                    log::error!("dispatch policy error: no in-service car for floor {}", req.floor);
                    metrics::inc_dispatches_dropped();
                    return;
                }
            },
        };

        send(
            &self.socket,
            &Message::RequestElevator { car, floor: req.floor },
            self.elevator_addr(car),
        )
        .await;
        send(
            &self.socket,
            &Message::RequestElevator { car, floor: req.floor },
            self.floor_addr(),
        )
        .await;

        let now = now_seconds();
        let mirror = &mut self.mirror[car as usize];
        let delta = (req.floor as i16 - mirror.current_floor as i16).unsigned_abs() as u8;
        let mut eta = now + travel_seconds(&self.config.building, delta) + 3.0;
        if !mirror.at_rest() {
            if let Some(previous) = mirror.estimated_arrival {
                eta += (previous - now).max(0.0);
            }
        }
        mirror.next_floor = req.floor;
        mirror.estimated_arrival = Some(eta);
        metrics::inc_dispatches_total();
    }

    async fn check_stuck(&mut self) {
        let now = now_seconds();
        for car in 0..self.mirror.len() as u8 {
            let mirror = self.mirror[car as usize];
            if mirror.health != Health::InService || mirror.at_rest() {
                continue;
            }
            let Some(eta) = mirror.estimated_arrival else {
                continue;
            };
            if now >= eta {
                log::warn!("car {} exceeded its ETA, declaring STUCK", car);
                self.mark_out_of_service(car);
                metrics::inc_stuck_detected();
                send(&self.socket, &Message::Stuck { car }, self.elevator_addr(car)).await;
            }
        }
    }

    async fn fixing_elevator_error(&mut self, car: u8) {
        let r: f64 = rand::thread_rng().gen_range(0.0..1.0);
        if r <= self.config.building.repair_probability {
            self.mirror[car as usize].health = Health::InService;
            metrics::inc_repairs_succeeded();
            send(&self.socket, &Message::IssueFixed { car }, self.elevator_addr(car)).await;
        } else {
            metrics::inc_repairs_failed();
            send(
                &self.socket,
                &Message::GetElevatorRequest,
                self.elevator_addr(car),
            )
            .await;
        }
        self.check_stuck().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mirror(entries: &[(u8, u8, Health)]) -> Vec<CarMirror> {
        entries
            .iter()
            .map(|&(current_floor, next_floor, health)| CarMirror {
                current_floor,
                next_floor,
                health,
                estimated_arrival: None,
            })
            .collect()
    }

    #[test]
    fn select_car_picks_nearest() {
        let m = mirror(&[(0, 0, Health::InService), (9, 9, Health::InService)]);
        assert_eq!(select_car(&m, 8), Some(1));
        assert_eq!(select_car(&m, 1), Some(0));
    }

    #[test]
    fn select_car_ties_favor_lowest_index() {
        let m = mirror(&[
            (5, 5, Health::InService),
            (5, 5, Health::InService),
        ]);
        assert_eq!(select_car(&m, 7), Some(0));
    }

    #[test]
    fn select_car_skips_out_of_service() {
        let m = mirror(&[
            (0, 0, Health::OutOfService),
            (9, 9, Health::InService),
        ]);
        assert_eq!(select_car(&m, 0), Some(1));
    }

    #[test]
    fn select_car_none_when_all_out_of_service() {
        let m = mirror(&[(0, 0, Health::OutOfService)]);
        assert_eq!(select_car(&m, 0), None);
    }

    fn test_config(base_port: u16) -> BuildingConfig {
        BuildingConfig {
            building: crate::config::BuildingParams {
                floors: 10,
                elevators: 2,
                max_speed: 1.0,
                acceleration: 1.0,
                door_cycle_seconds: 1.0,
                repair_probability: 0.8,
                max_queue: 64,
            },
            network: crate::config::NetworkConfig {
                scheduler_port: base_port,
                elevator_base_port: base_port + 1,
                floor_port: base_port + 20,
                visualization_port: base_port + 30,
            },
            logging: crate::config::LoggingConfig::default(),
        }
    }

    #[tokio::test]
    async fn mark_out_of_service_collapses_next_floor_and_clears_eta() {
        let mut scheduler = Scheduler::bind(test_config(23600)).await.expect("bind");
        scheduler.mirror[0] = CarMirror {
            current_floor: 3,
            next_floor: 7,
            health: Health::InService,
            estimated_arrival: Some(now_seconds() + 100.0),
        };

        scheduler.mark_out_of_service(0);

        let mirror = scheduler.mirror[0];
        assert_eq!(mirror.health, Health::OutOfService);
        assert_eq!(mirror.next_floor, mirror.current_floor);
        assert!(mirror.estimated_arrival.is_none());
    }

    #[tokio::test]
    async fn repaired_car_with_stale_eta_is_not_redeclared_stuck() {
        let mut scheduler = Scheduler::bind(test_config(23700)).await.expect("bind");
        // Simulate a car mid-trip whose ETA has already elapsed, then faulted.
        scheduler.mirror[0] = CarMirror {
            current_floor: 3,
            next_floor: 7,
            health: Health::InService,
            estimated_arrival: Some(now_seconds() - 10.0),
        };
        scheduler.mark_out_of_service(0);
        scheduler.mirror[0].health = Health::InService; // repair succeeds

        scheduler.check_stuck().await;

        assert_eq!(scheduler.mirror[0].health, Health::InService);
    }
}
