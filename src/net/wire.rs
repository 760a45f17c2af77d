//! Wire frames exchanged between subsystems.
//!
//! Tag-byte frames are hand-packed per the frame table; `Request` payloads
//! carry no tag byte and are encoded with `bincode` instead, distinguished by
//! length (every tag frame is at most 3 bytes; every encoded `Request` is
//! longer). This is the same "stable wire form" latitude the original spec
//! leaves open, picked once and used consistently everywhere in this crate.

use crate::error::WireError;
use crate::sim::model::Request;

pub const TAG_STUCK: u8 = 0;
pub const TAG_DOOR_ISSUE: u8 = 1;
pub const TAG_GET_ELEVATOR_REQUEST: u8 = 2;
pub const TAG_ISSUE_FIXED: u8 = 3;
pub const TAG_FIX_ELEVATOR_ERROR: u8 = 4;
pub const TAG_ELEVATOR_ARRIVAL: u8 = 5;
pub const TAG_REQUEST_ELEVATOR: u8 = 6;
pub const TAG_ACKNOWLEDGE: u8 = 7;
pub const TAG_AVERAGE_TRAVEL_TIME: u8 = 8;
pub const TAG_TOTAL_SIMULATION_TIME: u8 = 9;

/// Synthetic priority key used for serialized `Request` frames, which carry
/// no tag byte. Sorts after every real tag so calls never preempt fault or
/// recovery traffic already queued.
pub const REQUEST_PRIORITY: u8 = 10;

/// Maximum length of any tag-byte frame (tag + 2-byte payload, the longest
/// defined in the frame table).
const MAX_TAG_FRAME_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Stuck { car: u8 },
    DoorIssue { car: u8 },
    GetElevatorRequest,
    IssueFixed { car: u8 },
    FixElevatorError { car: u8 },
    ElevatorArrival { car: u8, floor: u8 },
    RequestElevator { car: u8, floor: u8 },
    Acknowledge,
    AverageTravelTime { car: u8, seconds: u8 },
    TotalSimulationTime { seconds: u8 },
    Req(Request),
}

impl Message {
    /// The priority key used by the ingress queue: the tag byte for
    /// tag-frame messages, or [`REQUEST_PRIORITY`] for a `Request`. Lower
    /// sorts first (higher priority).
    pub fn priority_key(&self) -> u8 {
        match self {
            Message::Stuck { .. } => TAG_STUCK,
            Message::DoorIssue { .. } => TAG_DOOR_ISSUE,
            Message::GetElevatorRequest => TAG_GET_ELEVATOR_REQUEST,
            Message::IssueFixed { .. } => TAG_ISSUE_FIXED,
            Message::FixElevatorError { .. } => TAG_FIX_ELEVATOR_ERROR,
            Message::ElevatorArrival { .. } => TAG_ELEVATOR_ARRIVAL,
            Message::RequestElevator { .. } => TAG_REQUEST_ELEVATOR,
            Message::Acknowledge => TAG_ACKNOWLEDGE,
            Message::AverageTravelTime { .. } => TAG_AVERAGE_TRAVEL_TIME,
            Message::TotalSimulationTime { .. } => TAG_TOTAL_SIMULATION_TIME,
            Message::Req(_) => REQUEST_PRIORITY,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        Ok(match self {
            Message::Stuck { car } => vec![TAG_STUCK, *car],
            Message::DoorIssue { car } => vec![TAG_DOOR_ISSUE, *car],
            Message::GetElevatorRequest => vec![TAG_GET_ELEVATOR_REQUEST],
            Message::IssueFixed { car } => vec![TAG_ISSUE_FIXED, *car],
            Message::FixElevatorError { car } => vec![TAG_FIX_ELEVATOR_ERROR, *car],
            Message::ElevatorArrival { car, floor } => {
                vec![TAG_ELEVATOR_ARRIVAL, *car, *floor]
            }
            Message::RequestElevator { car, floor } => {
                vec![TAG_REQUEST_ELEVATOR, *car, *floor]
            }
            Message::Acknowledge => vec![TAG_ACKNOWLEDGE],
            Message::AverageTravelTime { car, seconds } => {
                vec![TAG_AVERAGE_TRAVEL_TIME, *car, *seconds]
            }
            Message::TotalSimulationTime { seconds } => {
                vec![TAG_TOTAL_SIMULATION_TIME, *seconds]
            }
            Message::Req(req) => bincode::serialize(req)?,
        })
    }

    /// Decode a raw datagram. Frames no longer than [`MAX_TAG_FRAME_LEN`] are
    /// interpreted as tag frames; anything longer is interpreted as a
    /// bincode-encoded [`Request`].
    pub fn decode(bytes: &[u8]) -> Result<Message, WireError> {
        if bytes.is_empty() {
            return Err(WireError::Empty);
        }
        if bytes.len() > MAX_TAG_FRAME_LEN {
            let req: Request = bincode::deserialize(bytes)?;
            return Ok(Message::Req(req));
        }
        let tag = bytes[0];
        let payload = &bytes[1..];
        match tag {
            TAG_STUCK => Ok(Message::Stuck {
                car: expect_one(tag, payload)?,
            }),
            TAG_DOOR_ISSUE => Ok(Message::DoorIssue {
                car: expect_one(tag, payload)?,
            }),
            TAG_GET_ELEVATOR_REQUEST => {
                expect_len(tag, payload, 0)?;
                Ok(Message::GetElevatorRequest)
            }
            TAG_ISSUE_FIXED => Ok(Message::IssueFixed {
                car: expect_one(tag, payload)?,
            }),
            TAG_FIX_ELEVATOR_ERROR => Ok(Message::FixElevatorError {
                car: expect_one(tag, payload)?,
            }),
            TAG_ELEVATOR_ARRIVAL => {
                expect_len(tag, payload, 2)?;
                Ok(Message::ElevatorArrival {
                    car: payload[0],
                    floor: payload[1],
                })
            }
            TAG_REQUEST_ELEVATOR => {
                expect_len(tag, payload, 2)?;
                Ok(Message::RequestElevator {
                    car: payload[0],
                    floor: payload[1],
                })
            }
            TAG_ACKNOWLEDGE => {
                expect_len(tag, payload, 0)?;
                Ok(Message::Acknowledge)
            }
            TAG_AVERAGE_TRAVEL_TIME => {
                expect_len(tag, payload, 2)?;
                Ok(Message::AverageTravelTime {
                    car: payload[0],
                    seconds: payload[1],
                })
            }
            TAG_TOTAL_SIMULATION_TIME => Ok(Message::TotalSimulationTime {
                seconds: expect_one(tag, payload)?,
            }),
            other => Err(WireError::UnknownTag(other)),
        }
    }
}

fn expect_len(tag: u8, payload: &[u8], expected: usize) -> Result<(), WireError> {
    if payload.len() != expected {
        return Err(WireError::TooShort {
            tag,
            expected,
            found: payload.len(),
        });
    }
    Ok(())
}

fn expect_one(tag: u8, payload: &[u8]) -> Result<u8, WireError> {
    expect_len(tag, payload, 1)?;
    Ok(payload[0])
}

/// Validates that `car` is a legal index for a building with `elevators`
/// cars, per the "out-of-range car index is a malformed packet" rule.
pub fn check_car_range(car: u8, elevators: u8) -> Result<(), WireError> {
    if car >= elevators {
        return Err(WireError::CarOutOfRange(car));
    }
    Ok(())
}

/// The priority key the ingress queue sorts a raw datagram by, without fully
/// decoding it: the tag byte for anything no longer than a tag frame, or
/// [`REQUEST_PRIORITY`] for anything longer (a serialized `Request`). Used so
/// enqueue ordering doesn't pay for a full `bincode` decode, and so a
/// malformed-but-short frame still sorts and gets dropped promptly by the
/// consumer instead of starving behind real traffic.
pub fn priority_key_of_bytes(bytes: &[u8]) -> u8 {
    if bytes.is_empty() {
        return u8::MAX;
    }
    if bytes.len() > MAX_TAG_FRAME_LEN {
        REQUEST_PRIORITY
    } else {
        bytes[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::model::{Direction, RequestType};

    #[test]
    fn tag_frames_round_trip() {
        let messages = vec![
            Message::Stuck { car: 2 },
            Message::DoorIssue { car: 1 },
            Message::GetElevatorRequest,
            Message::IssueFixed { car: 3 },
            Message::FixElevatorError { car: 0 },
            Message::ElevatorArrival { car: 1, floor: 7 },
            Message::RequestElevator { car: 1, floor: 7 },
            Message::Acknowledge,
            Message::AverageTravelTime { car: 2, seconds: 9 },
            Message::TotalSimulationTime { seconds: 42 },
        ];
        for msg in messages {
            let bytes = msg.encode().expect("encode");
            let decoded = Message::decode(&bytes).expect("decode");
            assert_eq!(decoded, msg);
        }
    }

    #[test]
    fn request_round_trips_field_by_field() {
        let req = Request {
            floor: 3,
            elevator_number: 1,
            direction: Direction::Up,
            request_time: 12.5,
            request_type: RequestType::External,
        };
        let msg = Message::Req(req);
        let bytes = msg.encode().expect("encode");
        assert!(bytes.len() > MAX_TAG_FRAME_LEN);
        match Message::decode(&bytes).expect("decode") {
            Message::Req(decoded) => assert_eq!(decoded, req),
            other => panic!("expected Req, got {:?}", other),
        }
    }

    #[test]
    fn priority_ordering_matches_tag_table() {
        assert!(Message::Stuck { car: 0 }.priority_key() < Message::DoorIssue { car: 0 }.priority_key());
        assert!(
            Message::DoorIssue { car: 0 }.priority_key()
                < Message::GetElevatorRequest.priority_key()
        );
        assert!(
            Message::TotalSimulationTime { seconds: 0 }.priority_key()
                < Message::Req(Request::external(0, Direction::Up, 0.0)).priority_key()
        );
    }

    #[test]
    fn empty_frame_is_rejected() {
        assert!(matches!(Message::decode(&[]), Err(WireError::Empty)));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(matches!(
            Message::decode(&[200]),
            Err(WireError::UnknownTag(200))
        ));
    }

    #[test]
    fn short_payload_is_rejected() {
        assert!(matches!(
            Message::decode(&[TAG_ELEVATOR_ARRIVAL, 1]),
            Err(WireError::TooShort { .. })
        ));
    }

    #[test]
    fn out_of_range_car_is_rejected() {
        assert!(check_car_range(4, 4).is_err());
        assert!(check_car_range(3, 4).is_ok());
    }
}
