//! End-to-end priority preemption over a real UDP socket, mirroring scenario
//! S6: enqueue REQUEST_ELEVATOR, DOOR_ISSUE, STUCK in that order; the queue
//! must yield STUCK, DOOR_ISSUE, REQUEST_ELEVATOR.

use elevsim::net::priority_queue::{spawn_udp_receiver, PriorityQueue};
use elevsim::net::wire::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;

#[tokio::test]
async fn stuck_and_door_issue_preempt_queued_dispatch_traffic() {
    let socket = Arc::new(
        UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("bind receiver"),
    );
    let receiver_addr = socket.local_addr().unwrap();
    let queue = PriorityQueue::new(16);
    spawn_udp_receiver(socket, queue.clone());

    let client = UdpSocket::bind("127.0.0.1:0").await.expect("bind client");
    for msg in [
        Message::RequestElevator { car: 0, floor: 3 },
        Message::DoorIssue { car: 0 },
        Message::Stuck { car: 0 },
    ] {
        client
            .send_to(&msg.encode().unwrap(), receiver_addr)
            .await
            .expect("send");
        // drain this datagram's ack before sending the next, so arrival
        // order at the receiver's socket is deterministic
        let mut buf = [0u8; 8];
        tokio::time::timeout(Duration::from_secs(1), client.recv_from(&mut buf))
            .await
            .expect("timeout waiting ack")
            .expect("recv ack");
    }

    let (first, _) = tokio::time::timeout(Duration::from_secs(1), queue.poll())
        .await
        .expect("timeout polling first");
    let (second, _) = tokio::time::timeout(Duration::from_secs(1), queue.poll())
        .await
        .expect("timeout polling second");
    let (third, _) = tokio::time::timeout(Duration::from_secs(1), queue.poll())
        .await
        .expect("timeout polling third");

    assert_eq!(Message::decode(&first).unwrap(), Message::Stuck { car: 0 });
    assert_eq!(Message::decode(&second).unwrap(), Message::DoorIssue { car: 0 });
    assert_eq!(
        Message::decode(&third).unwrap(),
        Message::RequestElevator { car: 0, floor: 3 }
    );
}
