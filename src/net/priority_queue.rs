//! Priority message receiver: a bounded, tag-ordered ingress queue fed by a
//! dedicated UDP reader task.
//!
//! Lower tag sorts first (higher priority); ties are broken FIFO by arrival
//! sequence. The queue is the sole synchronization point between the reader
//! task and whatever consumer loop calls [`PriorityQueue::poll`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use super::wire::{priority_key_of_bytes, Message, TAG_ACKNOWLEDGE};

/// A datagram waiting to be consumed, tagged with its priority key and
/// arrival sequence number for FIFO-within-tag ordering.
struct Entry {
    priority: u8,
    seq: u64,
    bytes: Vec<u8>,
    src: SocketAddr,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for Entry {}
impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse both keys so pop() yields the
        // lowest tag, and within a tag the lowest (earliest) sequence.
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Inner {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

/// A bounded priority queue of incoming datagrams, capacity `Q`.
#[derive(Clone)]
pub struct PriorityQueue {
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
    capacity: usize,
}

impl PriorityQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                heap: BinaryHeap::new(),
                next_seq: 0,
            })),
            notify: Arc::new(Notify::new()),
            capacity,
        }
    }

    /// Non-blocking enqueue. Drops (and logs) the message if the queue is
    /// already at capacity.
    pub async fn submit(&self, bytes: Vec<u8>, src: SocketAddr) {
        let priority = priority_key_of_bytes(&bytes);
        let mut inner = self.inner.lock().await;
        if inner.heap.len() >= self.capacity {
            log::warn!(
                "priority queue full (capacity={}), dropping datagram from {}",
                self.capacity,
                src
            );
            crate::metrics::inc_queue_overflow_drops();
            return;
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.heap.push(Entry {
            priority,
            seq,
            bytes,
            src,
        });
        drop(inner);
        self.notify.notify_one();
    }

    /// Blocks until a message is available, then returns the
    /// highest-priority one (lowest tag, FIFO within a tag).
    pub async fn poll(&self) -> (Vec<u8>, SocketAddr) {
        loop {
            {
                let mut inner = self.inner.lock().await;
                if let Some(entry) = inner.heap.pop() {
                    return (entry.bytes, entry.src);
                }
            }
            self.notify.notified().await;
        }
    }

    /// Observational, non-blocking.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.heap.is_empty()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.heap.len()
    }

    /// The priority tag of the next entry `poll` would return, without
    /// removing it. `None` if the queue is empty.
    pub async fn peek_priority(&self) -> Option<u8> {
        self.inner.lock().await.heap.peek().map(|e| e.priority)
    }

    /// Non-blocking pop. `None` if the queue is empty.
    pub async fn try_pop(&self) -> Option<(Vec<u8>, SocketAddr)> {
        self.inner
            .lock()
            .await
            .heap
            .pop()
            .map(|entry| (entry.bytes, entry.src))
    }
}

/// Spawns the dedicated reader task: reads datagrams off `socket`, ACKs each
/// successful receive back to its sender, and pushes a copy of the payload
/// into `queue`. The receive buffer is never aliased into the queue; each
/// entry owns its own `Vec<u8>`.
pub fn spawn_udp_receiver(socket: Arc<UdpSocket>, queue: PriorityQueue) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; 2048];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((n, src)) => {
                    let owned = buf[..n].to_vec();
                    if !is_ack_tag(priority_key_of_bytes(&owned)) {
                        if let Err(e) = socket.send_to(&Message::Acknowledge.encode().unwrap(), src).await {
                            log::warn!("failed to send ACK to {}: {}", src, e);
                        }
                    }
                    queue.submit(owned, src).await;
                }
                Err(e) => {
                    log::warn!("udp recv error: {}", e);
                }
            }
        }
    })
}

/// `true` if the decoded tag byte is itself an ACK. The reader task checks
/// this before sending a counter-ACK, so two subsystems exchanging ACKs
/// never ping-pong forever.
pub fn is_ack_tag(tag: u8) -> bool {
    tag == TAG_ACKNOWLEDGE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    #[tokio::test]
    async fn higher_priority_tag_polls_first() {
        let q = PriorityQueue::new(16);
        q.submit(vec![6, 1, 2], addr()).await; // REQUEST_ELEVATOR
        q.submit(vec![1, 0], addr()).await; // DOOR_ISSUE
        q.submit(vec![0, 0], addr()).await; // STUCK
        let (first, _) = q.poll().await;
        assert_eq!(first[0], 0);
        let (second, _) = q.poll().await;
        assert_eq!(second[0], 1);
        let (third, _) = q.poll().await;
        assert_eq!(third[0], 6);
    }

    #[tokio::test]
    async fn equal_priority_is_fifo() {
        let q = PriorityQueue::new(16);
        q.submit(vec![5, 0, 1], addr()).await;
        q.submit(vec![5, 0, 2], addr()).await;
        q.submit(vec![5, 0, 3], addr()).await;
        let (first, _) = q.poll().await;
        let (second, _) = q.poll().await;
        let (third, _) = q.poll().await;
        assert_eq!(first[2], 1);
        assert_eq!(second[2], 2);
        assert_eq!(third[2], 3);
    }

    #[tokio::test]
    async fn request_frames_sort_after_every_tag() {
        let q = PriorityQueue::new(16);
        let request_bytes = vec![0u8; 20]; // longer than any tag frame
        q.submit(request_bytes.clone(), addr()).await;
        q.submit(vec![9, 0], addr()).await; // TOTAL_SIMULATION_TIME
        let (first, _) = q.poll().await;
        assert_eq!(first, vec![9, 0]);
        let (second, _) = q.poll().await;
        assert_eq!(second, request_bytes);
    }

    #[tokio::test]
    async fn overflow_drops_new_submission() {
        let q = PriorityQueue::new(1);
        q.submit(vec![9, 0], addr()).await;
        q.submit(vec![0, 0], addr()).await;
        assert_eq!(q.len().await, 1);
        let (kept, _) = q.poll().await;
        assert_eq!(kept, vec![9, 0]);
    }

    #[tokio::test]
    async fn is_empty_reflects_queue_state() {
        let q = PriorityQueue::new(4);
        assert!(q.is_empty().await);
        q.submit(vec![7], addr()).await;
        assert!(!q.is_empty().await);
    }

    #[tokio::test]
    async fn receiver_does_not_counter_ack_an_acknowledgement() {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let receiver_addr = socket.local_addr().unwrap();
        let queue = PriorityQueue::new(16);
        spawn_udp_receiver(socket, queue);

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client
            .send_to(&Message::Acknowledge.encode().unwrap(), receiver_addr)
            .await
            .unwrap();

        let mut buf = [0u8; 8];
        let result =
            tokio::time::timeout(std::time::Duration::from_millis(200), client.recv_from(&mut buf))
                .await;
        assert!(result.is_err(), "receiver must not counter-ACK an ACK");
    }
}
