use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use xbeeprims_packet::Packet;

use crate::connection::Connection;
use crate::error::Result;

/// Decoded packets waiting for pickup, in arrival order.
///
/// Every method takes and releases the lock itself.
#[derive(Debug, Default)]
pub struct PacketQueue {
    packets: Mutex<VecDeque<Packet>>,
}

impl PacketQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one packet at the tail.
    pub fn enqueue(&self, packet: Packet) -> Result<()> {
        let mut packets = self.packets.lock();
        packets.try_reserve(1)?;
        packets.push_back(packet);
        Ok(())
    }

    /// Append packets at the tail in one step, keeping their order.
    pub fn enqueue_all(&self, batch: Vec<Packet>) -> Result<()> {
        let mut packets = self.packets.lock();
        packets.try_reserve(batch.len())?;
        packets.extend(batch);
        Ok(())
    }

    /// Remove and return the oldest packet `connection` matches.
    pub fn dequeue_for(&self, connection: &Connection) -> Option<Packet> {
        let mut packets = self.packets.lock();
        let index = packets.iter().position(|p| connection.matches(p))?;
        packets.remove(index)
    }

    /// Poll [`PacketQueue::dequeue_for`] every `interval` until `timeout`.
    ///
    /// Makes `ceil(timeout / interval)` attempts, at least one, and sleeps
    /// `interval` after every miss. A miss therefore returns no earlier
    /// than `timeout`.
    pub fn dequeue_for_blocking(
        &self,
        connection: &Connection,
        timeout: Duration,
        interval: Duration,
    ) -> Option<Packet> {
        for _ in 0..poll_attempts(timeout, interval) {
            if let Some(packet) = self.dequeue_for(connection) {
                return Some(packet);
            }
            std::thread::sleep(interval);
        }
        None
    }

    /// Discard every packet `connection` matches, returning how many.
    pub fn flush(&self, connection: &Connection) -> usize {
        let mut packets = self.packets.lock();
        let before = packets.len();
        packets.retain(|p| !connection.matches(p));
        before - packets.len()
    }

    /// Drop what a removed connection would have received.
    pub fn purge(&self, connection: &Connection) -> usize {
        self.flush(connection)
    }

    pub fn len(&self) -> usize {
        self.packets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.lock().is_empty()
    }
}

pub(crate) fn poll_attempts(timeout: Duration, interval: Duration) -> u32 {
    if interval.is_zero() {
        return 1;
    }
    let attempts = timeout.as_nanos().div_ceil(interval.as_nanos());
    attempts.clamp(1, u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use xbeeprims_packet::{Address, RxOptions, TxStatus};

    use super::*;
    use crate::connection::{ConnectionFlags, ConnectionHandle, ConnectionType};

    fn conn(connection_type: ConnectionType, frame_id: u8, address: Address) -> Connection {
        Connection {
            handle: ConnectionHandle(1),
            connection_type,
            frame_id,
            address,
            flags: ConnectionFlags::default(),
        }
    }

    fn data(addr: u16, body: &[u8]) -> Packet {
        Packet::Data {
            source: Address::Short(addr),
            rssi: 30,
            options: RxOptions(0),
            data: body.to_vec(),
        }
    }

    fn tx(frame_id: u8) -> Packet {
        Packet::TxStatus {
            frame_id,
            status: TxStatus(0),
        }
    }

    #[test]
    fn dequeue_selects_by_connection_and_keeps_order() {
        let queue = PacketQueue::new();
        queue
            .enqueue_all(vec![data(1, b"a"), data(2, b"b"), tx(1), data(1, b"c"), data(2, b"d")])
            .unwrap();

        let one = conn(ConnectionType::Data16, 0, Address::Short(1));
        let two = conn(ConnectionType::Data16, 0, Address::Short(2));

        assert_eq!(queue.dequeue_for(&one).unwrap().data(), b"a");
        assert_eq!(queue.dequeue_for(&one).unwrap().data(), b"c");
        assert!(queue.dequeue_for(&one).is_none());

        assert_eq!(queue.dequeue_for(&two).unwrap().data(), b"b");
        assert_eq!(queue.dequeue_for(&two).unwrap().data(), b"d");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn dequeue_never_returns_another_connections_packet() {
        let queue = PacketQueue::new();
        queue.enqueue(tx(2)).unwrap();

        let wrong = conn(ConnectionType::TxStatus, 3, Address::None);
        assert!(queue.dequeue_for(&wrong).is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn flush_discards_only_matches() {
        let queue = PacketQueue::new();
        queue
            .enqueue_all(vec![tx(1), data(1, b"a"), tx(1), tx(2)])
            .unwrap();

        let removed = queue.flush(&conn(ConnectionType::TxStatus, 1, Address::None));
        assert_eq!(removed, 2);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.purge(&conn(ConnectionType::TxStatus, 2, Address::None)), 1);
        assert!(!queue.is_empty());
    }

    #[test]
    fn blocking_dequeue_returns_none_after_timeout() {
        let queue = PacketQueue::new();
        let c = conn(ConnectionType::TxStatus, 1, Address::None);

        let start = Instant::now();
        let result = queue.dequeue_for_blocking(
            &c,
            Duration::from_millis(30),
            Duration::from_millis(10),
        );

        assert!(result.is_none());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn blocking_dequeue_waits_out_the_full_timeout() {
        let queue = PacketQueue::new();
        let c = conn(ConnectionType::TxStatus, 1, Address::None);

        for (timeout, interval) in [(40, 20), (45, 20), (5, 10)] {
            let timeout = Duration::from_millis(timeout);
            let start = Instant::now();
            let result = queue.dequeue_for_blocking(&c, timeout, Duration::from_millis(interval));
            assert!(result.is_none());
            assert!(
                start.elapsed() >= timeout,
                "returned after {:?}, before {timeout:?}",
                start.elapsed()
            );
        }
    }

    #[test]
    fn blocking_dequeue_sees_later_packets() {
        let queue = Arc::new(PacketQueue::new());
        let c = conn(ConnectionType::TxStatus, 7, Address::None);

        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                queue.enqueue(tx(7)).unwrap();
            })
        };

        let packet = queue.dequeue_for_blocking(
            &c,
            Duration::from_secs(2),
            Duration::from_millis(5),
        );
        producer.join().unwrap();

        assert_eq!(packet.unwrap().frame_id(), Some(7));
    }

    #[test]
    fn attempt_count_rounds_up() {
        let interval = Duration::from_millis(50);
        assert_eq!(poll_attempts(Duration::from_secs(1), interval), 20);
        assert_eq!(poll_attempts(Duration::from_millis(51), interval), 2);
        assert_eq!(poll_attempts(Duration::ZERO, interval), 1);
        assert_eq!(poll_attempts(Duration::from_secs(1), Duration::ZERO), 1);
    }
}
