use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, trace};
use xbeeprims_frame::{api, is_timeout, FrameError, FrameReader, FrameStats};
use xbeeprims_packet::{decode, Packet};
use xbeeprims_transport::Transport;

use crate::error::{Result, SessionError};
use crate::queue::PacketQueue;
use crate::registry::Registry;

/// State shared between the session and its receiver thread.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) registry: Mutex<Registry>,
    pub(crate) queue: PacketQueue,
    pub(crate) stats: Mutex<SessionStats>,
}

/// Receiver counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frame reader counters, including discarded frames.
    pub frames: FrameStats,
    /// Known frames too short for their type.
    pub decode_errors: u64,
    /// Packets handed to the queue.
    pub packets_queued: u64,
    /// Packets no live connection wanted.
    pub packets_dropped: u64,
}

/// The background loop: frames in, routed packets out.
pub(crate) struct Receiver<T> {
    reader: FrameReader<T>,
    shared: Arc<Shared>,
    shutdown: Arc<AtomicBool>,
}

impl<T: Transport> Receiver<T> {
    pub(crate) fn new(
        reader: FrameReader<T>,
        shared: Arc<Shared>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            reader,
            shared,
            shutdown,
        }
    }

    /// Run until shutdown is requested or the stream fails.
    pub(crate) fn run(mut self) -> Result<()> {
        debug!(transport = self.reader.get_ref().transport_name(), "receiver started");

        while !self.shutdown.load(Ordering::Acquire) {
            let frame = match self.reader.read_frame() {
                Ok(frame) => frame,
                Err(err) if is_timeout(&err) => {
                    self.publish_frame_stats();
                    continue;
                }
                Err(FrameError::ConnectionClosed) if self.shutdown.load(Ordering::Acquire) => {
                    break;
                }
                Err(err) => return Err(self.stopped(err.into())),
            };

            trace!(
                kind = api::frame_type_name(frame.frame_type),
                len = frame.payload.len(),
                "frame received"
            );
            match decode(&frame) {
                Ok(packets) => {
                    if let Err(err) = self.route(packets) {
                        return Err(self.stopped(err));
                    }
                }
                Err(err) => {
                    debug!(%err, "discarding undecodable frame");
                    self.shared.stats.lock().decode_errors += 1;
                }
            }
            self.publish_frame_stats();
        }

        debug!("receiver stopped on request");
        Ok(())
    }

    /// Queue what some connection wants and drop the rest.
    ///
    /// The registry lock is held across the enqueue so a connection being
    /// removed can never have packets queued after its purge.
    fn route(&self, packets: Vec<Packet>) -> Result<()> {
        let registry = self.shared.registry.lock();
        let (routed, dropped): (Vec<_>, Vec<_>) =
            packets.into_iter().partition(|p| registry.routes(p));

        for packet in &dropped {
            debug!(kind = packet.packet_type().as_str(), "no connection for packet");
        }

        let queued = routed.len() as u64;
        if !routed.is_empty() {
            trace!(count = routed.len(), "queueing packets");
            self.shared.queue.enqueue_all(routed)?;
        }
        drop(registry);

        let mut stats = self.shared.stats.lock();
        stats.packets_queued += queued;
        stats.packets_dropped += dropped.len() as u64;
        Ok(())
    }

    /// Record the final counters and log why the loop is ending.
    fn stopped(&self, err: SessionError) -> SessionError {
        self.publish_frame_stats();
        error!(%err, "receiver stopped");
        err
    }

    fn publish_frame_stats(&self) {
        self.shared.stats.lock().frames = self.reader.stats();
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::os::unix::net::UnixStream;

    use bytes::BytesMut;
    use xbeeprims_frame::encode_frame;

    use super::*;

    fn receiver_pair() -> (Receiver<UnixStream>, UnixStream) {
        let (host, module) = UnixStream::pair().unwrap();
        let receiver = Receiver::new(
            FrameReader::new(host),
            Arc::new(Shared::default()),
            Arc::new(AtomicBool::new(false)),
        );
        (receiver, module)
    }

    #[test]
    fn stopping_publishes_frames_read_so_far() {
        let (mut receiver, mut module) = receiver_pair();
        let mut buf = BytesMut::new();
        encode_frame(api::MODEM_STATUS, &[0x06], &mut buf).unwrap();
        module.write_all(&buf).unwrap();
        receiver.reader.read_frame().unwrap();
        assert_eq!(receiver.shared.stats.lock().frames.frames, 0);

        let err = receiver.stopped(SessionError::ReceiverPanicked);

        assert!(matches!(err, SessionError::ReceiverPanicked));
        assert_eq!(receiver.shared.stats.lock().frames.frames, 1);
    }

    #[test]
    fn closed_stream_stops_with_an_error() {
        let (receiver, module) = receiver_pair();
        let shared = Arc::clone(&receiver.shared);
        drop(module);

        let result = receiver.run();

        assert!(matches!(
            result,
            Err(SessionError::Frame(FrameError::ConnectionClosed))
        ));
        assert_eq!(shared.stats.lock().packets_queued, 0);
    }
}
