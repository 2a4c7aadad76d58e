use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};
use xbeeprims_frame::{FrameConfig, FrameReader, FrameWriter, MAX_PAYLOAD, MAX_REQUEST_DATA};
use xbeeprims_packet::{Address, Packet};
use xbeeprims_transport::Transport;

use crate::connection::{Connection, ConnectionFlags, ConnectionHandle, ConnectionType};
use crate::error::{Result, SessionError};
use crate::receiver::{Receiver, SessionStats, Shared};
use crate::request::build_request;

/// How long [`Session::get_packet_wait`] waits when callers have no better idea.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(1);

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Frame codec settings. `read_timeout` is replaced by `receive_tick`;
    /// the writer's `max_payload` is raised to fit request headers.
    pub frame: FrameConfig,
    /// Longest the receiver blocks in a read before checking for shutdown.
    pub receive_tick: Duration,
    /// Interval between queue polls in [`Session::get_packet_wait`].
    pub poll_interval: Duration,
    /// Name of the receiver thread.
    pub thread_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            receive_tick: Duration::from_millis(100),
            poll_interval: Duration::from_millis(50),
            thread_name: "xbee-rx".to_string(),
        }
    }
}

/// A live link to one radio module.
///
/// Owns the connection registry, the packet queue, the write half of the
/// transport and the receiver thread reading the other half. All methods
/// take `&self`; share the session between threads with `Arc` or scoped
/// threads. Dropping the session stops and joins the receiver.
pub struct Session<T: Transport> {
    shared: Arc<Shared>,
    writer: Mutex<FrameWriter<T>>,
    shutdown: Arc<AtomicBool>,
    receiver: Option<JoinHandle<Result<()>>>,
    config: SessionConfig,
}

impl<T: Transport> Session<T> {
    /// Start a session over `transport` with default configuration.
    pub fn setup(transport: T) -> Result<Self> {
        Self::setup_with_config(transport, SessionConfig::default())
    }

    /// Start a session with explicit configuration.
    pub fn setup_with_config(transport: T, config: SessionConfig) -> Result<Self> {
        let reader_half = transport.try_clone()?;
        let reader_config = FrameConfig {
            read_timeout: Some(config.receive_tick),
            ..config.frame.clone()
        };
        let reader = FrameReader::with_config_transport(reader_half, reader_config)?;
        let writer_config = FrameConfig {
            max_payload: config.frame.max_payload.max(MAX_REQUEST_DATA),
            ..config.frame.clone()
        };
        let writer = FrameWriter::with_config_transport(transport, writer_config)?;

        let shared = Arc::new(Shared::default());
        let shutdown = Arc::new(AtomicBool::new(false));
        let receiver = Receiver::new(reader, Arc::clone(&shared), Arc::clone(&shutdown));

        let handle = std::thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || receiver.run())
            .map_err(SessionError::Spawn)?;

        debug!(
            transport = writer.get_ref().transport_name(),
            thread = %config.thread_name,
            "session started"
        );

        Ok(Self {
            shared,
            writer: Mutex::new(writer),
            shutdown,
            receiver: Some(handle),
            config,
        })
    }

    /// Find or create a connection. See [`crate::Registry::create_or_get`].
    pub fn new_connection(
        &self,
        frame_id: u8,
        connection_type: ConnectionType,
        address: Address,
    ) -> Result<ConnectionHandle> {
        let (connection, created) =
            self.shared
                .registry
                .lock()
                .create_or_get(frame_id, connection_type, address)?;
        if !created {
            debug!(handle = %connection.handle, "reusing existing connection");
        }
        Ok(connection.handle)
    }

    /// Remove a connection and discard its queued packets.
    ///
    /// Returns how many packets were discarded. Frames arriving afterwards
    /// that only this connection wanted are dropped.
    pub fn end_connection(&self, handle: ConnectionHandle) -> Result<usize> {
        let mut registry = self.shared.registry.lock();
        let Some(connection) = registry.remove(handle) else {
            warn!(%handle, "end_connection on unknown connection");
            return Err(SessionError::UnknownConnection(handle));
        };
        let purged = self.shared.queue.purge(&connection);
        drop(registry);

        debug!(%handle, purged, "connection ended");
        Ok(purged)
    }

    /// Send `payload` through a connection.
    ///
    /// Nothing reaches the wire when the payload is over 100 bytes, the
    /// handle is stale or the connection cannot send.
    pub fn send(&self, handle: ConnectionHandle, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_PAYLOAD {
            return Err(SessionError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        let connection = self.connection(handle)?;
        let frame = build_request(&connection, payload)?;

        self.writer.lock().write_frame(&frame)?;
        debug!(%handle, frame_type = frame.frame_type, len = payload.len(), "sent");
        Ok(())
    }

    /// Take the oldest packet for a connection, if one is queued.
    pub fn get_packet(&self, handle: ConnectionHandle) -> Result<Option<Packet>> {
        let connection = self.connection(handle)?;
        Ok(self.shared.queue.dequeue_for(&connection))
    }

    /// Wait up to `timeout` for a packet for a connection.
    pub fn get_packet_wait(
        &self,
        handle: ConnectionHandle,
        timeout: Duration,
    ) -> Result<Option<Packet>> {
        let connection = self.connection(handle)?;
        Ok(self
            .shared
            .queue
            .dequeue_for_blocking(&connection, timeout, self.config.poll_interval))
    }

    /// Discard every queued packet for a connection, returning how many.
    pub fn flush(&self, handle: ConnectionHandle) -> Result<usize> {
        let connection = self.connection(handle)?;
        Ok(self.shared.queue.flush(&connection))
    }

    /// Snapshot of a connection.
    pub fn connection(&self, handle: ConnectionHandle) -> Result<Connection> {
        self.shared
            .registry
            .lock()
            .get(handle)
            .cloned()
            .ok_or(SessionError::UnknownConnection(handle))
    }

    /// Replace a connection's send flags.
    pub fn set_flags(&self, handle: ConnectionHandle, flags: ConnectionFlags) -> Result<()> {
        let mut registry = self.shared.registry.lock();
        let connection = registry
            .get_mut(handle)
            .ok_or(SessionError::UnknownConnection(handle))?;
        connection.flags = flags;
        Ok(())
    }

    /// Snapshot of every live connection in creation order.
    pub fn connections(&self) -> Vec<Connection> {
        self.shared.registry.lock().iter().cloned().collect()
    }

    /// Number of packets waiting in the queue.
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn stats(&self) -> SessionStats {
        *self.shared.stats.lock()
    }

    /// True while the receiver thread is alive.
    pub fn is_receiving(&self) -> bool {
        self.receiver
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Stop the receiver and wait for it.
    ///
    /// Returns the error that stopped the receiver early, if any.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::Release);
        let Some(handle) = self.receiver.take() else {
            return Ok(());
        };
        let result = handle.join().map_err(|_| SessionError::ReceiverPanicked)?;
        debug!("session stopped");
        result
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            debug!(%err, "receiver ended with error");
        }
    }
}
