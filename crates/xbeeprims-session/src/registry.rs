use tracing::debug;
use xbeeprims_packet::{Address, Packet};

use crate::connection::{Connection, ConnectionFlags, ConnectionHandle, ConnectionType};
use crate::error::Result;

/// Live connections in creation order.
#[derive(Debug, Default)]
pub struct Registry {
    connections: Vec<Connection>,
    next_handle: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the connection for a request, or create it.
    ///
    /// Returns the connection and whether it was newly created. Lookup runs
    /// in creation order and the first hit wins: modem status is a
    /// singleton, TX status and local AT are keyed by frame id alone, and
    /// every other type by (type, frame id, address).
    pub fn create_or_get(
        &mut self,
        frame_id: u8,
        requested: ConnectionType,
        address: Address,
    ) -> Result<(Connection, bool)> {
        let connection_type = requested.normalize();
        let address = connection_type.resolve_address(address)?;

        let existing = self.connections.iter().find(|c| {
            if c.connection_type != connection_type {
                return false;
            }
            match connection_type {
                ConnectionType::ModemStatus => true,
                ConnectionType::TxStatus | ConnectionType::LocalAt => c.frame_id == frame_id,
                _ => c.frame_id == frame_id && c.address == address,
            }
        });
        if let Some(found) = existing {
            return Ok((found.clone(), false));
        }

        self.connections.try_reserve(1)?;
        self.next_handle += 1;
        let connection = Connection {
            handle: ConnectionHandle(self.next_handle),
            connection_type,
            frame_id,
            address,
            flags: ConnectionFlags::default(),
        };
        self.connections.push(connection.clone());
        debug!(
            handle = %connection.handle,
            kind = %connection_type,
            frame_id,
            %address,
            "connection created"
        );
        Ok((connection, true))
    }

    /// Unlink a connection, returning it if it was live.
    pub fn remove(&mut self, handle: ConnectionHandle) -> Option<Connection> {
        let index = self.connections.iter().position(|c| c.handle == handle)?;
        Some(self.connections.remove(index))
    }

    pub fn get(&self, handle: ConnectionHandle) -> Option<&Connection> {
        self.connections.iter().find(|c| c.handle == handle)
    }

    pub fn get_mut(&mut self, handle: ConnectionHandle) -> Option<&mut Connection> {
        self.connections.iter_mut().find(|c| c.handle == handle)
    }

    /// True if some live connection would accept `packet`.
    pub fn routes(&self, packet: &Packet) -> bool {
        self.connections.iter().any(|c| c.matches(packet))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
