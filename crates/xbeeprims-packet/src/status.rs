//! Status codes reported by the module, with readable names.

use std::fmt;

use serde::Serialize;

macro_rules! status_code {
    ($(#[$meta:meta])* $name:ident { $($code:literal => $label:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub u8);

        impl $name {
            /// Readable name, if the code is one the module documents.
            pub fn name(&self) -> Option<&'static str> {
                match self.0 {
                    $($code => Some($label),)*
                    _ => None,
                }
            }
        }

        impl From<u8> for $name {
            fn from(code: u8) -> Self {
                Self(code)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.name() {
                    Some(name) => f.write_str(name),
                    None => write!(f, "unknown (0x{:02X})", self.0),
                }
            }
        }
    };
}

status_code! {
    /// Network state change reported in a modem status frame.
    ModemStatus {
        0 => "hardware reset",
        1 => "watchdog reset",
        2 => "associated",
        3 => "disassociated",
        4 => "sync lost",
        5 => "coordinator realignment",
        6 => "coordinator started",
    }
}

status_code! {
    /// Outcome of a local or remote AT command.
    AtStatus {
        0 => "OK",
        1 => "error",
        2 => "invalid command",
        3 => "invalid parameter",
        4 => "no response",
    }
}

status_code! {
    /// Delivery outcome of a transmit request.
    TxStatus {
        0 => "success",
        1 => "no ACK",
        2 => "CCA failure",
        3 => "purged",
    }
}

impl AtStatus {
    pub fn is_ok(&self) -> bool {
        self.0 == 0
    }
}

impl TxStatus {
    pub fn is_success(&self) -> bool {
        self.0 == 0
    }
}
