// lib.rs
//
// Synchronous Modbus/TCP client: one blocking request/response exchange
// at a time over a single TCP connection.

mod client;
pub mod constants;
mod core;
mod modbus_tcp;
mod transport;
pub mod utils;

pub use client::{ModbusClient, ModbusClientBuilder};
pub use crate::core::{ModbusRequest, ModbusUnitError, RegisterType};
pub use modbus_tcp::{MbapHeader, Pdu, build_frame, hex_dump, parse_body};
pub use transport::TcpTransport;

pub type ModbusResult<T> = Result<T, ModbusError>;

/// Coarse category of a failed request
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller supplied arguments outside protocol bounds, nothing was sent
    Argument,
    /// Resolve, connect, send or receive failure
    Connection,
    /// Response failed structural validation
    Framing,
    /// Well formed exception response from the server
    Exception,
    /// Write acknowledged with a different address or value
    WriteMismatch,
}

#[derive(Debug, thiserror::Error)]
pub enum ModbusError {
    #[error("Invalid host: {0}")]
    InvalidHost(String),

    #[error("Invalid port: {0}")]
    InvalidPort(u16),

    #[error("Invalid timeout: must be greater than zero")]
    InvalidTimeout,

    #[error("Unable to connect to {host}:{port}: {reason}")]
    ConnectFailed { host: String, port: u16, reason: String },

    #[error("Not connected")]
    NotConnected,

    #[error("Timeout after {timeout_ms}ms waiting for data")]
    Timeout { timeout_ms: u64 },

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame too short")]
    FrameTooShort,

    #[error("Transaction ID mismatch: expected {expected:#06x}, received {received:#06x}")]
    TransactionIdMismatch { expected: u16, received: u16 },

    #[error("Invalid protocol ID: {0}")]
    InvalidProtocolId(u16),

    #[error("Invalid MBAP length: {0}")]
    InvalidLength(u16),

    #[error("Unit ID mismatch: expected {expected}, received {received}")]
    UnitIdMismatch { expected: u8, received: u8 },

    #[error("Modbus exception: function code {function:#x}, exception code {code:#x}")]
    Exception { function: u8, code: u8 },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ModbusUnitError),
}

impl ModbusError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModbusError::InvalidHost(_) | ModbusError::InvalidPort(_) | ModbusError::InvalidTimeout => {
                ErrorKind::Argument
            }
            ModbusError::ConnectFailed { .. }
            | ModbusError::NotConnected
            | ModbusError::Timeout { .. }
            | ModbusError::ConnectionClosed
            | ModbusError::Io(_) => ErrorKind::Connection,
            ModbusError::FrameTooShort
            | ModbusError::TransactionIdMismatch { .. }
            | ModbusError::InvalidProtocolId(_)
            | ModbusError::InvalidLength(_)
            | ModbusError::UnitIdMismatch { .. } => ErrorKind::Framing,
            ModbusError::Exception { .. } => ErrorKind::Exception,
            ModbusError::Protocol(err) => err.kind(),
        }
    }

    pub fn is_argument_error(&self) -> bool {
        self.kind() == ErrorKind::Argument
    }

    pub fn is_connection_error(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }

    pub fn is_framing_error(&self) -> bool {
        self.kind() == ErrorKind::Framing
    }

    pub fn is_exception(&self) -> bool {
        self.kind() == ErrorKind::Exception
    }

    /// Exception code carried by a server exception response
    pub fn exception_code(&self) -> Option<u8> {
        match self {
            ModbusError::Exception { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the byte stream can no longer be trusted after this error
    pub fn closes_connection(&self) -> bool {
        matches!(self.kind(), ErrorKind::Connection | ErrorKind::Framing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ModbusError::NotConnected.closes_connection());
        assert!(ModbusError::InvalidProtocolId(1).is_framing_error());

        let exception = ModbusError::Exception { function: 0x83, code: 2 };
        assert!(exception.is_exception());
        assert!(!exception.closes_connection());
        assert_eq!(exception.exception_code(), Some(2));
        assert_eq!(exception.to_string(), "Modbus exception: function code 0x83, exception code 0x2");

        let argument = ModbusError::from(ModbusUnitError::InvalidQuantity(126, 125));
        assert!(argument.is_argument_error());
        assert!(!argument.closes_connection());

        let mismatch = ModbusError::from(ModbusUnitError::WriteMismatch {
            address: 10,
            value: 0xFF00,
            echoed_address: 10,
            echoed_value: 0,
        });
        assert_eq!(mismatch.kind(), ErrorKind::WriteMismatch);
        assert!(!mismatch.closes_connection());

        let short = ModbusError::from(ModbusUnitError::InvalidResponseLength { expected: 4, actual: 3 });
        assert!(short.closes_connection());
    }
}
