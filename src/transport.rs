use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, trace};

use super::*;

/// Blocking TCP socket used for one Modbus exchange at a time
#[derive(Debug, Default)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new() -> Self {
        TcpTransport { stream: None }
    }

    /// Resolve `host` and connect to the first candidate address that accepts.
    ///
    /// An already open socket is closed first. When every candidate fails no
    /// socket is retained.
    pub fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> ModbusResult<()> {
        self.disconnect();

        let connect_failed = |reason: String| ModbusError::ConnectFailed { host: host.to_string(), port, reason };
        let candidates = (host, port)
            .to_socket_addrs()
            .map_err(|e| connect_failed(format!("resolve error: {}", e)))?;

        let mut last_reason = String::from("no address resolved");
        for addr in candidates {
            match TcpStream::connect_timeout(&addr, timeout).and_then(|stream| {
                stream.set_write_timeout(Some(timeout))?;
                stream.set_nodelay(true)?;
                Ok(stream)
            }) {
                Ok(stream) => {
                    debug!("connected to {}", addr);
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(e) => {
                    debug!("connect to {} failed: {}", addr, e);
                    last_reason = e.to_string();
                }
            }
        }
        Err(connect_failed(last_reason))
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Close the socket. Returns `false` if it was already closed.
    pub fn disconnect(&mut self) -> bool {
        match self.stream.take() {
            Some(stream) => {
                // the peer may already be gone, nothing left to report
                let _ = stream.shutdown(Shutdown::Both);
                trace!("socket closed");
                true
            }
            None => false,
        }
    }

    /// Block until data (or EOF) is pending on the socket.
    ///
    /// A timeout closes the connection: the rest of the frame cannot be
    /// trusted to arrive in order afterwards.
    pub fn wait_readable(&mut self, timeout: Duration) -> ModbusResult<()> {
        let stream = self.stream.as_ref().ok_or(ModbusError::NotConnected)?;
        let result = stream.set_read_timeout(Some(timeout)).and_then(|_| {
            let mut probe = [0u8; 1];
            loop {
                match stream.peek(&mut probe) {
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    other => return other,
                }
            }
        });

        match result {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                debug!("timeout error");
                self.disconnect();
                Err(ModbusError::Timeout { timeout_ms: timeout.as_millis() as u64 })
            }
            Err(e) => {
                self.disconnect();
                Err(ModbusError::Io(e))
            }
        }
    }

    /// Write the whole buffer. Any failure closes the connection.
    pub fn send_all(&mut self, data: &[u8]) -> ModbusResult<()> {
        let stream = self.stream.as_mut().ok_or(ModbusError::NotConnected)?;
        if let Err(e) = stream.write_all(data).and_then(|_| stream.flush()) {
            debug!("send error: {}", e);
            self.disconnect();
            return Err(ModbusError::Io(e));
        }
        Ok(())
    }

    /// Read exactly `size` bytes, accumulating short reads.
    ///
    /// EOF or an error before `size` bytes arrive closes the connection.
    pub fn recv_exact(&mut self, size: usize, timeout: Duration) -> ModbusResult<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        let mut filled = 0;
        while filled < size {
            self.wait_readable(timeout)?;
            let stream = self.stream.as_mut().ok_or(ModbusError::NotConnected)?;
            match stream.read(&mut buffer[filled..]) {
                Ok(0) => {
                    debug!("recv error: connection closed after {} of {} bytes", filled, size);
                    self.disconnect();
                    return Err(ModbusError::ConnectionClosed);
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("recv error: {}", e);
                    self.disconnect();
                    return Err(ModbusError::Io(e));
                }
            }
        }
        Ok(buffer)
    }
}
