use std::net::IpAddr;
use std::time::Duration;

use log::{debug, warn};

use super::*;
use crate::constants::{DEFAULT_TIMEOUT_SECS, MAX_RESPONSE_LENGTH, MBAP_HEADER_LEN, MODBUS_PORT, PROTOCOL_ID};
use crate::core::{check_write_echo, coil_value, parse_bits, parse_registers};

pub struct ModbusClientBuilder {
    host: String,
    port: u16,
    unit_id: u8,
    timeout: Duration,
    debug: bool,
    auto_open: bool,
    auto_close: bool,
}

impl ModbusClientBuilder {
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn auto_open(mut self, auto_open: bool) -> Self {
        self.auto_open = auto_open;
        self
    }

    pub fn auto_close(mut self, auto_close: bool) -> Self {
        self.auto_close = auto_close;
        self
    }

    pub fn build(self) -> ModbusResult<ModbusClient> {
        if !is_valid_host(&self.host) {
            return Err(ModbusError::InvalidHost(self.host));
        }
        if self.port == 0 {
            return Err(ModbusError::InvalidPort(self.port));
        }
        if self.timeout.is_zero() {
            return Err(ModbusError::InvalidTimeout);
        }
        Ok(ModbusClient {
            host: self.host,
            port: self.port,
            unit_id: self.unit_id,
            timeout: self.timeout,
            debug: self.debug,
            auto_open: self.auto_open,
            auto_close: self.auto_close,
            state: ConnectionState::default(),
        })
    }
}

/// IP literal, or a DNS style name like `plc.domain.net`
fn is_valid_host(host: &str) -> bool {
    if host.parse::<IpAddr>().is_ok() {
        return true;
    }
    let mut chars = host.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    let rest = chars.as_str();
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

#[derive(Debug, Default)]
struct ConnectionState {
    transport: TcpTransport,
    transaction_id: u16,
    last_exception: Option<u8>,
    last_error: Option<ErrorKind>,
}

/// Modbus/TCP client, one outstanding request at a time
pub struct ModbusClient {
    host: String,
    port: u16,
    unit_id: u8,
    timeout: Duration,
    debug: bool,
    auto_open: bool,
    auto_close: bool,
    state: ConnectionState,
}

impl ModbusClient {
    /// Builder with defaults: `localhost:502`, unit id 1, 30 s timeout
    pub fn builder() -> ModbusClientBuilder {
        ModbusClientBuilder {
            host: String::from("localhost"),
            port: MODBUS_PORT,
            unit_id: 1,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            debug: false,
            auto_open: false,
            auto_close: false,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Change the server host. An open connection to the previous host is closed.
    pub fn set_host(&mut self, host: &str) -> ModbusResult<()> {
        if host == self.host {
            return Ok(());
        }
        if !is_valid_host(host) {
            return Err(ModbusError::InvalidHost(host.to_string()));
        }
        self.close();
        self.host = host.to_string();
        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Change the server port. An open connection to the previous port is closed.
    pub fn set_port(&mut self, port: u16) -> ModbusResult<()> {
        if port == self.port {
            return Ok(());
        }
        if port == 0 {
            return Err(ModbusError::InvalidPort(port));
        }
        self.close();
        self.port = port;
        Ok(())
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    pub fn set_unit_id(&mut self, unit_id: u8) {
        self.unit_id = unit_id;
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> ModbusResult<()> {
        if timeout.is_zero() {
            return Err(ModbusError::InvalidTimeout);
        }
        self.timeout = timeout;
        Ok(())
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn auto_open(&self) -> bool {
        self.auto_open
    }

    pub fn set_auto_open(&mut self, auto_open: bool) {
        self.auto_open = auto_open;
    }

    pub fn auto_close(&self) -> bool {
        self.auto_close
    }

    pub fn set_auto_close(&mut self, auto_close: bool) {
        self.auto_close = auto_close;
    }

    /// Exception code of the most recent exception response
    pub fn last_exception(&self) -> Option<u8> {
        self.state.last_exception
    }

    /// Category of the most recent failure, `None` after a successful request
    pub fn last_error(&self) -> Option<ErrorKind> {
        self.state.last_error
    }

    /// Connect to the server, restarting the connection if already open
    pub fn open(&mut self) -> ModbusResult<()> {
        let result = self.state.transport.connect(&self.host, self.port, self.timeout);
        if let Err(e) = &result {
            self.debug_msg(&format!("connect error: {}", e));
        }
        result
    }

    pub fn is_open(&self) -> bool {
        self.state.transport.is_open()
    }

    /// Close the connection. Returns `false` if it was not open.
    pub fn close(&mut self) -> bool {
        self.state.transport.disconnect()
    }

    /// Modbus function READ_COILS (0x01)
    pub fn read_coils(&mut self, address: u16, count: u16) -> ModbusResult<Vec<bool>> {
        let request = ModbusRequest::read(RegisterType::CoilRegister, address, count);
        self.transact(request, |payload| parse_bits(count, payload))
    }

    /// Modbus function READ_DISCRETE_INPUTS (0x02)
    pub fn read_discrete_inputs(&mut self, address: u16, count: u16) -> ModbusResult<Vec<bool>> {
        let request = ModbusRequest::read(RegisterType::DiscreteRegister, address, count);
        self.transact(request, |payload| parse_bits(count, payload))
    }

    /// Modbus function READ_HOLDING_REGISTERS (0x03)
    pub fn read_holding_registers(&mut self, address: u16, count: u16) -> ModbusResult<Vec<u16>> {
        let request = ModbusRequest::read(RegisterType::HoldingRegister, address, count);
        self.transact(request, |payload| parse_registers(count, payload))
    }

    /// Modbus function READ_INPUT_REGISTERS (0x04)
    pub fn read_input_registers(&mut self, address: u16, count: u16) -> ModbusResult<Vec<u16>> {
        let request = ModbusRequest::read(RegisterType::InputRegister, address, count);
        self.transact(request, |payload| parse_registers(count, payload))
    }

    /// Modbus function WRITE_SINGLE_COIL (0x05)
    pub fn write_single_coil(&mut self, address: u16, value: bool) -> ModbusResult<()> {
        let request = ModbusRequest::write_single_coil(address, value);
        self.transact(Ok(request), |payload| check_write_echo(address, coil_value(value), payload, true))
    }

    /// Modbus function WRITE_SINGLE_REGISTER (0x06)
    pub fn write_single_register(&mut self, address: u16, value: u16) -> ModbusResult<()> {
        let request = ModbusRequest::write_single_register(address, value);
        self.transact(Ok(request), |payload| check_write_echo(address, value, payload, true))
    }

    /// Modbus function WRITE_MULTIPLE_COILS (0x0F)
    pub fn write_multiple_coils(&mut self, address: u16, values: &[bool]) -> ModbusResult<()> {
        let request = ModbusRequest::write_multiple_coils(address, values);
        let count = values.len() as u16;
        self.transact(request, |payload| check_write_echo(address, count, payload, false))
    }

    /// Modbus function WRITE_MULTIPLE_REGISTERS (0x10)
    pub fn write_multiple_registers(&mut self, address: u16, values: &[u16]) -> ModbusResult<()> {
        let request = ModbusRequest::write_multiple_registers(address, values);
        let count = values.len() as u16;
        self.transact(request, |payload| check_write_echo(address, count, payload, false))
    }

    /// Run one request/response cycle and decode the response payload.
    ///
    /// Argument errors leave the connection untouched. Connection and framing
    /// errors close it; exceptions and write mismatches keep it open.
    fn transact<T, F>(&mut self, request: Result<ModbusRequest, ModbusUnitError>, decode: F) -> ModbusResult<T>
    where
        F: FnOnce(&[u8]) -> Result<T, ModbusUnitError>,
    {
        let result = match request {
            Ok(request) => self
                .exchange(&request)
                .and_then(|payload| decode(&payload).map_err(ModbusError::from)),
            Err(e) => Err(ModbusError::from(e)),
        };

        match &result {
            Ok(_) => self.state.last_error = None,
            Err(e) => {
                self.state.last_error = Some(e.kind());
                self.debug_msg(&e.to_string());
                if e.closes_connection() && self.close() && self.debug {
                    warn!("connection closed after error: {}", e);
                }
            }
        }
        result
    }

    /// Send `request` and return the payload of a matching, non-exception response
    fn exchange(&mut self, request: &ModbusRequest) -> ModbusResult<Vec<u8>> {
        if self.auto_open && !self.is_open() {
            self.open()?;
        }
        if !self.is_open() {
            return Err(ModbusError::NotConnected);
        }

        let transaction_id = rand::random::<u16>();
        self.state.transaction_id = transaction_id;
        let frame = build_frame(request.function_code(), request.body(), transaction_id, self.unit_id);
        self.state.transport.send_all(&frame)?;
        self.dump("Tx", &frame);

        let mut rx_frame = self.state.transport.recv_exact(MBAP_HEADER_LEN, self.timeout)?;
        let header = MbapHeader::parse(&rx_frame)?;
        if let Err(e) = self.check_header(&header) {
            self.dump("Rx", &rx_frame);
            return Err(e);
        }

        // the unit id was already read as part of the header
        let body_len = (header.length as usize).saturating_sub(1);
        if body_len < 2 {
            self.dump("Rx", &rx_frame);
            return Err(ModbusError::FrameTooShort);
        }
        let body = self.state.transport.recv_exact(body_len, self.timeout)?;
        rx_frame.extend_from_slice(&body);
        self.dump("Rx", &rx_frame);

        if self.auto_close {
            self.close();
        }

        let pdu = parse_body(&body)?;
        if let Some(code) = pdu.exception_code() {
            self.state.last_exception = Some(code);
            return Err(ModbusError::Exception { function: pdu.function_code, code });
        }
        if pdu.function_code != request.function_code() {
            return Err(ModbusUnitError::UnexpectedFunctionCode(request.function_code(), pdu.function_code).into());
        }
        Ok(pdu.payload.to_vec())
    }

    fn check_header(&self, header: &MbapHeader) -> ModbusResult<()> {
        if header.transaction_id != self.state.transaction_id {
            return Err(ModbusError::TransactionIdMismatch {
                expected: self.state.transaction_id,
                received: header.transaction_id,
            });
        }
        if header.protocol_id != PROTOCOL_ID {
            return Err(ModbusError::InvalidProtocolId(header.protocol_id));
        }
        if header.length >= MAX_RESPONSE_LENGTH {
            return Err(ModbusError::InvalidLength(header.length));
        }
        if header.unit_id != self.unit_id {
            return Err(ModbusError::UnitIdMismatch { expected: self.unit_id, received: header.unit_id });
        }
        Ok(())
    }

    fn dump(&self, label: &str, frame: &[u8]) {
        if self.debug {
            debug!("{} {}", label, hex_dump(frame));
        }
    }

    fn debug_msg(&self, msg: &str) {
        if self.debug {
            debug!("{}", msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_validation() {
        assert!(is_valid_host("localhost"));
        assert!(is_valid_host("plc.domain.net"));
        assert!(is_valid_host("192.168.0.10"));
        assert!(is_valid_host("::1"));
        assert!(!is_valid_host(""));
        assert!(!is_valid_host("a"));
        assert!(!is_valid_host("1plc"));
        assert!(!is_valid_host("plc_01"));
    }

    #[test]
    fn test_builder_defaults_and_validation() {
        let client = ModbusClient::builder().build().unwrap();
        assert_eq!(client.host(), "localhost");
        assert_eq!(client.port(), 502);
        assert_eq!(client.unit_id(), 1);
        assert_eq!(client.timeout(), Duration::from_secs(30));
        assert!(!client.is_open());
        assert!(!client.auto_open());
        assert!(!client.auto_close());

        assert!(matches!(ModbusClient::builder().port(0).build(), Err(ModbusError::InvalidPort(0))));
        assert!(matches!(ModbusClient::builder().host("bad host").build(), Err(ModbusError::InvalidHost(_))));
        assert!(matches!(
            ModbusClient::builder().timeout(Duration::ZERO).build(),
            Err(ModbusError::InvalidTimeout)
        ));
    }

    #[test]
    fn test_setters() {
        let mut client = ModbusClient::builder().build().unwrap();
        client.set_host("10.0.0.2").unwrap();
        assert_eq!(client.host(), "10.0.0.2");
        assert!(client.set_host("-bad").is_err());
        assert_eq!(client.host(), "10.0.0.2");

        client.set_port(1502).unwrap();
        assert_eq!(client.port(), 1502);
        assert!(client.set_port(0).is_err());

        client.set_unit_id(17);
        assert_eq!(client.unit_id(), 17);
        client.set_auto_open(true);
        client.set_auto_close(true);
        client.set_debug(true);
        assert!(client.auto_open() && client.auto_close() && client.debug());
        assert!(client.set_timeout(Duration::ZERO).is_err());
        assert!(!client.close());
    }

    #[test]
    fn test_request_on_closed_client() {
        let mut client = ModbusClient::builder().build().unwrap();
        let result = client.read_holding_registers(0, 1);
        assert!(matches!(result, Err(ModbusError::NotConnected)));
        assert_eq!(client.last_error(), Some(ErrorKind::Connection));

        let result = client.read_holding_registers(0, 126);
        assert!(matches!(result, Err(ModbusError::Protocol(ModbusUnitError::InvalidQuantity(126, 125)))));
        assert_eq!(client.last_error(), Some(ErrorKind::Argument));
    }
}
