use thiserror::Error;

use crate::ErrorKind;
use crate::constants::*;

#[derive(Debug, Error)]
pub enum ModbusUnitError {
    #[error("Invalid quantity: {0} not in 1..={1}")]
    InvalidQuantity(usize, u16),

    #[error("Invalid range: {0} + {1} = {2} > 65536")]
    RangeToMatch(u16, usize, u32),

    #[error("Empty response received")]
    EmptyResponse,

    #[error("Unexpected function code: expected {0:#x}, got {1:#x}")]
    UnexpectedFunctionCode(u8, u8),

    #[error("Byte count mismatch: byte count {byte_count}, expected at least {expected}, data bytes {actual}")]
    ByteCountMismatch { byte_count: usize, expected: usize, actual: usize },

    #[error("Invalid response length: expected {expected}, got {actual}")]
    InvalidResponseLength { expected: usize, actual: usize },

    #[error("Write not confirmed: sent {address}/{value:#06x}, echoed {echoed_address}/{echoed_value:#06x}")]
    WriteMismatch { address: u16, value: u16, echoed_address: u16, echoed_value: u16 },
}

impl ModbusUnitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModbusUnitError::InvalidQuantity(..) | ModbusUnitError::RangeToMatch(..) => ErrorKind::Argument,
            ModbusUnitError::WriteMismatch { .. } => ErrorKind::WriteMismatch,
            _ => ErrorKind::Framing,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegisterType {
    CoilRegister,
    DiscreteRegister,
    HoldingRegister,
    InputRegister,
}

impl RegisterType {
    pub fn read_command(&self) -> u8 {
        match self {
            RegisterType::CoilRegister => READ_COILS,
            RegisterType::DiscreteRegister => READ_DISCRETE_INPUTS,
            RegisterType::HoldingRegister => READ_HOLDING_REGISTERS,
            RegisterType::InputRegister => READ_INPUT_REGISTERS,
        }
    }

    fn max_read(&self) -> u16 {
        match self {
            RegisterType::CoilRegister | RegisterType::DiscreteRegister => MAX_READ_BITS,
            RegisterType::HoldingRegister | RegisterType::InputRegister => MAX_READ_REGISTERS,
        }
    }
}

/// A validated request PDU: function code plus encoded body
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModbusRequest {
    function_code: u8,
    body: Vec<u8>,
}

impl ModbusRequest {
    /// Read `count` points of `register_type` starting at `address`
    pub fn read(register_type: RegisterType, address: u16, count: u16) -> Result<Self, ModbusUnitError> {
        check_range(address, count as usize, register_type.max_read())?;
        let mut body = Vec::with_capacity(4);
        body.extend_from_slice(&address.to_be_bytes());
        body.extend_from_slice(&count.to_be_bytes());
        Ok(ModbusRequest { function_code: register_type.read_command(), body })
    }

    pub fn write_single_coil(address: u16, value: bool) -> Self {
        let mut body = Vec::with_capacity(4);
        body.extend_from_slice(&address.to_be_bytes());
        body.extend_from_slice(&coil_value(value).to_be_bytes());
        ModbusRequest { function_code: WRITE_SINGLE_COIL, body }
    }

    pub fn write_single_register(address: u16, value: u16) -> Self {
        let mut body = Vec::with_capacity(4);
        body.extend_from_slice(&address.to_be_bytes());
        body.extend_from_slice(&value.to_be_bytes());
        ModbusRequest { function_code: WRITE_SINGLE_REGISTER, body }
    }

    pub fn write_multiple_coils(address: u16, values: &[bool]) -> Result<Self, ModbusUnitError> {
        check_range(address, values.len(), MAX_WRITE_BITS)?;
        let byte_count = values.len().div_ceil(8);
        let mut body = Vec::with_capacity(5 + byte_count);
        body.extend_from_slice(&address.to_be_bytes());
        body.extend_from_slice(&(values.len() as u16).to_be_bytes());
        body.push(byte_count as u8);

        // Pack bits into bytes, first coil in the low bit
        let mut bytes = vec![0u8; byte_count];
        for (i, &bit) in values.iter().enumerate() {
            if bit {
                bytes[i / 8] |= 1 << (i % 8);
            }
        }
        body.extend(bytes);
        Ok(ModbusRequest { function_code: WRITE_MULTIPLE_COILS, body })
    }

    pub fn write_multiple_registers(address: u16, values: &[u16]) -> Result<Self, ModbusUnitError> {
        check_range(address, values.len(), MAX_WRITE_REGISTERS)?;
        let mut body = Vec::with_capacity(5 + values.len() * 2);
        body.extend_from_slice(&address.to_be_bytes());
        body.extend_from_slice(&(values.len() as u16).to_be_bytes());
        body.push((values.len() * 2) as u8);
        for value in values {
            body.extend_from_slice(&value.to_be_bytes());
        }
        Ok(ModbusRequest { function_code: WRITE_MULTIPLE_REGISTERS, body })
    }

    pub fn function_code(&self) -> u8 {
        self.function_code
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Wire value of a single coil write
pub fn coil_value(value: bool) -> u16 {
    if value { 0xFF00 } else { 0x0000 }
}

fn check_range(address: u16, count: usize, max: u16) -> Result<(), ModbusUnitError> {
    if count < 1 || count > max as usize {
        return Err(ModbusUnitError::InvalidQuantity(count, max));
    }
    let end_addr = address as u32 + count as u32;
    if end_addr > ADDRESS_SPACE {
        return Err(ModbusUnitError::RangeToMatch(address, count, end_addr));
    }
    Ok(())
}

/// Decode a coil or discrete input read response payload (after the function code)
pub fn parse_bits(count: u16, payload: &[u8]) -> Result<Vec<bool>, ModbusUnitError> {
    let data = split_byte_count(payload, (count as usize).div_ceil(8))?;
    let bits = (0..count as usize).map(|i| (data[i / 8] >> (i % 8)) & 0x01 != 0).collect();
    Ok(bits)
}

/// Decode a holding or input register read response payload
pub fn parse_registers(count: u16, payload: &[u8]) -> Result<Vec<u16>, ModbusUnitError> {
    let data = split_byte_count(payload, count as usize * 2)?;
    let registers = data
        .chunks_exact(2)
        .take(count as usize)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    Ok(registers)
}

// The byte count must cover the requested points and match the bytes actually received.
fn split_byte_count(payload: &[u8], expected: usize) -> Result<&[u8], ModbusUnitError> {
    let (&byte_count, data) = payload.split_first().ok_or(ModbusUnitError::EmptyResponse)?;
    let byte_count = byte_count as usize;
    if byte_count < expected || byte_count != data.len() {
        return Err(ModbusUnitError::ByteCountMismatch { byte_count, expected, actual: data.len() });
    }
    Ok(data)
}

/// Split a write acknowledgement into its echoed address and value/quantity
pub fn parse_write_echo(payload: &[u8]) -> Result<(u16, u16), ModbusUnitError> {
    if payload.len() != 4 {
        return Err(ModbusUnitError::InvalidResponseLength { expected: 4, actual: payload.len() });
    }
    let address = u16::from_be_bytes([payload[0], payload[1]]);
    let value = u16::from_be_bytes([payload[2], payload[3]]);
    Ok((address, value))
}

/// Confirm a write acknowledgement. Multiple writes only confirm the address.
pub fn check_write_echo(address: u16, value: u16, payload: &[u8], check_value: bool) -> Result<(), ModbusUnitError> {
    let (echoed_address, echoed_value) = parse_write_echo(payload)?;
    if echoed_address != address || (check_value && echoed_value != value) {
        return Err(ModbusUnitError::WriteMismatch { address, value, echoed_address, echoed_value });
    }
    Ok(())
}
