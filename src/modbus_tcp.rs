use super::*;
use crate::constants::{EXCEPTION_FLAG, MBAP_HEADER_LEN, PROTOCOL_ID};

/// Modbus Application Protocol header
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MbapHeader {
    pub transaction_id: u16,
    pub protocol_id: u16,
    /// Bytes following the length field: unit id plus PDU
    pub length: u16,
    pub unit_id: u8,
}

impl MbapHeader {
    /// Decode the first 7 bytes of `frame`. Field values are not validated.
    pub fn parse(frame: &[u8]) -> Result<MbapHeader, ModbusError> {
        if frame.len() < MBAP_HEADER_LEN {
            return Err(ModbusError::FrameTooShort);
        }
        Ok(MbapHeader {
            transaction_id: u16::from_be_bytes([frame[0], frame[1]]),
            protocol_id: u16::from_be_bytes([frame[2], frame[3]]),
            length: u16::from_be_bytes([frame[4], frame[5]]),
            unit_id: frame[6],
        })
    }

    pub fn to_bytes(&self) -> [u8; MBAP_HEADER_LEN] {
        let tid = self.transaction_id.to_be_bytes();
        let pid = self.protocol_id.to_be_bytes();
        let len = self.length.to_be_bytes();
        [tid[0], tid[1], pid[0], pid[1], len[0], len[1], self.unit_id]
    }
}

/// Wrap a function code and body into a complete Modbus/TCP frame
pub fn build_frame(function_code: u8, body: &[u8], transaction_id: u16, unit_id: u8) -> Vec<u8> {
    // unit id + function code + body
    let length = (body.len() + 2) as u16;
    let header = MbapHeader { transaction_id, protocol_id: PROTOCOL_ID, length, unit_id };

    let mut frame = Vec::with_capacity(MBAP_HEADER_LEN + 1 + body.len());
    frame.extend_from_slice(&header.to_bytes());
    frame.push(function_code);
    frame.extend_from_slice(body);
    frame
}

/// Function code and payload of a received PDU
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pdu<'a> {
    pub function_code: u8,
    pub payload: &'a [u8],
}

impl Pdu<'_> {
    pub fn is_exception(&self) -> bool {
        self.function_code > EXCEPTION_FLAG
    }

    /// Exception code of an exception response, not interpreted
    pub fn exception_code(&self) -> Option<u8> {
        if self.is_exception() {
            Some(self.payload.first().copied().unwrap_or(0))
        } else {
            None
        }
    }
}

/// Split a PDU into function code and payload
pub fn parse_body(pdu: &[u8]) -> Result<Pdu<'_>, ModbusError> {
    let (&function_code, payload) = pdu.split_first().ok_or(ModbusError::FrameTooShort)?;
    Ok(Pdu { function_code, payload })
}

/// Render a frame as `[MBAP] PDU` hex bytes
pub fn hex_dump(frame: &[u8]) -> String {
    let mut dump = String::with_capacity(frame.len() * 3 + 2);
    for (i, byte) in frame.iter().enumerate() {
        if i > 0 {
            dump.push(' ');
        }
        if i == 0 && frame.len() >= MBAP_HEADER_LEN {
            dump.push('[');
        }
        dump.push_str(&format!("{:02X}", byte));
        if i == MBAP_HEADER_LEN - 1 {
            dump.push(']');
        }
    }
    dump
}
