// constants.rs

/// Default Modbus/TCP port
pub const MODBUS_PORT: u16 = 502;

/// Default socket timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const MBAP_HEADER_LEN: usize = 7;
pub const PROTOCOL_ID: u16 = 0;

/// Responses announcing a length field of this value or more are rejected
pub const MAX_RESPONSE_LENGTH: u16 = 256;

// function codes
pub const READ_COILS: u8 = 0x01;
pub const READ_DISCRETE_INPUTS: u8 = 0x02;
pub const READ_HOLDING_REGISTERS: u8 = 0x03;
pub const READ_INPUT_REGISTERS: u8 = 0x04;
pub const WRITE_SINGLE_COIL: u8 = 0x05;
pub const WRITE_SINGLE_REGISTER: u8 = 0x06;
pub const WRITE_MULTIPLE_COILS: u8 = 0x0F;
pub const WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Function codes above this value mark an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

// exception codes
pub const EXP_NONE: u8 = 0x00;
pub const EXP_ILLEGAL_FUNCTION: u8 = 0x01;
pub const EXP_DATA_ADDRESS: u8 = 0x02;
pub const EXP_DATA_VALUE: u8 = 0x03;
pub const EXP_SLAVE_DEVICE_FAILURE: u8 = 0x04;
pub const EXP_ACKNOWLEDGE: u8 = 0x05;
pub const EXP_SLAVE_DEVICE_BUSY: u8 = 0x06;
pub const EXP_NEGATIVE_ACKNOWLEDGE: u8 = 0x07;
pub const EXP_MEMORY_PARITY_ERROR: u8 = 0x08;
pub const EXP_GATEWAY_PATH_UNAVAILABLE: u8 = 0x0A;
pub const EXP_GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND: u8 = 0x0B;

// per-function quantity limits
pub const MAX_READ_BITS: u16 = 2000;
pub const MAX_READ_REGISTERS: u16 = 125;
pub const MAX_WRITE_BITS: u16 = 1968;
pub const MAX_WRITE_REGISTERS: u16 = 123;

/// One past the highest addressable point
pub const ADDRESS_SPACE: u32 = 0x10000;

/// Human readable text for a Modbus exception code
pub fn exception_message(code: u8) -> &'static str {
    match code {
        EXP_NONE => "no exception",
        EXP_ILLEGAL_FUNCTION => "illegal function",
        EXP_DATA_ADDRESS => "illegal data address",
        EXP_DATA_VALUE => "illegal data value",
        EXP_SLAVE_DEVICE_FAILURE => "slave device failure",
        EXP_ACKNOWLEDGE => "acknowledge",
        EXP_SLAVE_DEVICE_BUSY => "slave device busy",
        EXP_NEGATIVE_ACKNOWLEDGE => "negative acknowledge",
        EXP_MEMORY_PARITY_ERROR => "memory parity error",
        EXP_GATEWAY_PATH_UNAVAILABLE => "gateway path unavailable",
        EXP_GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND => "gateway target device failed to respond",
        _ => "unknown exception",
    }
}
