use strum_macros::FromRepr;

/// Protocol control information, upper nibble of the first byte.
#[derive(Debug, PartialEq, Copy, Clone, FromRepr)]
#[repr(u8)]
pub enum FrameType {
    Single = 0x00,
    First = 0x10,
    Consecutive = 0x20,
    FlowControl = 0x30,
}

pub static FRAME_TYPE_MASK: u8 = 0xf0;

/// Flow status, lower nibble of a flow control frame.
#[derive(Debug, PartialEq, Copy, Clone, FromRepr)]
#[repr(u8)]
pub enum FlowStatus {
    ContinueToSend = 0x0,
    Wait = 0x1,
    Overflow = 0x2,
}

/// Longest payload without the CAN-FD escape sequence
pub const MAX_PAYLOAD_LEN: usize = 0xfff;
