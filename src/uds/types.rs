//! Types used in the UDS protocol.
use std::time::Duration;

/// Struct returned by DiagnosticSessionControl (0x10)
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionParameterRecord {
    /// Performance requirement for the server (i.e. the ECU) to start with the response message after the reception of a request message.
    pub p2_server_max: Duration,
    /// Performance requirement for the server (i.e. the ECU) to start with the response message after the transmission of a "ResponsePending" message.
    pub p2_star_server_max: Duration,
}

impl SessionParameterRecord {
    /// Parse the 4 byte record, P2 in 1 ms and P2* in 10 ms resolution.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        match *data {
            [p2_hi, p2_lo, p2_star_hi, p2_star_lo] => Some(Self {
                p2_server_max: Duration::from_millis(u16::from_be_bytes([p2_hi, p2_lo]) as u64),
                p2_star_server_max: Duration::from_millis(u16::from_be_bytes([p2_star_hi, p2_star_lo]) as u64 * 10),
            }),
            _ => None,
        }
    }
}
