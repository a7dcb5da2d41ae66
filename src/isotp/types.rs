use crate::can::Frame;
use std::time::Duration;

/// Parameters the receiver sends back in a flow control frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FlowControlConfig {
    /// Consecutive frames to send before waiting for the next flow control, 0 for no limit
    pub block_size: u8,
    pub separation_time_min: Duration,
}

impl TryFrom<&Frame> for FlowControlConfig {
    type Error = crate::error::Error;
    fn try_from(frame: &Frame) -> Result<Self, Self::Error> {
        let data = frame.data();
        if data.len() < 3 {
            return Err(crate::isotp::error::Error::MalformedFrame.into());
        }

        let block_size = data[1];

        let separation_time_min = data[2] as u64;
        let separation_time_min = match separation_time_min {
            0x0..=0x7f => Duration::from_millis(separation_time_min),
            0xf1..=0xf9 => Duration::from_micros((separation_time_min - 0xf0) * 100),
            _ => return Err(crate::isotp::error::Error::MalformedFrame.into()),
        };

        Ok(Self {
            block_size,
            separation_time_min,
        })
    }
}
