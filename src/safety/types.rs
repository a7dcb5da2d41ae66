use crate::can::Frame;
use crate::error::Error;
use strum_macros::{EnumIter, FromRepr};

/// Logical CAN bus as wired through the harness.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, FromRepr, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Bus {
    /// Instrument / body bus
    Main = 0,
    /// Driver assistance bus
    Adas = 1,
    /// Bus behind the front camera
    Camera = 2,
}

impl TryFrom<u8> for Bus {
    type Error = Error;
    fn try_from(bus: u8) -> Result<Self, Self::Error> {
        Bus::from_repr(bus).ok_or(Error::UnknownBus(bus))
    }
}

impl From<Bus> for u8 {
    fn from(bus: Bus) -> u8 {
        bus as u8
    }
}

/// A message identified by address and bus, with its expected payload length.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CanMsg {
    pub addr: u32,
    pub bus: Bus,
    pub len: usize,
}

impl CanMsg {
    pub fn matches(&self, frame: &Frame) -> bool {
        self.addr == frame.addr() && self.bus as u8 == frame.bus && self.len == frame.len()
    }
}

/// Receive check handed to the liveness monitor.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RxCheck {
    pub msg: CanMsg,
    /// Expected rate in Hz
    pub frequency: u32,
    pub ignore_checksum: bool,
    pub ignore_counter: bool,
}

/// Piecewise-linear curve with three breakpoints.
#[derive(Debug, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LookupTable {
    pub x: [f32; 3],
    pub y: [f32; 3],
}

/// Bounds for the steering angle command. The rate lookups are keyed by vehicle speed.
#[derive(Debug, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SteeringLimits {
    /// CAN units per degree of steering angle
    pub angle_deg_to_can: f32,
    pub angle_rate_up_lookup: LookupTable,
    pub angle_rate_down_lookup: LookupTable,
}

/// What happens to a steering command that violates the limits.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TxEnforcement {
    /// Block the frame.
    Enforce,
    /// Log the violation but let the frame through.
    #[default]
    Monitor,
}

/// Configuration assembled by a safety model at initialization.
#[derive(Debug, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SafetyConfig {
    pub rx_checks: &'static [RxCheck],
    pub tx_msgs: &'static [CanMsg],
    pub steering_limits: SteeringLimits,
    pub tx_enforcement: TxEnforcement,
}

impl SafetyConfig {
    /// Whitelist entry for a message we may originate.
    pub fn tx_msg(&self, bus: u8, addr: u32) -> Option<&CanMsg> {
        self.tx_msgs.iter().find(|m| m.bus as u8 == bus && m.addr == addr)
    }

    /// True if the frame matches a whitelist entry in address, bus and length.
    pub fn is_tx_allowed(&self, frame: &Frame) -> bool {
        self.tx_msgs.iter().any(|m| m.matches(frame))
    }

    pub fn rx_check(&self, bus: u8, addr: u32) -> Option<&RxCheck> {
        self.rx_checks
            .iter()
            .find(|c| c.msg.bus as u8 == bus && c.msg.addr == addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn bus_from_raw() {
        assert_eq!(Bus::try_from(0u8), Ok(Bus::Main));
        assert_eq!(Bus::try_from(1u8), Ok(Bus::Adas));
        assert_eq!(Bus::try_from(2u8), Ok(Bus::Camera));
        assert_eq!(Bus::try_from(3u8), Err(Error::UnknownBus(3)));

        for bus in Bus::iter() {
            assert_eq!(Bus::try_from(u8::from(bus)), Ok(bus));
        }
    }

    #[test]
    fn can_msg_matches_length() {
        let msg = CanMsg { addr: 1010, bus: Bus::Camera, len: 8 };
        assert!(msg.matches(&Frame::new(2, 1010.into(), &[0; 8]).unwrap()));
        assert!(!msg.matches(&Frame::new(2, 1010.into(), &[0; 6]).unwrap()));
        assert!(!msg.matches(&Frame::new(0, 1010.into(), &[0; 8]).unwrap()));
    }
}
