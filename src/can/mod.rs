//! Generic CAN types and traits

use std::fmt;

pub static DLC_TO_LEN: &[usize] = &[0, 1, 2, 3, 4, 5, 6, 7, 8, 12, 16, 20, 24, 32, 48, 64];

/// Largest payload a frame can carry (CAN-FD).
pub const MAX_DATA_LEN: usize = 64;

/// Identifier for a CAN frame
#[derive(Copy, Clone, PartialOrd, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Identifier {
    Standard(u32),
    Extended(u32),
}

impl Identifier {
    pub fn is_standard(&self) -> bool {
        match self {
            Identifier::Standard(_) => true,
            Identifier::Extended(_) => false,
        }
    }
    pub fn is_extended(&self) -> bool {
        !self.is_standard()
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Extended(id) => write!(f, "0x{:08x}", id),
            Identifier::Standard(id) => write!(f, "0x{:03x}", id),
        }
    }
}

impl From<u32> for Identifier {
    fn from(id: u32) -> Identifier {
        if id <= 0x7ff {
            Identifier::Standard(id)
        } else {
            Identifier::Extended(id)
        }
    }
}

impl From<Identifier> for u32 {
    fn from(val: Identifier) -> u32 {
        match val {
            Identifier::Standard(id) => id,
            Identifier::Extended(id) => id,
        }
    }
}

/// A CAN frame. The payload lives in a fixed buffer so frames can be copied and inspected without allocating.
///
/// With the `serde` feature a frame serializes with its payload as a plain byte list, and deserializing goes through
/// the same validation as [`Frame::new`].
#[derive(Copy, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(into = "FrameRepr", try_from = "FrameRepr")
)]
pub struct Frame {
    /// The bus index for adapters supporting multiple CAN busses
    pub bus: u8,
    /// Arbitration ID
    pub id: Identifier,
    /// Wheter the frame was sent out by the adapter
    pub loopback: bool,
    /// CAN-FD Frame
    pub fd: bool,
    data: [u8; MAX_DATA_LEN],
    len: usize,
}

impl Frame {
    pub fn new(bus: u8, id: Identifier, data: &[u8]) -> Result<Frame, crate::error::Error> {
        // Check if the data length is valid
        if !DLC_TO_LEN.contains(&data.len()) {
            return Err(crate::error::Error::MalformedFrame);
        }

        // Check if the ID makes sense
        match id {
            Identifier::Standard(id) if id > 0x7ff => return Err(crate::error::Error::MalformedFrame),
            Identifier::Extended(id) if id > 0x1fffffff => return Err(crate::error::Error::MalformedFrame),
            _ => {}
        };

        let mut buf = [0u8; MAX_DATA_LEN];
        buf[..data.len()].copy_from_slice(data);

        Ok(Frame {
            bus,
            id,
            loopback: false,
            fd: data.len() > 8,
            data: buf,
            len: data.len(),
        })
    }

    /// Frame Data
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Arbitration ID as a plain number, regardless of addressing mode.
    pub fn addr(&self) -> u32 {
        self.id.into()
    }

    /// Copy of this frame addressed to another bus.
    pub fn with_bus(&self, bus: u8) -> Frame {
        Frame { bus, ..*self }
    }
}

/// Serialized form of a [`Frame`], carrying only the used part of the payload.
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct FrameRepr {
    bus: u8,
    id: Identifier,
    data: Vec<u8>,
    #[serde(default)]
    loopback: bool,
    #[serde(default)]
    fd: bool,
}

#[cfg(feature = "serde")]
impl From<Frame> for FrameRepr {
    fn from(frame: Frame) -> FrameRepr {
        FrameRepr {
            bus: frame.bus,
            id: frame.id,
            data: frame.data().to_vec(),
            loopback: frame.loopback,
            fd: frame.fd,
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<FrameRepr> for Frame {
    type Error = crate::error::Error;
    fn try_from(repr: FrameRepr) -> Result<Frame, Self::Error> {
        let mut frame = Frame::new(repr.bus, repr.id, &repr.data)?;
        frame.loopback = repr.loopback;
        frame.fd = repr.fd || frame.fd;
        Ok(frame)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("bus", &self.bus)
            .field("id", &self.id)
            .field("data", &hex::encode(self.data()))
            .field("loopback", &self.loopback)
            .field("fd", &self.fd)
            .finish()
    }
}

/// Trait for a Blocking CAN Adapter
pub trait CanAdapter {
    fn send(&mut self, frames: &[Frame]) -> Result<(), crate::error::Error>;
    fn recv(&mut self) -> Result<Vec<Frame>, crate::error::Error>;
}
