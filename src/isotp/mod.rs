//! ISO Transport Protocol (ISO-TP) implementation, implements ISO 15765-2
//! ## Example:
//! ```rust
//! use automotive_safety::can::Identifier;
//! use automotive_safety::isotp::{IsoTPAdapter, IsoTPConfig};
//! use automotive_safety::vecu::{VirtualBus, VirtualEcu};
//!
//! let mut bus = VirtualBus::default().with_ecu(VirtualEcu::new(0, 0x7a1, 0x7a9));
//!
//! let config = IsoTPConfig::new(0, Identifier::Standard(0x7a1));
//! let mut isotp = IsoTPAdapter::new(&mut bus, config);
//!
//! isotp.send(&[0x3e, 0x00]).unwrap();
//! assert_eq!(isotp.recv().unwrap(), vec![0x7e, 0x00]);
//! ```

pub(crate) mod constants;
pub mod error;
mod types;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::can::{CanAdapter, Frame, Identifier};
use crate::error::Error;
use crate::isotp::constants::{FlowStatus, FrameType, FRAME_TYPE_MASK, MAX_PAYLOAD_LEN};
use crate::Result;
pub use types::FlowControlConfig;

use tracing::debug;

const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Interval between polls of the adapter while waiting for a frame
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Configuring passed to the IsoTPAdapter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsoTPConfig {
    pub bus: u8,
    /// Transmit ID
    pub tx_id: Identifier,
    /// Receive ID
    pub rx_id: Identifier,
    /// Transmit Data Length
    pub tx_dl: usize,
    /// Padding byte (0x00, or more efficient 0xAA)
    pub padding: u8,
    /// Max timeout for receiving a frame
    pub timeout: Duration,
}

impl IsoTPConfig {
    /// Physical addressing with the usual response ID: +8 for 11-bit IDs, swapped target and source for 29-bit
    /// normal fixed addressing.
    pub fn new(bus: u8, id: Identifier) -> Self {
        let rx_id = match id {
            Identifier::Standard(id) => Identifier::Standard(id + 8),
            Identifier::Extended(id) => {
                let bytes = id.to_be_bytes();
                Identifier::Extended(u32::from_be_bytes([bytes[0], bytes[1], bytes[3], bytes[2]]))
            }
        };

        Self {
            bus,
            tx_id: id,
            rx_id,
            tx_dl: 8,
            padding: 0xaa,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    pub fn with_rx_id(self, rx_id: Identifier) -> Self {
        Self { rx_id, ..self }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }
}

/// Wraps a blocking CAN adapter to send and receive ISO-TP packets. CAN-FD ISO-TP is currently not supported.
pub struct IsoTPAdapter<'a, A: CanAdapter> {
    adapter: &'a mut A,
    config: IsoTPConfig,
    /// Frames addressed to us that were received but not consumed yet
    pending: VecDeque<Frame>,
}

impl<'a, A: CanAdapter> IsoTPAdapter<'a, A> {
    /// Convenience method for creating a new IsoTPAdapter from a CAN adapter and an Arbitration ID.
    pub fn from_id(adapter: &'a mut A, id: u32) -> Self {
        Self::new(adapter, IsoTPConfig::new(0, id.into()))
    }

    pub fn new(adapter: &'a mut A, config: IsoTPConfig) -> Self {
        Self {
            adapter,
            config,
            pending: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &IsoTPConfig {
        &self.config
    }

    fn pad(&self, data: &mut Vec<u8>) {
        if data.len() < self.config.tx_dl {
            data.resize(self.config.tx_dl, self.config.padding);
        }
    }

    fn send_frame(&mut self, buf: &[u8]) -> Result<()> {
        let frame = Frame::new(self.config.bus, self.config.tx_id, buf)?;
        self.adapter.send(&[frame])
    }

    /// Next frame from the response ID. Returns [`Error::Timeout`] if nothing arrives within the configured timeout.
    fn recv_frame(&mut self) -> Result<Frame> {
        let deadline = Instant::now() + self.config.timeout;
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame);
            }

            let (bus, rx_id) = (self.config.bus, self.config.rx_id);
            let frames = self.adapter.recv()?;
            self.pending
                .extend(frames.into_iter().filter(|f| f.bus == bus && f.id == rx_id && !f.loopback));

            if self.pending.is_empty() {
                if Instant::now() >= deadline {
                    return Err(Error::Timeout);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    }

    fn send_single_frame(&mut self, data: &[u8]) -> Result<()> {
        let mut buf = vec![FrameType::Single as u8 | data.len() as u8];
        buf.extend(data);
        self.pad(&mut buf);

        debug!("TX SF, length: {} data {}", data.len(), hex::encode(&buf));
        self.send_frame(&buf)
    }

    fn send_first_frame(&mut self, data: &[u8]) -> Result<()> {
        let b0: u8 = FrameType::First as u8 | ((data.len() >> 8) & 0xF) as u8;
        let b1: u8 = (data.len() & 0xFF) as u8;

        let mut buf = vec![b0, b1];
        buf.extend(&data[..self.config.tx_dl - 2]);

        debug!("TX FF, length: {} data {}", data.len(), hex::encode(&buf));
        self.send_frame(&buf)
    }

    fn send_consecutive_frame(&mut self, data: &[u8], idx: usize) -> Result<()> {
        let idx = ((idx + 1) & 0xF) as u8;

        let mut buf = vec![FrameType::Consecutive as u8 | idx];
        buf.extend(data);
        self.pad(&mut buf);

        debug!("TX CF, idx: {} data {}", idx, hex::encode(&buf));
        self.send_frame(&buf)
    }

    /// Wait for a flow control frame that allows us to continue sending.
    fn recv_flow_control(&mut self) -> Result<FlowControlConfig> {
        loop {
            let frame = self.recv_frame()?;
            let data = frame.data();
            if data.is_empty() || data[0] & FRAME_TYPE_MASK != FrameType::FlowControl as u8 {
                return Err(crate::isotp::error::Error::FlowControl.into());
            }
            debug!("RX FC, data {}", hex::encode(data));

            match FlowStatus::from_repr(data[0] & 0xF) {
                Some(FlowStatus::ContinueToSend) => return FlowControlConfig::try_from(&frame),
                Some(FlowStatus::Wait) => continue,
                _ => return Err(crate::isotp::error::Error::FlowControl.into()),
            }
        }
    }

    fn send_multiple(&mut self, data: &[u8]) -> Result<()> {
        self.send_first_frame(data)?;
        let mut flow_control = self.recv_flow_control()?;

        let chunks = data[self.config.tx_dl - 2..].chunks(self.config.tx_dl - 1);
        let mut sent_in_block = 0;
        for (idx, chunk) in chunks.enumerate() {
            if flow_control.block_size != 0 && sent_in_block == flow_control.block_size {
                flow_control = self.recv_flow_control()?;
                sent_in_block = 0;
            }

            self.send_consecutive_frame(chunk, idx)?;
            sent_in_block += 1;

            if !flow_control.separation_time_min.is_zero() {
                std::thread::sleep(flow_control.separation_time_min);
            }
        }

        Ok(())
    }

    /// Send an ISO-TP packet of up to 4095 bytes. Returns [`Error::Timeout`] if the ECU is not responding in time with flow control messages.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        debug!("TX {}", hex::encode(data));

        if data.len() < self.config.tx_dl {
            self.send_single_frame(data)
        } else if data.len() <= MAX_PAYLOAD_LEN {
            self.send_multiple(data)
        } else {
            Err(crate::isotp::error::Error::DataTooLarge.into())
        }
    }

    /// Receive an ISO-TP packet. Returns [`Error::Timeout`] if the timeout is exceeded between individual ISO-TP frames. Note the total time to receive a packet may be longer than the timeout.
    pub fn recv(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let mut len: Option<usize> = None;
        let mut idx: u8 = 1;

        loop {
            let frame = self.recv_frame()?;
            let data = frame.data();
            if data.is_empty() {
                return Err(crate::isotp::error::Error::MalformedFrame.into());
            }

            match FrameType::from_repr(data[0] & FRAME_TYPE_MASK) {
                Some(FrameType::Single) => {
                    let sf_len = (data[0] & 0xF) as usize;
                    // Zero is the CAN-FD escape sequence
                    if sf_len == 0 || sf_len >= data.len() {
                        return Err(crate::isotp::error::Error::MalformedFrame.into());
                    }
                    debug!("RX SF, length: {} data {}", sf_len, hex::encode(data));

                    buf.extend(&data[1..=sf_len]);
                    len = Some(sf_len);
                }
                Some(FrameType::First) => {
                    if data.len() < 2 {
                        return Err(crate::isotp::error::Error::MalformedFrame.into());
                    }
                    let ff_len = (((data[0] & 0xF) as usize) << 8) | data[1] as usize;
                    debug!("RX FF, length: {}, data {}", ff_len, hex::encode(data));

                    buf.extend(&data[2..]);
                    len = Some(ff_len);

                    let mut flow_control = vec![FrameType::FlowControl as u8 | FlowStatus::ContinueToSend as u8, 0, 0];
                    self.pad(&mut flow_control);
                    debug!("TX FC, data {}", hex::encode(&flow_control));
                    self.send_frame(&flow_control)?;
                }
                Some(FrameType::Consecutive) => {
                    let Some(total) = len else {
                        return Err(crate::isotp::error::Error::OutOfOrder.into());
                    };
                    if data[0] & 0xF != idx {
                        return Err(crate::isotp::error::Error::OutOfOrder.into());
                    }

                    let end = std::cmp::min(total.saturating_sub(buf.len()) + 1, data.len());
                    buf.extend(&data[1..end]);
                    debug!("RX CF, idx: {}, data {}", idx, hex::encode(data));

                    idx = (idx + 1) & 0xF;
                }
                _ => return Err(crate::isotp::error::Error::UnknownFrameType.into()),
            }

            if let Some(total) = len {
                if buf.len() >= total {
                    buf.truncate(total);
                    return Ok(buf);
                }
            }
        }
    }
}
