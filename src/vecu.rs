//! Virtual ECUs for exercising the diagnostic stack without a vehicle.
//!
//! A [`VirtualBus`] is a [`CanAdapter`] that hands every sent frame to its ECUs and returns their responses on the
//! next [`CanAdapter::recv`]. Sent frames are echoed back with `loopback` set, like a real adapter does.

use std::collections::{BTreeMap, VecDeque};

use crate::can::{CanAdapter, Frame, Identifier};
use crate::isotp::constants::{FrameType, FRAME_TYPE_MASK};
use crate::uds::{NegativeResponseCode, ServiceIdentifier, NEGATIVE_RESPONSE, POSITIVE_RESPONSE};
use crate::Result;

const PADDING: u8 = 0xaa;

/// P2 50 ms, P2* 5000 ms
const SESSION_PARAMETER_RECORD: [u8; 4] = [0x00, 0x32, 0x01, 0xf4];

/// ECU answering tester present, session control and read data by identifier on a single address pair.
#[derive(Debug, Clone)]
pub struct VirtualEcu {
    bus: u8,
    request_id: Identifier,
    response_id: Identifier,
    sessions: Vec<u8>,
    identifiers: BTreeMap<u16, Vec<u8>>,
    response_pending: bool,
    requests: Vec<Vec<u8>>,
    /// Multi-frame request being received: expected length and data so far
    rx: Option<(usize, Vec<u8>)>,
    /// Consecutive frames waiting for our flow control
    held: VecDeque<Frame>,
}

impl VirtualEcu {
    /// ECU listening on `request_id` and responding on `response_id`. Accepts the default and extended sessions.
    pub fn new(bus: u8, request_id: u32, response_id: u32) -> Self {
        Self {
            bus,
            request_id: request_id.into(),
            response_id: response_id.into(),
            sessions: vec![0x01, 0x03],
            identifiers: BTreeMap::new(),
            response_pending: false,
            requests: vec![],
            rx: None,
            held: VecDeque::new(),
        }
    }

    pub fn with_identifier(mut self, data_identifier: u16, data: &[u8]) -> Self {
        self.identifiers.insert(data_identifier, data.to_vec());
        self
    }

    pub fn with_sessions(mut self, sessions: &[u8]) -> Self {
        self.sessions = sessions.to_vec();
        self
    }

    /// Answer every request with "response pending" first.
    pub fn with_response_pending(mut self) -> Self {
        self.response_pending = true;
        self
    }

    /// Complete requests received so far
    pub fn requests(&self) -> &[Vec<u8>] {
        &self.requests
    }

    fn frame(&self, data: &[u8]) -> Result<Frame> {
        let mut buf = data.to_vec();
        buf.resize(8, PADDING);
        Frame::new(self.bus, self.response_id, &buf)
    }

    fn handle(&mut self, frame: &Frame, outbox: &mut Vec<Frame>) -> Result<()> {
        if frame.loopback || frame.bus != self.bus || frame.id != self.request_id {
            return Ok(());
        }
        let data = frame.data();
        let Some(&pci) = data.first() else {
            return Ok(());
        };

        match FrameType::from_repr(pci & FRAME_TYPE_MASK) {
            Some(FrameType::Single) => {
                let len = (pci & 0xF) as usize;
                if len > 0 && len < data.len() {
                    self.respond(data[1..=len].to_vec(), outbox)?;
                }
            }
            Some(FrameType::First) if data.len() >= 2 => {
                let len = (((pci & 0xF) as usize) << 8) | data[1] as usize;
                self.rx = Some((len, data[2..].to_vec()));
                outbox.push(self.frame(&[FrameType::FlowControl as u8, 0, 0])?);
            }
            Some(FrameType::Consecutive) => {
                if let Some((len, mut buf)) = self.rx.take() {
                    buf.extend(&data[1..]);
                    if buf.len() >= len {
                        buf.truncate(len);
                        self.respond(buf, outbox)?;
                    } else {
                        self.rx = Some((len, buf));
                    }
                }
            }
            Some(FrameType::FlowControl) => outbox.extend(self.held.drain(..)),
            _ => {}
        }
        Ok(())
    }

    fn respond(&mut self, request: Vec<u8>, outbox: &mut Vec<Frame>) -> Result<()> {
        if request.is_empty() {
            return Ok(());
        }
        let response = self.response(&request);
        if self.response_pending {
            let pending = [
                NEGATIVE_RESPONSE,
                request[0],
                NegativeResponseCode::RequestCorrectlyReceivedResponsePending as u8,
            ];
            self.send_payload(&pending, outbox)?;
        }
        self.requests.push(request);
        self.send_payload(&response, outbox)
    }

    fn response(&self, request: &[u8]) -> Vec<u8> {
        let sid = request[0];
        let negative = |code: NegativeResponseCode| vec![NEGATIVE_RESPONSE, sid, code as u8];

        match (ServiceIdentifier::from_repr(sid), &request[1..]) {
            (Some(ServiceIdentifier::TesterPresent), &[0x00]) => vec![sid | POSITIVE_RESPONSE, 0x00],
            (Some(ServiceIdentifier::DiagnosticSessionControl), &[session]) => {
                if self.sessions.contains(&session) {
                    let mut resp = vec![sid | POSITIVE_RESPONSE, session];
                    resp.extend(SESSION_PARAMETER_RECORD);
                    resp
                } else {
                    negative(NegativeResponseCode::SubFunctionNotSupported)
                }
            }
            (Some(ServiceIdentifier::ReadDataByIdentifier), &[hi, lo]) => {
                match self.identifiers.get(&u16::from_be_bytes([hi, lo])) {
                    Some(data) => {
                        let mut resp = vec![sid | POSITIVE_RESPONSE, hi, lo];
                        resp.extend(data);
                        resp
                    }
                    None => negative(NegativeResponseCode::RequestOutOfRange),
                }
            }
            (Some(_), _) => negative(NegativeResponseCode::IncorrectMessageLengthOrInvalidFormat),
            (None, _) => negative(NegativeResponseCode::ServiceNotSupported),
        }
    }

    /// Queue a response. Multi-frame responses send the first frame and hold the rest until flow control arrives.
    fn send_payload(&mut self, payload: &[u8], outbox: &mut Vec<Frame>) -> Result<()> {
        if payload.len() < 8 {
            let mut buf = vec![FrameType::Single as u8 | payload.len() as u8];
            buf.extend(payload);
            outbox.push(self.frame(&buf)?);
            return Ok(());
        }

        let mut buf = vec![
            FrameType::First as u8 | ((payload.len() >> 8) & 0xF) as u8,
            (payload.len() & 0xFF) as u8,
        ];
        buf.extend(&payload[..6]);
        outbox.push(self.frame(&buf)?);

        for (idx, chunk) in payload[6..].chunks(7).enumerate() {
            let mut buf = vec![FrameType::Consecutive as u8 | ((idx + 1) & 0xF) as u8];
            buf.extend(chunk);
            let frame = self.frame(&buf)?;
            self.held.push_back(frame);
        }
        Ok(())
    }
}

/// A bus with any number of virtual ECUs attached.
#[derive(Debug, Clone, Default)]
pub struct VirtualBus {
    ecus: Vec<VirtualEcu>,
    pending: Vec<Frame>,
}

impl VirtualBus {
    pub fn with_ecu(mut self, ecu: VirtualEcu) -> Self {
        self.ecus.push(ecu);
        self
    }

    pub fn ecus(&self) -> &[VirtualEcu] {
        &self.ecus
    }
}

impl CanAdapter for VirtualBus {
    fn send(&mut self, frames: &[Frame]) -> Result<()> {
        for frame in frames {
            let mut echo = *frame;
            echo.loopback = true;
            self.pending.push(echo);

            let mut responses = vec![];
            for ecu in self.ecus.iter_mut() {
                ecu.handle(frame, &mut responses)?;
            }
            self.pending.extend(responses);
        }
        Ok(())
    }

    fn recv(&mut self) -> Result<Vec<Frame>> {
        Ok(std::mem::take(&mut self.pending))
    }
}
