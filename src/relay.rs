//! Runs a [`SafetyModel`] between CAN busses.
//!
//! The relay owns the [`VehicleState`], so the model's receive hook is the only code that can change it.
//! Frames received on one bus are forwarded according to [`SafetyModel::fwd_hook`], and frames we originate
//! have to pass the transmit whitelist and [`SafetyModel::tx_hook`] before they reach the adapter.

use crate::can::{CanAdapter, Frame};
use crate::safety::{SafetyConfig, SafetyHost, SafetyModel, TxEnforcement, VehicleState};
use crate::Result;
use crate::{Stream, StreamExt};

use async_stream::stream;
use tracing::{debug, info, warn};

const DEBUG: bool = false;

/// Result of trying to send a locally originated frame.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum TxOutcome {
    /// The frame passed all checks.
    Allowed,
    /// The frame is not in the transmit whitelist.
    NotAllowed,
    /// The safety model vetoed the frame.
    Blocked,
}

pub struct SafetyRelay<M: SafetyModel, H: SafetyHost> {
    model: M,
    host: H,
    config: SafetyConfig,
    state: VehicleState,
}

impl<M: SafetyModel, H: SafetyHost> SafetyRelay<M, H> {
    /// Initialize the model and register its message catalog with the host.
    pub fn new(model: M, mut host: H, param: u16) -> Self {
        let config = model.init(param);
        host.register(&config);

        info!(
            "Safety relay ready, {} rx checks, {} tx messages, enforcement {:?}",
            config.rx_checks.len(),
            config.tx_msgs.len(),
            config.tx_enforcement
        );

        Self {
            model,
            host,
            config,
            state: VehicleState::default(),
        }
    }

    pub fn with_tx_enforcement(mut self, tx_enforcement: TxEnforcement) -> Self {
        info!("Steering limit enforcement set to {:?}", tx_enforcement);
        self.config.tx_enforcement = tx_enforcement;
        self
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Handle a received frame. Returns the frame addressed to its destination bus if it should be forwarded.
    pub fn receive(&mut self, frame: &Frame) -> Option<Frame> {
        self.model.rx_hook(frame, &mut self.state, &mut self.host);

        match self.model.fwd_hook(frame.bus, frame.addr()) {
            Some(bus) => {
                if DEBUG {
                    debug!("FWD {:?} -> {:?}", frame, bus);
                }
                Some(frame.with_bus(bus.into()))
            }
            None => {
                if DEBUG {
                    debug!("DROP {:?}", frame);
                }
                None
            }
        }
    }

    /// Run the transmit checks for a frame we want to send.
    pub fn check_transmit(&mut self, frame: &Frame) -> TxOutcome {
        if !self.config.is_tx_allowed(frame) {
            warn!("TX not in whitelist {:?}", frame);
            return TxOutcome::NotAllowed;
        }

        if self.model.tx_hook(frame, &self.state, &self.config, &mut self.host) {
            TxOutcome::Allowed
        } else {
            debug!("TX blocked {:?}", frame);
            TxOutcome::Blocked
        }
    }

    /// Send a locally originated frame if the checks allow it. Rejected frames are not retried.
    pub fn transmit<A: CanAdapter>(&mut self, adapter: &mut A, frame: &Frame) -> Result<TxOutcome> {
        let outcome = self.check_transmit(frame);
        if outcome == TxOutcome::Allowed {
            adapter.send(std::slice::from_ref(frame))?;
        }
        Ok(outcome)
    }

    /// Receive pending frames from the adapter and forward them. Forwarded traffic skips the transmit checks.
    /// Returns the number of forwarded frames.
    pub fn pump<A: CanAdapter>(&mut self, adapter: &mut A) -> Result<usize> {
        let forwarded: Vec<Frame> = adapter
            .recv()?
            .iter()
            .filter(|frame| !frame.loopback)
            .filter_map(|frame| self.receive(frame))
            .collect();

        if !forwarded.is_empty() {
            adapter.send(&forwarded)?;
        }
        Ok(forwarded.len())
    }

    /// Run the relay over a stream of received frames, yielding the frames to forward.
    pub fn forward_stream<S>(self, frames: S) -> impl Stream<Item = Frame>
    where
        S: Stream<Item = Frame> + Unpin,
    {
        let mut frames = frames;
        let mut relay = self;
        Box::pin(stream! {
            while let Some(frame) = frames.next().await {
                if frame.loopback {
                    continue;
                }
                if let Some(frame) = relay.receive(&frame) {
                    yield frame;
                }
            }
        })
    }
}
