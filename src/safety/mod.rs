//! Safety model framework: the hooks a vehicle integration implements, and the host services they call into.
//!
//! A [`SafetyModel`] is consulted for every received frame ([`SafetyModel::rx_hook`] and
//! [`SafetyModel::fwd_hook`]) and for every frame we try to send ([`SafetyModel::tx_hook`]).
//! Hooks are synchronous, never allocate and run in bounded time.

pub mod psa;
pub mod signal;
mod state;
mod types;

use crate::can::Frame;
pub use state::VehicleState;
pub use types::*;

/// Services provided by the surrounding safety framework.
pub trait SafetyHost {
    /// Receives the message catalog once the model is initialized, e.g. to set up liveness monitoring.
    fn register(&mut self, _config: &SafetyConfig) {}

    /// Called for frames that can tell us whether the stock controller is still transmitting.
    fn generic_rx_checks(&mut self, _stock_ecu_detected: bool) {}

    /// Feeds the cruise state machine.
    fn pcm_cruise_check(&mut self, _cruise_engaged: bool) {}

    fn update_vehicle_speed(&mut self, _speed: f32) {}

    /// Returns true if the angle command violates the limits.
    fn steer_angle_cmd_checks(
        &mut self,
        desired_angle: i32,
        steer_control_enabled: bool,
        vehicle_speed: f32,
        limits: &SteeringLimits,
    ) -> bool;
}

/// Hooks implemented by a vehicle integration.
pub trait SafetyModel {
    /// Build the configuration. `param` selects a variant for models that have them.
    fn init(&self, param: u16) -> SafetyConfig;

    /// Extract vehicle state from a received frame.
    fn rx_hook<H: SafetyHost>(&self, frame: &Frame, state: &mut VehicleState, host: &mut H);

    /// Decide whether a locally originated frame may be sent.
    fn tx_hook<H: SafetyHost>(
        &self,
        frame: &Frame,
        state: &VehicleState,
        config: &SafetyConfig,
        host: &mut H,
    ) -> bool;

    /// Destination for a frame received on `bus`, or `None` to drop it.
    fn fwd_hook(&self, bus: u8, addr: u32) -> Option<Bus>;
}
