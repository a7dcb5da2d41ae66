//! # The Automotive Safety Crate
//! Safety model for running openpilot-style lateral control on PSA vehicles. The model sits between the main bus, the
//! ADAS bus and the camera bus: it tracks the vehicle state needed by other safety checks, validates the steering
//! commands we send, and decides which received frames get forwarded to which bus.
//!
//! ## Relay Example
//!
//! The [`relay::SafetyRelay`] drives the hooks of a [`safety::SafetyModel`] over any [`can::CanAdapter`]. The host
//! supplies the services the model depends on, such as the steering angle rate limiter.
//!
//! ```rust
//! use automotive_safety::can::{Frame, Identifier};
//! use automotive_safety::relay::SafetyRelay;
//! use automotive_safety::safety::psa::Psa;
//! use automotive_safety::safety::{SafetyHost, SteeringLimits};
//!
//! struct Host;
//!
//! impl SafetyHost for Host {
//!     fn steer_angle_cmd_checks(&mut self, _angle: i32, _active: bool, _speed: f32, _limits: &SteeringLimits) -> bool {
//!         false
//!     }
//! }
//!
//! let mut relay = SafetyRelay::new(Psa, Host, 0);
//!
//! // Wheel speed on the ADAS bus updates the vehicle state, but is never forwarded
//! let speed = Frame::new(1, Identifier::Standard(909), &[0x09, 0xc4, 0, 0, 0, 0, 0, 0]).unwrap();
//! assert_eq!(relay.receive(&speed), None);
//! assert!(relay.state().vehicle_moving());
//!
//! // Main bus traffic is forwarded to the camera
//! let driver = Frame::new(0, Identifier::Standard(1390), &[0; 6]).unwrap();
//! assert_eq!(relay.receive(&driver).map(|f| f.bus), Some(2));
//! ```
//!
//! ## Diagnostics
//!
//! [`isotp`] and [`uds`] implement a blocking diagnostic client on top of any [`can::CanAdapter`]. The [`query`]
//! module uses it to read firmware versions from PSA ECUs, and [`vecu`] provides virtual ECUs to run it against.
//! [`rates`] compares message rates between two parts of a CAN log to check what a safety model filters.

pub mod can;
mod error;
pub mod isotp;
pub mod query;
pub mod rates;
pub mod relay;
pub mod safety;
pub mod uds;
pub mod vecu;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
pub use tokio_stream::{Stream, StreamExt};
