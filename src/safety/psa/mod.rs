//! Safety model for PSA vehicles.
//!
//! The harness sits between the main bus and the front camera. Stock lane keeping commands coming from the
//! main bus are dropped, and our own command is injected on the camera side, from where it is forwarded to the
//! main bus like all other camera traffic. The ADAS bus is only listened to.

pub mod constants;

use crate::can::Frame;
use crate::safety::signal::{get_be_u16, get_bit, get_byte, to_signed};
use crate::safety::{Bus, SafetyConfig, SafetyHost, SafetyModel, TxEnforcement, VehicleState};
pub use constants::*;

use tracing::{info, warn};

/// Commanded steering angle in CAN units: byte 6 holds the high 8 bits, the top 6 bits of byte 7 the rest.
pub fn decode_lkas_angle(data: &[u8]) -> i32 {
    let raw = ((get_byte(data, 6) as u32) << 6) | ((get_byte(data, 7) & 0xfc) >> 2) as u32;
    to_signed(raw, ANGLE_BITS)
}

/// True if the STATUS field requests active steering.
pub fn decode_lkas_active(data: &[u8]) -> bool {
    ((get_byte(data, STATUS_BYTE) & STATUS_MASK) >> STATUS_SHIFT) == STATUS_ACTIVE
}

fn is_lkas_msg(addr: u32) -> bool {
    addr == PSA_LANE_KEEP_ASSIST
}

/// PSA safety hooks.
#[derive(Debug, Default, Copy, Clone)]
pub struct Psa;

impl SafetyModel for Psa {
    fn init(&self, _param: u16) -> SafetyConfig {
        info!("psa_init");
        SafetyConfig {
            rx_checks: PSA_RX_CHECKS,
            tx_msgs: PSA_TX_MSGS,
            steering_limits: PSA_STEERING_LIMITS,
            tx_enforcement: TxEnforcement::default(),
        }
    }

    fn rx_hook<H: SafetyHost>(&self, frame: &Frame, state: &mut VehicleState, host: &mut H) {
        let addr = frame.addr();
        let data = frame.data();

        match Bus::from_repr(frame.bus) {
            Some(Bus::Camera) => {
                if addr == PSA_DAT_BSI {
                    state.set_brake_pressed(get_bit(data, BRAKE_PRESSED_BIT));
                }
                if addr == PSA_DRIVER {
                    state.set_gas_pressed(get_byte(data, GAS_PEDAL_BYTE) > 0);
                }

                host.generic_rx_checks(is_lkas_msg(addr));
            }
            Some(Bus::Adas) => {
                if addr == PSA_HS2_DYN_ABR_38D {
                    let speed = get_be_u16(data, SPEED_START_BYTE);
                    state.set_vehicle_moving(speed > 0);
                    let speed = speed as f32 * SPEED_FACTOR;
                    state.set_vehicle_speed(speed);
                    host.update_vehicle_speed(speed);
                }
                if addr == PSA_HS2_DAT_MDD_CMD_452 {
                    let engaged = get_bit(data, CRUISE_ACTIVE_BIT);
                    state.set_cruise_engaged(engaged);
                    host.pcm_cruise_check(engaged);
                }
            }
            _ => {}
        }
    }

    fn tx_hook<H: SafetyHost>(
        &self,
        frame: &Frame,
        state: &VehicleState,
        config: &SafetyConfig,
        host: &mut H,
    ) -> bool {
        if !is_lkas_msg(frame.addr()) {
            return true;
        }

        let desired_angle = decode_lkas_angle(frame.data());
        let lka_active = decode_lkas_active(frame.data());

        let violation = host.steer_angle_cmd_checks(
            desired_angle,
            lka_active,
            state.vehicle_speed(),
            &config.steering_limits,
        );
        if !violation {
            return true;
        }

        match config.tx_enforcement {
            TxEnforcement::Enforce => {
                warn!("Blocked LKAS command, angle {} active {}", desired_angle, lka_active);
                false
            }
            TxEnforcement::Monitor => {
                warn!("LKAS command exceeds steering limits, angle {} active {}", desired_angle, lka_active);
                true
            }
        }
    }

    fn fwd_hook(&self, bus: u8, addr: u32) -> Option<Bus> {
        match Bus::from_repr(bus) {
            // Block stock LKAS messages
            Some(Bus::Main) if is_lkas_msg(addr) => None,
            Some(Bus::Main) => Some(Bus::Camera),
            Some(Bus::Camera) => Some(Bus::Main),
            _ => None,
        }
    }
}
