use crate::safety::{Bus, CanMsg, LookupTable, RxCheck, SteeringLimits};

// Messages on the main and camera side
/// Gas pedal, from the BSI
pub const PSA_DRIVER: u32 = 1390;
/// Doors and brake, from the BSI
pub const PSA_DAT_BSI: u32 = 1042;
/// Lane keep assist command sent to the EPS
pub const PSA_LANE_KEEP_ASSIST: u32 = 1010;

// Messages on the ADAS bus
/// Wheel speed
pub const PSA_HS2_DYN_ABR_38D: u32 = 909;
/// Cruise state
pub const PSA_HS2_DAT_MDD_CMD_452: u32 = 1106;

pub const PSA_LKAS_LEN: usize = 8;

/// Signal P013_MainBrake in DAT_BSI
pub const BRAKE_PRESSED_BIT: usize = 5;
/// Signal GAS_PEDAL in DRIVER
pub const GAS_PEDAL_BYTE: usize = 3;
/// Signal VITESSE_VEHICULE_ROUES in DYN_ABR_38D
pub const SPEED_START_BYTE: usize = 0;
pub const SPEED_FACTOR: f32 = 0.01;
/// Signal DDE_ACTIVATION_RVV_ACC in DAT_MDD_CMD_452
pub const CRUISE_ACTIVE_BIT: usize = 23;

/// Signal ANGLE in LANE_KEEP_ASSIST, split over bytes 6 and 7
pub const ANGLE_BITS: u32 = 14;
/// Signal STATUS in LANE_KEEP_ASSIST, bits 3-4 of byte 4
pub const STATUS_BYTE: usize = 4;
pub const STATUS_MASK: u8 = 0x18;
pub const STATUS_SHIFT: u8 = 3;
pub const STATUS_ACTIVE: u8 = 0b10;

pub static PSA_TX_MSGS: &[CanMsg] = &[CanMsg {
    addr: PSA_LANE_KEEP_ASSIST,
    bus: Bus::Camera,
    len: PSA_LKAS_LEN,
}];

// TODO: add counters and checksums once they are reverse engineered
pub static PSA_RX_CHECKS: &[RxCheck] = &[
    RxCheck {
        msg: CanMsg { addr: PSA_DRIVER, bus: Bus::Camera, len: 6 },
        frequency: 10,
        ignore_checksum: true,
        ignore_counter: true,
    },
    RxCheck {
        msg: CanMsg { addr: PSA_DAT_BSI, bus: Bus::Camera, len: 8 },
        frequency: 20,
        ignore_checksum: true,
        ignore_counter: true,
    },
    RxCheck {
        msg: CanMsg { addr: PSA_HS2_DYN_ABR_38D, bus: Bus::Adas, len: 8 },
        frequency: 25,
        ignore_checksum: true,
        ignore_counter: true,
    },
    RxCheck {
        msg: CanMsg { addr: PSA_HS2_DAT_MDD_CMD_452, bus: Bus::Adas, len: 6 },
        frequency: 20,
        ignore_checksum: true,
        ignore_counter: true,
    },
];

pub const PSA_STEERING_LIMITS: SteeringLimits = SteeringLimits {
    angle_deg_to_can: 10.0,
    angle_rate_up_lookup: LookupTable {
        x: [0.0, 5.0, 15.0],
        y: [10.0, 1.6, 0.30],
    },
    angle_rate_down_lookup: LookupTable {
        x: [0.0, 5.0, 15.0],
        y: [10.0, 7.0, 0.8],
    },
};
