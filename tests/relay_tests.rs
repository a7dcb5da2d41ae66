use automotive_safety::can::{CanAdapter, Frame, Identifier};
use automotive_safety::relay::{SafetyRelay, TxOutcome};
use automotive_safety::safety::psa::{self, Psa};
use automotive_safety::safety::{Bus, SafetyConfig, SafetyHost, SteeringLimits, TxEnforcement};
use automotive_safety::StreamExt;

/// Adapter that hands out queued frames and records everything sent.
#[derive(Default)]
struct MockAdapter {
    rx: Vec<Frame>,
    sent: Vec<Frame>,
}

impl CanAdapter for MockAdapter {
    fn send(&mut self, frames: &[Frame]) -> Result<(), automotive_safety::Error> {
        self.sent.extend_from_slice(frames);
        Ok(())
    }

    fn recv(&mut self) -> Result<Vec<Frame>, automotive_safety::Error> {
        Ok(std::mem::take(&mut self.rx))
    }
}

/// Host that flags any angle above `max_angle` as a violation.
#[derive(Default)]
struct RecordingHost {
    registered: Option<SafetyConfig>,
    stock_ecu_detected: usize,
    cruise: Option<bool>,
    speed: Option<f32>,
    max_angle: i32,
}

impl SafetyHost for RecordingHost {
    fn register(&mut self, config: &SafetyConfig) {
        self.registered = Some(*config);
    }

    fn generic_rx_checks(&mut self, stock_ecu_detected: bool) {
        if stock_ecu_detected {
            self.stock_ecu_detected += 1;
        }
    }

    fn pcm_cruise_check(&mut self, cruise_engaged: bool) {
        self.cruise = Some(cruise_engaged);
    }

    fn update_vehicle_speed(&mut self, speed: f32) {
        self.speed = Some(speed);
    }

    fn steer_angle_cmd_checks(
        &mut self,
        desired_angle: i32,
        _steer_control_enabled: bool,
        _vehicle_speed: f32,
        _limits: &SteeringLimits,
    ) -> bool {
        desired_angle.abs() > self.max_angle
    }
}

fn relay() -> SafetyRelay<Psa, RecordingHost> {
    let host = RecordingHost {
        max_angle: 100,
        ..Default::default()
    };
    SafetyRelay::new(Psa, host, 0)
}

fn frame(bus: Bus, addr: u32, data: &[u8]) -> Frame {
    Frame::new(bus as u8, Identifier::Standard(addr), data).unwrap()
}

fn lkas(angle: i32) -> Frame {
    let raw = (angle as u32) & 0x3fff;
    let mut data = [0u8; 8];
    data[4] = 0b10 << 3;
    data[6] = (raw >> 6) as u8;
    data[7] = ((raw & 0x3f) << 2) as u8;
    frame(Bus::Camera, psa::PSA_LANE_KEEP_ASSIST, &data)
}

#[test]
fn registers_catalog_on_init() {
    let relay = relay();
    let registered = relay.host().registered.expect("catalog not registered");
    assert_eq!(registered.rx_checks, psa::PSA_RX_CHECKS);
    assert_eq!(registered.tx_msgs, psa::PSA_TX_MSGS);
    assert_eq!(registered.steering_limits, psa::PSA_STEERING_LIMITS);
    assert_eq!(relay.config().tx_enforcement, TxEnforcement::Monitor);
}

#[test]
fn forwarding_topology() {
    let mut relay = relay();

    let fwd = relay.receive(&frame(Bus::Main, 1390, &[0; 6]));
    assert_eq!(fwd.map(|f| f.bus), Some(Bus::Camera as u8));

    assert_eq!(relay.receive(&frame(Bus::Main, 1010, &[0; 8])), None);

    let fwd = relay.receive(&frame(Bus::Camera, 1010, &[0; 8]));
    assert_eq!(fwd.map(|f| f.bus), Some(Bus::Main as u8));

    assert_eq!(relay.receive(&frame(Bus::Adas, 909, &[0; 8])), None);
}

#[test]
fn forwarded_frame_keeps_payload() {
    let mut relay = relay();
    let original = frame(Bus::Camera, 0x2b6, &[1, 2, 3, 4, 5, 6, 7, 8]);
    let fwd = relay.receive(&original).unwrap();

    assert_eq!(fwd.id, original.id);
    assert_eq!(fwd.data(), original.data());
    assert_eq!(fwd.bus, Bus::Main as u8);
}

#[test]
fn state_follows_received_frames() {
    let mut relay = relay();

    relay.receive(&frame(Bus::Camera, psa::PSA_DAT_BSI, &[0x20, 0, 0, 0, 0, 0, 0, 0]));
    relay.receive(&frame(Bus::Camera, psa::PSA_DRIVER, &[0, 0, 0, 42, 0, 0]));
    relay.receive(&frame(Bus::Adas, psa::PSA_HS2_DYN_ABR_38D, &[0x09, 0xc4, 0, 0, 0, 0, 0, 0]));
    relay.receive(&frame(Bus::Adas, psa::PSA_HS2_DAT_MDD_CMD_452, &[0, 0, 0x80, 0, 0, 0]));
    relay.receive(&frame(Bus::Camera, psa::PSA_LANE_KEEP_ASSIST, &[0; 8]));

    let state = relay.state();
    assert!(state.brake_pressed());
    assert!(state.gas_pressed());
    assert!(state.vehicle_moving());
    assert!(state.cruise_engaged());
    assert!((state.vehicle_speed() - 25.0).abs() < 1e-4);

    let host = relay.host();
    assert_eq!(host.stock_ecu_detected, 1);
    assert_eq!(host.cruise, Some(true));
    assert!((host.speed.unwrap() - 25.0).abs() < 1e-4);
}

#[test]
fn transmit_whitelist() {
    let mut relay = relay();
    let mut adapter = MockAdapter::default();

    // Right address, wrong bus
    let wrong_bus = lkas(0).with_bus(Bus::Main as u8);
    assert_eq!(relay.transmit(&mut adapter, &wrong_bus).unwrap(), TxOutcome::NotAllowed);

    // Not a message we may originate
    let other = frame(Bus::Camera, psa::PSA_DRIVER, &[0; 6]);
    assert_eq!(relay.transmit(&mut adapter, &other).unwrap(), TxOutcome::NotAllowed);

    // Wrong length
    let short = frame(Bus::Camera, psa::PSA_LANE_KEEP_ASSIST, &[0; 6]);
    assert_eq!(relay.transmit(&mut adapter, &short).unwrap(), TxOutcome::NotAllowed);

    assert!(adapter.sent.is_empty());
}

#[test]
fn transmit_monitor_mode_lets_violations_through() {
    let mut relay = relay();
    let mut adapter = MockAdapter::default();

    assert_eq!(relay.transmit(&mut adapter, &lkas(50)).unwrap(), TxOutcome::Allowed);
    assert_eq!(relay.transmit(&mut adapter, &lkas(-5000)).unwrap(), TxOutcome::Allowed);
    assert_eq!(adapter.sent.len(), 2);
}

#[test]
fn transmit_enforce_mode_blocks_violations() {
    let mut relay = relay().with_tx_enforcement(TxEnforcement::Enforce);
    let mut adapter = MockAdapter::default();

    assert_eq!(relay.transmit(&mut adapter, &lkas(-100)).unwrap(), TxOutcome::Allowed);
    assert_eq!(relay.transmit(&mut adapter, &lkas(-101)).unwrap(), TxOutcome::Blocked);
    assert_eq!(relay.transmit(&mut adapter, &lkas(8191)).unwrap(), TxOutcome::Blocked);

    assert_eq!(adapter.sent, vec![lkas(-100)]);
}

#[test]
fn pump_forwards_and_skips_loopback() {
    let mut relay = relay();
    let mut adapter = MockAdapter::default();

    let mut echo = frame(Bus::Camera, 0x123, &[0; 8]);
    echo.loopback = true;

    adapter.rx = vec![
        frame(Bus::Main, 1390, &[0; 6]),
        frame(Bus::Main, psa::PSA_LANE_KEEP_ASSIST, &[0; 8]),
        frame(Bus::Adas, psa::PSA_HS2_DYN_ABR_38D, &[0, 100, 0, 0, 0, 0, 0, 0]),
        frame(Bus::Camera, psa::PSA_LANE_KEEP_ASSIST, &[0; 8]),
        echo,
    ];

    assert_eq!(relay.pump(&mut adapter).unwrap(), 2);
    assert_eq!(adapter.sent.len(), 2);
    assert_eq!(adapter.sent[0].bus, Bus::Camera as u8);
    assert_eq!(adapter.sent[0].addr(), 1390);
    assert_eq!(adapter.sent[1].bus, Bus::Main as u8);
    assert_eq!(adapter.sent[1].addr(), psa::PSA_LANE_KEEP_ASSIST);
    assert!(relay.state().vehicle_moving());

    // Nothing pending
    assert_eq!(relay.pump(&mut adapter).unwrap(), 0);
    assert_eq!(adapter.sent.len(), 2);
}

#[tokio::test]
async fn forward_stream() {
    let frames = vec![
        frame(Bus::Main, 1390, &[0; 6]),
        frame(Bus::Main, psa::PSA_LANE_KEEP_ASSIST, &[0; 8]),
        frame(Bus::Adas, 909, &[0; 8]),
        frame(Bus::Camera, 0x2b6, &[0; 8]),
    ];

    let forwarded: Vec<Frame> = relay()
        .forward_stream(tokio_stream::iter(frames))
        .collect()
        .await;

    let routes: Vec<(u8, u32)> = forwarded.iter().map(|f| (f.bus, f.addr())).collect();
    assert_eq!(routes, vec![(Bus::Camera as u8, 1390), (Bus::Main as u8, 0x2b6)]);
}
