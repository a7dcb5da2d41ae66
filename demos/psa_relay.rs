//! Replays a short synthetic drive through the PSA safety relay and checks which messages stopped reaching the
//! camera once the relay was switched on.
use automotive_safety::can::{CanAdapter, Frame};
use automotive_safety::rates::{compare_rates, MessageRates, DEFAULT_DROP_THRESHOLD};
use automotive_safety::relay::SafetyRelay;
use automotive_safety::safety::psa::{self, Psa};
use automotive_safety::safety::{Bus, SafetyHost, SteeringLimits, TxEnforcement};
use tracing::info;

const CYCLE_S: f64 = 0.01;

/// Loops all sent frames back as received frames on their destination bus.
#[derive(Default)]
struct Loopback {
    pending: Vec<Frame>,
}

impl CanAdapter for Loopback {
    fn send(&mut self, frames: &[Frame]) -> Result<(), automotive_safety::Error> {
        self.pending.extend_from_slice(frames);
        Ok(())
    }

    fn recv(&mut self) -> Result<Vec<Frame>, automotive_safety::Error> {
        Ok(std::mem::take(&mut self.pending))
    }
}

/// Rejects any angle above 90 degrees.
struct Host;

impl SafetyHost for Host {
    fn steer_angle_cmd_checks(&mut self, angle: i32, _active: bool, _speed: f32, limits: &SteeringLimits) -> bool {
        angle.abs() as f32 > 90.0 * limits.angle_deg_to_can
    }
}

fn stock_traffic(cycle: u32) -> automotive_safety::Result<Vec<Frame>> {
    let mut frames = vec![
        Frame::new(0, psa::PSA_DRIVER.into(), &[0, 0, 0, 0, 0, 0])?,
        Frame::new(0, psa::PSA_LANE_KEEP_ASSIST.into(), &[0; 8])?,
    ];
    if cycle % 4 == 0 {
        let speed = (cycle as u16).to_be_bytes();
        frames.push(Frame::new(1, psa::PSA_HS2_DYN_ABR_38D.into(), &[speed[0], speed[1], 0, 0, 0, 0, 0, 0])?);
    }
    Ok(frames)
}

fn main() -> automotive_safety::Result<()> {
    tracing_subscriber::fmt::init();

    let mut relay = SafetyRelay::new(Psa, Host, 0).with_tx_enforcement(TxEnforcement::Enforce);
    let mut adapter = Loopback::default();
    let mut log: Vec<(f64, Frame)> = vec![];

    for cycle in 0..200u32 {
        let t = cycle as f64 * CYCLE_S;
        let relay_active = cycle >= 100;

        // Log what reaches the camera side. Without the relay the main bus is wired straight through to the
        // camera, and ADAS traffic never gets there.
        for frame in stock_traffic(cycle)? {
            if relay_active {
                if let Some(fwd) = relay.receive(&frame).filter(|f| f.bus == Bus::Camera as u8) {
                    log.push((t, fwd));
                }
            } else if frame.bus == Bus::Main as u8 {
                log.push((t, frame.with_bus(Bus::Camera as u8)));
            }
        }

        if relay_active {
            let mut data = [0u8; 8];
            data[4] = 0b10 << 3;
            let lkas = Frame::new(Bus::Camera as u8, psa::PSA_LANE_KEEP_ASSIST.into(), &data)?;
            relay.transmit(&mut adapter, &lkas)?;
        }
        for frame in adapter.recv()? {
            log.push((t, frame));
        }
    }

    info!("Vehicle state after replay: {:?}", relay.state());

    let baseline = MessageRates::from_log(log.iter().map(|(t, f)| (*t, f)), 0.0, 0.99)?;
    let compare = MessageRates::from_log(log.iter().map(|(t, f)| (*t, f)), 1.0, 1.99)?;

    println!("{:<15} {:<20} {:<15} {:<10}", "Message ID", "Baseline Rate (Hz)", "New Rate (Hz)", "Drop Ratio");
    for dropped in compare_rates(&baseline, &compare, DEFAULT_DROP_THRESHOLD) {
        println!("{}", dropped);
    }
    Ok(())
}
