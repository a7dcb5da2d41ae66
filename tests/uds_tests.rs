use std::time::Duration;

use automotive_safety::can::{CanAdapter, Frame, Identifier};
use automotive_safety::isotp::{IsoTPAdapter, IsoTPConfig};
use automotive_safety::uds::{self, DataIdentifier, NegativeResponseCode, SessionType, UDSClient};
use automotive_safety::vecu::{VirtualBus, VirtualEcu};
use automotive_safety::Error;

/// Adapter that answers every request with the next scripted ISO-TP single frame.
struct ScriptedEcu {
    responses: Vec<Vec<u8>>,
    rx: Vec<Frame>,
}

impl ScriptedEcu {
    fn new(responses: &[&[u8]]) -> Self {
        Self {
            responses: responses.iter().rev().map(|r| r.to_vec()).collect(),
            rx: vec![],
        }
    }
}

impl CanAdapter for ScriptedEcu {
    fn send(&mut self, _frames: &[Frame]) -> Result<(), Error> {
        if let Some(response) = self.responses.pop() {
            let mut data = vec![response.len() as u8];
            data.extend(response);
            self.rx.push(Frame::new(0, Identifier::Standard(0x7a9), &data)?);
        }
        Ok(())
    }

    fn recv(&mut self) -> Result<Vec<Frame>, Error> {
        Ok(std::mem::take(&mut self.rx))
    }
}

fn isotp<A: CanAdapter>(adapter: &mut A) -> IsoTPAdapter<'_, A> {
    let config = IsoTPConfig::new(0, Identifier::Standard(0x7a1)).with_timeout(Duration::from_millis(10));
    IsoTPAdapter::new(adapter, config)
}

fn vecu() -> VirtualBus {
    let ecu = VirtualEcu::new(0, 0x7a1, 0x7a9)
        .with_identifier(0x1234, b"deadbeef")
        .with_identifier(DataIdentifier::Vin as u16, b"VR3UHZKXZLT123456");
    VirtualBus::default().with_ecu(ecu)
}

#[test]
fn uds_test_sids() {
    let mut bus = vecu();
    let mut uds = UDSClient::new(isotp(&mut bus));

    uds.tester_present().unwrap();

    let data = uds.read_data_by_identifier(0x1234).unwrap();
    assert_eq!(data, b"deadbeef".to_vec());

    let vin = uds.read_data_by_identifier(DataIdentifier::Vin as u16).unwrap();
    assert_eq!(vin, b"VR3UHZKXZLT123456".to_vec());
}

#[test]
fn uds_session_control() {
    let mut bus = vecu();
    let mut uds = UDSClient::new(isotp(&mut bus));

    let record = uds
        .diagnostic_session_control(SessionType::ExtendedDiagnostic as u8)
        .unwrap()
        .unwrap();
    assert_eq!(record.p2_server_max, Duration::from_millis(50));
    assert_eq!(record.p2_star_server_max, Duration::from_millis(5000));

    let r = uds.diagnostic_session_control(SessionType::Programming as u8);
    assert_eq!(
        r,
        Err(uds::Error::NegativeResponse(NegativeResponseCode::SubFunctionNotSupported).into())
    );
}

#[test]
fn uds_negative_response() {
    let mut bus = vecu();
    let mut uds = UDSClient::new(isotp(&mut bus));

    let r = uds.read_data_by_identifier(0xf1a0);
    assert_eq!(
        r,
        Err(uds::Error::NegativeResponse(NegativeResponseCode::RequestOutOfRange).into())
    );
}

#[test]
fn uds_response_pending() {
    let ecu = VirtualEcu::new(0, 0x7a1, 0x7a9)
        .with_identifier(0x1234, b"deadbeef")
        .with_response_pending();
    let mut bus = VirtualBus::default().with_ecu(ecu);
    let mut uds = UDSClient::new(isotp(&mut bus));

    assert_eq!(uds.read_data_by_identifier(0x1234).unwrap(), b"deadbeef".to_vec());
}

#[test]
fn uds_invalid_responses() {
    let mut adapter = ScriptedEcu::new(&[&[0x50, 0x00], &[0x7e, 0x01], &[0x62, 0xf1, 0x90, 0x00], &[0x62, 0xf1]]);
    let mut uds = UDSClient::new(isotp(&mut adapter));

    assert_eq!(uds.tester_present(), Err(uds::Error::InvalidServiceId(0x50).into()));
    assert_eq!(uds.tester_present(), Err(uds::Error::InvalidSubFunction(0x01).into()));
    assert_eq!(
        uds.read_data_by_identifier(0xf181),
        Err(uds::Error::InvalidDataIdentifier(0xf190).into())
    );
    assert_eq!(
        uds.read_data_by_identifier(0xf181),
        Err(uds::Error::InvalidResponseLength.into())
    );
}

#[test]
fn uds_non_standard_negative_response() {
    let mut adapter = ScriptedEcu::new(&[&[0x7f, 0x3e, 0x99], &[0x7f, 0x3e]]);
    let mut uds = UDSClient::new(isotp(&mut adapter));

    let err = uds.tester_present().unwrap_err();
    assert_eq!(err, uds::Error::NonStandardNegativeResponse(0x99).into());
    assert!(matches!(err, Error::UDSError(e) if e.is_negative_response()));

    assert_eq!(uds.tester_present(), Err(uds::Error::InvalidResponseLength.into()));
}

#[test]
fn uds_timeout() {
    let mut bus = VirtualBus::default();
    let mut uds = UDSClient::new(isotp(&mut bus));
    assert_eq!(uds.tester_present(), Err(Error::Timeout));
}
