//! Unified Diagnostic Services (UDS) Client, implements ISO 14229
//! ## Example
//! ```rust
//! use automotive_safety::isotp::IsoTPAdapter;
//! use automotive_safety::uds::{DataIdentifier, UDSClient};
//! use automotive_safety::vecu::{VirtualBus, VirtualEcu};
//!
//! let ecu = VirtualEcu::new(0, 0x7a1, 0x7a9)
//!     .with_identifier(DataIdentifier::ApplicationSoftwareIdentification as u16, b"96777");
//! let mut bus = VirtualBus::default().with_ecu(ecu);
//!
//! let mut uds = UDSClient::new(IsoTPAdapter::from_id(&mut bus, 0x7a1));
//! uds.tester_present().unwrap();
//! let response = uds
//!     .read_data_by_identifier(DataIdentifier::ApplicationSoftwareIdentification as u16)
//!     .unwrap();
//! assert_eq!(response, b"96777");
//! ```

mod constants;
mod error;
mod types;

use crate::can::CanAdapter;
use crate::isotp::IsoTPAdapter;
use crate::Result;
pub use constants::*;
pub use error::{Error, NegativeResponseCode};
pub use types::*;

use tracing::info;

/// UDS Client. Wraps an IsoTPAdapter to provide a simple interface for making UDS calls.
pub struct UDSClient<'a, A: CanAdapter> {
    adapter: IsoTPAdapter<'a, A>,
}

impl<'a, A: CanAdapter> UDSClient<'a, A> {
    pub fn new(adapter: IsoTPAdapter<'a, A>) -> Self {
        Self { adapter }
    }

    /// Helper function to make custom UDS requests. This function will verify the ECU responds with the correct service identifier and sub function, handle negative responses, and will return the response data.
    pub fn request(&mut self, sid: u8, sub_function: Option<u8>, data: Option<&[u8]>) -> Result<Vec<u8>> {
        let mut request: Vec<u8> = vec![sid];

        if let Some(sub_function) = sub_function {
            request.push(sub_function);
        }

        if let Some(data) = data {
            request.extend(data);
        }

        self.adapter.send(&request)?;

        loop {
            let response = self.adapter.recv()?;
            let Some(&response_sid) = response.first() else {
                return Err(Error::InvalidResponseLength.into());
            };

            // Check for errors
            if response_sid == NEGATIVE_RESPONSE {
                let Some(&code) = response.get(2) else {
                    return Err(Error::InvalidResponseLength.into());
                };

                if code == NegativeResponseCode::RequestCorrectlyReceivedResponsePending as u8 {
                    info!("Received Response Pending");
                    continue;
                }

                return Err(Error::negative_response(code).into());
            }

            // Check service id
            if response_sid != sid | POSITIVE_RESPONSE {
                return Err(Error::InvalidServiceId(response_sid).into());
            }

            // Check sub function
            let start = match sub_function {
                Some(sub_function) => match response.get(1) {
                    Some(&echoed) if echoed == sub_function => 2,
                    Some(&echoed) => return Err(Error::InvalidSubFunction(echoed).into()),
                    None => return Err(Error::InvalidResponseLength.into()),
                },
                None => 1,
            };

            return Ok(response[start..].to_vec());
        }
    }

    /// 0x10 - Diagnostic Session Control. ECU may optionally return 4 bytes of sessionParameterRecord with some timing information.
    pub fn diagnostic_session_control(&mut self, session_type: u8) -> Result<Option<SessionParameterRecord>> {
        let result = self.request(
            ServiceIdentifier::DiagnosticSessionControl as u8,
            Some(session_type),
            None,
        )?;

        Ok(SessionParameterRecord::from_bytes(&result))
    }

    /// 0x3E - Tester Present
    pub fn tester_present(&mut self) -> Result<()> {
        self.request(ServiceIdentifier::TesterPresent as u8, Some(0), None)?;
        Ok(())
    }

    /// 0x22 - Read Data By Identifier. Specify a 16 bit data identifier, or use a constant from [`constants::DataIdentifier`] for standardized identifiers. Reading multiple identifiers simultaneously is possible on some ECUs, but not supported by this function.
    pub fn read_data_by_identifier(&mut self, data_identifier: u16) -> Result<Vec<u8>> {
        let did = data_identifier.to_be_bytes();
        let resp = self.request(ServiceIdentifier::ReadDataByIdentifier as u8, None, Some(&did))?;

        if resp.len() < 2 {
            return Err(Error::InvalidResponseLength.into());
        }

        let did = u16::from_be_bytes([resp[0], resp[1]]);
        if did != data_identifier {
            return Err(Error::InvalidDataIdentifier(did).into());
        }

        Ok(resp[2..].to_vec())
    }
}
