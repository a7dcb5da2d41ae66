use strum_macros::FromRepr;
use thiserror::Error;

/// Negative response codes as defined in ISO 14229
#[derive(Debug, Copy, Clone, Eq, PartialEq, FromRepr)]
#[repr(u8)]
pub enum NegativeResponseCode {
    GeneralReject = 0x10,
    ServiceNotSupported = 0x11,
    SubFunctionNotSupported = 0x12,
    IncorrectMessageLengthOrInvalidFormat = 0x13,
    ResponseTooLong = 0x14,
    BusyRepeatRequest = 0x21,
    ConditionsNotCorrect = 0x22,
    RequestSequenceError = 0x24,
    NoResponseFromSubnetComponent = 0x25,
    FailurePreventsExecutionOfRequestedAction = 0x26,
    RequestOutOfRange = 0x31,
    SecurityAccessDenied = 0x33,
    InvalidKey = 0x35,
    ExceededNumberOfAttempts = 0x36,
    RequiredTimeDelayNotExpired = 0x37,
    UploadDownloadNotAccepted = 0x70,
    TransferDataSuspended = 0x71,
    GeneralProgrammingFailure = 0x72,
    WrongBlockSequenceCounter = 0x73,
    RequestCorrectlyReceivedResponsePending = 0x78,
    SubFunctionNotSupportedInActiveSession = 0x7e,
    ServiceNotSupportedInActiveSession = 0x7f,
}

#[derive(Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum Error {
    #[error("Invalid Response Service ID: {0:#04x}")]
    InvalidServiceId(u8),
    #[error("Invalid Response Sub Function ID: {0:#04x}")]
    InvalidSubFunction(u8),
    #[error("Invalid Response Data Identifier: {0:#06x}")]
    InvalidDataIdentifier(u16),
    #[error("Invalid Response Length")]
    InvalidResponseLength,
    #[error("Negative Response: {0:?}")]
    NegativeResponse(NegativeResponseCode),
    #[error("Negative Response: non-standard code {0:#04x}")]
    NonStandardNegativeResponse(u8),
}

impl Error {
    pub fn negative_response(code: u8) -> Error {
        match NegativeResponseCode::from_repr(code) {
            Some(code) => Error::NegativeResponse(code),
            None => Error::NonStandardNegativeResponse(code),
        }
    }

    /// The ECU understood the request and refused it
    pub fn is_negative_response(&self) -> bool {
        matches!(self, Error::NegativeResponse(_) | Error::NonStandardNegativeResponse(_))
    }
}
