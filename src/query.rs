//! Firmware version queries for PSA ECUs.
//!
//! An ECU is queried by waking it up with tester present, trying the diagnostic sessions until one is accepted, and
//! then reading every data identifier of interest. PSA ECUs respond 0x14 below their request address, which does
//! not match the usual ISO-TP convention, so the response address can be given as a signed offset.
//!
//! ```rust
//! use automotive_safety::query::{query_ecus, EcuAddress, QueryConfig};
//! use automotive_safety::uds::DataIdentifier;
//! use automotive_safety::vecu::{VirtualBus, VirtualEcu};
//!
//! let ecu = VirtualEcu::new(0, 0x6b5, 0x6a1)
//!     .with_identifier(DataIdentifier::SystemSupplierEcuSoftwareNumber as u16, b"9812345680");
//! let mut bus = VirtualBus::default().with_ecu(ecu);
//!
//! let ecus = [EcuAddress { family: "ARTIV".into(), request: 0x6b5, response: 0x6a1 }];
//! let summary = query_ecus(&mut bus, &ecus, &QueryConfig::psa()).unwrap();
//! assert_eq!(summary.success_count(), 1);
//! println!("{}", summary);
//! ```

use std::fmt;
use std::io;
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use bstr::ByteSlice;
use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::can::{CanAdapter, Identifier};
use crate::error::Error;
use crate::isotp::{IsoTPAdapter, IsoTPConfig};
use crate::uds::{DataIdentifier, SessionType, UDSClient};
use crate::Result;

/// Response address offset used by PSA ECUs
pub const PSA_RX_OFFSET: i32 = -0x14;

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_millis(200);

/// Manufacturer specific identifiers below and above the standard 0xF180 block
pub const PSA_OEM_SPECIFIC_1: RangeInclusive<u16> = 0xf100..=0xf17f;
pub const PSA_OEM_SPECIFIC_2: RangeInclusive<u16> = 0xf1a0..=0xf1ff;

/// Sessions tried in order. An ECU that accepts none of them is reported as not responding.
const QUERY_SESSIONS: [SessionType; 4] = [
    SessionType::Default,
    SessionType::ExtendedDiagnostic,
    SessionType::Programming,
    SessionType::SafetySystemDiagnostic,
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryConfig {
    pub bus: u8,
    /// Response address relative to the request address. `None` uses the ISO-TP default.
    pub rx_offset: Option<i32>,
    /// Also read the manufacturer specific identifier ranges
    pub nonstandard: bool,
    /// Per frame timeout
    pub timeout: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            bus: 0,
            rx_offset: None,
            nonstandard: false,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

impl QueryConfig {
    /// Settings for querying a list of PSA ECUs
    pub fn psa() -> Self {
        Self {
            rx_offset: Some(PSA_RX_OFFSET),
            timeout: Duration::from_millis(1500),
            ..Default::default()
        }
    }

    fn isotp_config(&self, addr: u32) -> Result<IsoTPConfig> {
        let config = IsoTPConfig::new(self.bus, Identifier::from(addr)).with_timeout(self.timeout);
        Ok(match self.rx_offset {
            Some(offset) => config.with_rx_id(rx_address(addr, offset)?.into()),
            None => config,
        })
    }
}

/// Parse a signed offset in decimal or `0x` hex, e.g. `-20` or `-0x14`.
pub fn parse_offset(offset: &str) -> Result<i32> {
    let invalid = || Error::InvalidArgument(format!("invalid offset {:?}", offset));

    let (negative, magnitude) = match offset.trim().strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, offset.trim().trim_start_matches('+')),
    };
    let magnitude = match magnitude.strip_prefix("0x").or_else(|| magnitude.strip_prefix("0X")) {
        Some(hex) => i32::from_str_radix(hex, 16),
        None => magnitude.parse(),
    }
    .map_err(|_| invalid())?;

    Ok(if negative { -magnitude } else { magnitude })
}

/// Response address for a request address and signed offset.
pub fn rx_address(addr: u32, rx_offset: i32) -> Result<u32> {
    addr.checked_add_signed(rx_offset)
        .ok_or_else(|| Error::InvalidArgument(format!("offset {} out of range for 0x{:x}", rx_offset, addr)))
}

/// Data identifiers to read with their labels, in ascending order.
pub fn data_identifiers(nonstandard: bool) -> Vec<(u16, &'static str)> {
    let mut identifiers: Vec<(u16, &'static str)> = DataIdentifier::iter()
        .map(|did| (did as u16, did.into()))
        .collect();

    if nonstandard {
        identifiers.extend(PSA_OEM_SPECIFIC_1.map(|did| (did, "PSA_OEM_SPECIFIC_1")));
        identifiers.extend(PSA_OEM_SPECIFIC_2.map(|did| (did, "PSA_OEM_SPECIFIC_2")));
        identifiers.sort_by_key(|&(did, _)| did);
    }
    identifiers
}

/// Every 11-bit diagnostic address, optionally followed by the 29-bit physical addresses of the same range.
pub fn scan_addresses(extended: bool) -> Vec<u32> {
    let mut addrs: Vec<u32> = (0x600..=0x7ff).collect();
    if extended {
        addrs.extend((0x600..=0x6ff).map(|i| 0x18da_0000 + (i << 8) + 0xf1));
    }
    addrs
}

/// One identifier read from an ECU.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRecord {
    pub identifier: u16,
    pub label: &'static str,
    pub data: Vec<u8>,
}

/// Everything an ECU returned.
#[derive(Debug, Clone, PartialEq)]
pub struct EcuResponse {
    pub bus: u8,
    pub addr: u32,
    pub rx_addr: u32,
    pub records: Vec<DataRecord>,
}

impl EcuResponse {
    fn has_label(&self, needle: &str) -> bool {
        self.records.iter().any(|r| r.label.to_ascii_lowercase().contains(needle))
    }

    /// Any software or firmware identifier was returned
    pub fn has_software_id(&self) -> bool {
        self.has_label("software") || self.has_label("firmware")
    }

    pub fn has_hardware_id(&self) -> bool {
        self.has_label("hardware")
    }
}

impl fmt::Display for EcuResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "*** Results @addr=0x{:X}, bus={} ***", self.addr, self.bus)?;
        for record in &self.records {
            writeln!(f, "  0x{:04X} {}: {:?}", record.identifier, record.label, record.data.as_bstr())?;
        }
        Ok(())
    }
}

/// Timeouts and negative responses mean the ECU has nothing for us. Anything else is a real error.
fn no_answer(err: &Error) -> bool {
    match err {
        Error::Timeout => true,
        Error::UDSError(err) => err.is_negative_response(),
        _ => false,
    }
}

/// Query a single ECU. Returns `None` when the ECU does not accept any session or returns no identifiers.
pub fn query_ecu<A: CanAdapter>(adapter: &mut A, config: IsoTPConfig, nonstandard: bool) -> Result<Option<EcuResponse>> {
    let (addr, rx_addr) = (u32::from(config.tx_id), u32::from(config.rx_id));
    let mut uds = UDSClient::new(IsoTPAdapter::new(adapter, config));

    match uds.tester_present() {
        Err(Error::Timeout) => return Ok(None),
        Err(err) if !no_answer(&err) => return Err(err),
        _ => {}
    }

    let mut session_accepted = false;
    for session in QUERY_SESSIONS {
        match uds.diagnostic_session_control(session as u8) {
            Ok(_) => {
                debug!("0x{:x} accepted session {:?}", addr, session);
                session_accepted = true;
            }
            Err(err) if no_answer(&err) => {}
            Err(err) => return Err(err),
        }
    }
    if !session_accepted {
        return Ok(None);
    }

    let mut records = vec![];
    for (identifier, label) in data_identifiers(nonstandard) {
        match uds.read_data_by_identifier(identifier) {
            Ok(data) if !data.is_empty() => records.push(DataRecord { identifier, label, data }),
            Ok(_) => {}
            Err(err) if no_answer(&err) => {}
            Err(err) => return Err(err),
        }
    }

    Ok((!records.is_empty()).then_some(EcuResponse {
        bus: config.bus,
        addr,
        rx_addr,
        records,
    }))
}

/// Query every address in `addrs`, returning the ECUs that answered.
pub fn scan<A: CanAdapter>(adapter: &mut A, addrs: &[u32], config: &QueryConfig) -> Result<Vec<EcuResponse>> {
    let mut responses = vec![];
    for &addr in addrs {
        let isotp = config.isotp_config(addr)?;
        if let Some(response) = query_ecu(adapter, isotp, config.nonstandard)? {
            info!("0x{:x} returned {} identifiers", addr, response.records.len());
            responses.push(response);
        }
    }
    Ok(responses)
}

/// Entry of an ECU list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcuAddress {
    pub family: String,
    pub request: u32,
    pub response: u32,
}

/// Read an ECU list from CSV with `family`, `request` and `response` columns. Addresses are hex.
pub fn load_ecu_list<R: io::Read>(reader: R) -> Result<Vec<EcuAddress>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::InvalidArgument(format!("missing column {}", name)))
    };
    let (family_col, request_col, response_col) = (column("family")?, column("request")?, column("response")?);

    let parse_addr = |addr: &str| {
        let digits = addr.strip_prefix("0x").or_else(|| addr.strip_prefix("0X")).unwrap_or(addr);
        u32::from_str_radix(digits, 16).map_err(|_| Error::InvalidArgument(format!("invalid address {:?}", addr)))
    };

    let mut ecus = vec![];
    for record in reader.records() {
        let record = record?;
        let field = |col: usize| {
            record
                .get(col)
                .ok_or_else(|| Error::InvalidArgument(format!("short record {:?}", record)))
        };
        ecus.push(EcuAddress {
            family: field(family_col)?.to_string(),
            request: parse_addr(field(request_col)?)?,
            response: parse_addr(field(response_col)?)?,
        });
    }
    Ok(ecus)
}

/// Outcome of querying one ECU from a list.
#[derive(Debug, Clone, PartialEq)]
pub struct EcuQueryResult {
    pub ecu: EcuAddress,
    pub response: Option<EcuResponse>,
    pub elapsed: Duration,
}

impl EcuQueryResult {
    pub fn success(&self) -> bool {
        self.response.is_some()
    }
}

/// Results of querying an ECU list. `Display` prints the summary table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySummary {
    pub results: Vec<EcuQueryResult>,
}

impl QuerySummary {
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success()).count()
    }

    pub fn total_time(&self) -> Duration {
        self.results.iter().map(|r| r.elapsed).sum()
    }

    fn responses(&self) -> impl Iterator<Item = &EcuResponse> {
        self.results.iter().filter_map(|r| r.response.as_ref())
    }

    pub fn with_software_id(&self) -> usize {
        self.responses().filter(|r| r.has_software_id()).count()
    }

    pub fn with_hardware_id(&self) -> usize {
        self.responses().filter(|r| r.has_hardware_id()).count()
    }
}

impl fmt::Display for QuerySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let success = self.success_count();
        writeln!(f, "Total ECUs queried: {}", self.results.len())?;
        writeln!(f, "Successful responses: {}", success)?;
        writeln!(f, "Failed responses: {}", self.results.len() - success)?;
        writeln!(f, "Total query time: {:.2} seconds", self.total_time().as_secs_f64())?;
        writeln!(f)?;

        writeln!(
            f,
            "{:<20} {:<12} {:<12} {:<10} {:<10}",
            "ECU Family", "Request ID", "Response ID", "Status", "Time (s)"
        )?;
        writeln!(f, "{} {} {} {} {}", "-".repeat(20), "-".repeat(12), "-".repeat(12), "-".repeat(10), "-".repeat(10))?;

        let mut rows: Vec<&EcuQueryResult> = self.results.iter().collect();
        rows.sort_by(|a, b| a.ecu.family.cmp(&b.ecu.family));
        for result in rows {
            writeln!(
                f,
                "{:<20} {:<12} {:<12} {:<10} {:.2}",
                result.ecu.family,
                format!("0x{:X}", result.ecu.request),
                format!("0x{:X}", result.ecu.response),
                if result.success() { "SUCCESS" } else { "FAILED" },
                result.elapsed.as_secs_f64()
            )?;
        }

        writeln!(f)?;
        writeln!(f, "ECUs with software identifiers: {}", self.with_software_id())?;
        write!(f, "ECUs with hardware identifiers: {}", self.with_hardware_id())
    }
}

/// Query every ECU of a list. With an `rx_offset` in `config` the response address is derived from the request
/// address, otherwise the listed response address is used.
pub fn query_ecus<A: CanAdapter>(adapter: &mut A, ecus: &[EcuAddress], config: &QueryConfig) -> Result<QuerySummary> {
    let mut summary = QuerySummary::default();
    for ecu in ecus {
        info!(
            "Querying ECU: {} (Request: 0x{:X}, Response: 0x{:X})",
            ecu.family, ecu.request, ecu.response
        );

        let isotp = match config.rx_offset {
            Some(_) => config.isotp_config(ecu.request)?,
            None => IsoTPConfig::new(config.bus, ecu.request.into())
                .with_rx_id(ecu.response.into())
                .with_timeout(config.timeout),
        };

        let start = Instant::now();
        let response = query_ecu(adapter, isotp, config.nonstandard)?;
        summary.results.push(EcuQueryResult {
            ecu: ecu.clone(),
            response,
            elapsed: start.elapsed(),
        });
    }
    Ok(summary)
}
