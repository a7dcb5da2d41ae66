//! Queries a list of PSA ECUs for their firmware versions and prints a summary. Runs against virtual ECUs, pass a CSV
//! file with `family,request,response` columns to use your own list.
use std::time::Duration;

use automotive_safety::query::{self, load_ecu_list, query_ecus, QueryConfig};
use automotive_safety::uds::DataIdentifier;
use automotive_safety::vecu::{VirtualBus, VirtualEcu};
use tracing::info;

const ECU_LIST: &str = "\
family,request,response
ARTIV,6B5,6A1
BSI,752,652
CMM,6A8,688
DIRECTION,6B4,694
";

fn main() -> automotive_safety::Result<()> {
    tracing_subscriber::fmt::init();

    let ecus = match std::env::args().nth(1) {
        Some(path) => {
            let file = std::fs::File::open(&path).map_err(|e| automotive_safety::Error::InvalidArgument(e.to_string()))?;
            load_ecu_list(file)?
        }
        None => load_ecu_list(ECU_LIST.as_bytes())?,
    };

    // The camera and the steering answer, the others stay silent
    let mut bus = VirtualBus::default()
        .with_ecu(
            VirtualEcu::new(0, 0x6b5, 0x6a1)
                .with_identifier(DataIdentifier::SystemSupplierEcuSoftwareNumber as u16, b"9824680880")
                .with_identifier(DataIdentifier::SystemSupplierEcuHardwareNumber as u16, b"9812345680")
                .with_identifier(0xf0fe, b"\x01\x02"),
        )
        .with_ecu(
            VirtualEcu::new(0, 0x6b4, 0x6a0)
                .with_sessions(&[0x03])
                .with_identifier(0xf1a0, b"EPS-V2"),
        );

    let config = QueryConfig {
        nonstandard: true,
        timeout: Duration::from_millis(50),
        ..QueryConfig::psa()
    };
    info!("Querying {} ECUs, rx offset {:?}", ecus.len(), config.rx_offset);

    let summary = query_ecus(&mut bus, &ecus, &config)?;
    for result in &summary.results {
        match &result.response {
            Some(response) => print!("{}", response),
            None => println!("{}: no fw versions found!", result.ecu.family),
        }
    }
    println!();
    println!("{}", summary);

    info!(
        "A full scan would cover {} addresses",
        query::scan_addresses(true).len()
    );
    Ok(())
}
