//! Message rate comparison between two intervals of a CAN log.
//!
//! Useful to verify that a safety model only drops what it should: record a baseline with the relay passive,
//! record again with it active, and list every message whose rate dropped significantly. Logs come either as
//! timestamped [`Frame`]s or as CSV files, see [`read_csv_log`].

use std::collections::BTreeMap;
use std::fmt;
use std::io;

use crate::can::Frame;
use crate::error::Error;
use crate::Result;

/// Messages whose rate falls below this fraction of the baseline are reported.
pub const DEFAULT_DROP_THRESHOLD: f64 = 0.5;

/// Highest bus number counted. Larger numbers are used by loggers for metadata.
const MAX_BUS: u8 = 127;

/// Rate in Hz per (bus, address).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MessageRates {
    rates: BTreeMap<(u8, u32), f64>,
}

impl MessageRates {
    /// Count frames received between `start` and `end` seconds. Records must be in time order.
    pub fn from_log<'a, I>(records: I, start: f64, end: f64) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, &'a Frame)>,
    {
        Self::count(
            records.into_iter().map(|(time, frame)| (time, frame.bus, frame.addr())),
            start,
            end,
        )
    }

    /// Same as [`MessageRates::from_log`] for records read from a CSV log.
    pub fn from_records<'a, I>(records: I, start: f64, end: f64) -> Result<Self>
    where
        I: IntoIterator<Item = &'a LogRecord>,
    {
        Self::count(records.into_iter().map(|r| (r.time, r.bus, r.addr)), start, end)
    }

    fn count<I>(records: I, start: f64, end: f64) -> Result<Self>
    where
        I: Iterator<Item = (f64, u8, u32)>,
    {
        if end <= start {
            return Err(Error::InvalidInterval { start, end });
        }

        let mut counts: BTreeMap<(u8, u32), u64> = BTreeMap::new();
        for (time, bus, addr) in records {
            if time < start || bus > MAX_BUS {
                continue;
            } else if time > end {
                break;
            }
            *counts.entry((bus, addr)).or_default() += 1;
        }

        let duration = end - start;
        let rates = counts
            .into_iter()
            .map(|(key, count)| (key, count as f64 / duration))
            .collect();
        Ok(Self { rates })
    }

    pub fn get(&self, bus: u8, addr: u32) -> Option<f64> {
        self.rates.get(&(bus, addr)).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, u32, f64)> + '_ {
        self.rates.iter().map(|(&(bus, addr), &rate)| (bus, addr, rate))
    }
}

/// Column layout of a CSV log, told apart by the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// `Time,MessageID,Message,Bus`
    Logger,
    /// `time,addr,data,bus` as exported by cabana
    Cabana,
}

impl LogFormat {
    pub fn detect(headers: &csv::StringRecord) -> LogFormat {
        if headers.iter().any(|h| h == "Bus") {
            LogFormat::Logger
        } else {
            LogFormat::Cabana
        }
    }

    /// Names of the time, message id and bus columns
    fn columns(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            LogFormat::Logger => ("Time", "MessageID", "Bus"),
            LogFormat::Cabana => ("time", "addr", "bus"),
        }
    }
}

/// One line of a CSV log. The payload column is not needed to count rates and is not kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRecord {
    /// Seconds
    pub time: f64,
    pub bus: u8,
    pub addr: u32,
}

/// Parse a message id written either as hex with a `0x` prefix or as a decimal number.
pub fn parse_message_id(id: &str) -> Result<u32> {
    let parsed = match id.strip_prefix("0x").or_else(|| id.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => id.parse(),
    };
    parsed.map_err(|_| Error::InvalidLogRecord(format!("invalid message id {:?}", id)))
}

/// Read a CSV log in either [`LogFormat`]. Records are returned in file order.
pub fn read_csv_log<R: io::Read>(reader: R) -> Result<Vec<LogRecord>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = reader.headers()?.clone();
    let format = LogFormat::detect(&headers);
    let (time_name, id_name, bus_name) = format.columns();
    let time_col = column(&headers, time_name)?;
    let id_col = column(&headers, id_name)?;
    let bus_col = column(&headers, bus_name)?;

    let mut records = vec![];
    for record in reader.records() {
        let record = record?;
        let field = |col: usize| {
            record
                .get(col)
                .ok_or_else(|| Error::InvalidLogRecord(format!("short record {:?}", record)))
        };

        let time = field(time_col)?;
        let time = time
            .parse()
            .map_err(|_| Error::InvalidLogRecord(format!("invalid time {:?}", time)))?;
        let addr = parse_message_id(field(id_col)?)?;
        let bus = field(bus_col)?;
        let bus = bus
            .parse()
            .map_err(|_| Error::InvalidLogRecord(format!("invalid bus {:?}", bus)))?;

        records.push(LogRecord { time, bus, addr });
    }
    Ok(records)
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| Error::InvalidLogRecord(format!("missing column {}", name)))
}

/// A message that became significantly less frequent.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedMessage {
    pub bus: u8,
    pub addr: u32,
    pub baseline_rate: f64,
    pub compare_rate: f64,
    pub drop_ratio: f64,
}

impl fmt::Display for DroppedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = format!("{}:{:x}", self.bus, self.addr);
        write!(
            f,
            "{:<15} {:<20.3} {:<15.3} {:<10.2}",
            id, self.baseline_rate, self.compare_rate, self.drop_ratio
        )
    }
}

/// List baseline messages whose rate in `compare` is below `threshold` times the baseline rate.
pub fn compare_rates(baseline: &MessageRates, compare: &MessageRates, threshold: f64) -> Vec<DroppedMessage> {
    baseline
        .iter()
        .filter(|&(_, _, baseline_rate)| baseline_rate != 0.0)
        .filter_map(|(bus, addr, baseline_rate)| {
            let compare_rate = compare.get(bus, addr).unwrap_or(0.0);
            let drop_ratio = compare_rate / baseline_rate;
            (drop_ratio < threshold).then_some(DroppedMessage {
                bus,
                addr,
                baseline_rate,
                compare_rate,
                drop_ratio,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(bus: u8, addr: u32) -> Frame {
        Frame::new(bus, addr.into(), &[0; 8]).unwrap()
    }

    #[test]
    fn rates_in_interval() {
        let lkas = frame(0, 1010);
        let speed = frame(1, 909);
        let meta = frame(128, 1);

        let mut log = vec![];
        for i in 0..40 {
            let t = i as f64 * 0.05;
            log.push((t, &lkas));
            log.push((t, &meta));
            if i % 2 == 0 {
                log.push((t, &speed));
            }
        }

        let rates = MessageRates::from_log(log.iter().copied(), 0.5, 1.5).unwrap();
        assert_eq!(rates.len(), 2);
        assert!((rates.get(0, 1010).unwrap() - 21.0).abs() < 1e-9);
        assert!((rates.get(1, 909).unwrap() - 11.0).abs() < 1e-9);
        assert_eq!(rates.get(128, 1), None);
    }

    #[test]
    fn invalid_interval() {
        let r = MessageRates::from_log(std::iter::empty(), 2.0, 1.0);
        assert_eq!(r, Err(Error::InvalidInterval { start: 2.0, end: 1.0 }));
    }

    #[test]
    fn detects_dropped_messages() {
        let lkas = frame(0, 1010);
        let driver = frame(0, 1390);

        let baseline: Vec<(f64, &Frame)> = (0..10)
            .flat_map(|i| [(i as f64 * 0.1, &lkas), (i as f64 * 0.1, &driver)])
            .collect();
        let compare: Vec<(f64, &Frame)> = (10..20)
            .filter(|i| i % 4 == 0)
            .map(|i| (i as f64 * 0.1, &lkas))
            .chain((10..20).map(|i| (i as f64 * 0.1, &driver)))
            .collect();
        let mut compare = compare;
        compare.sort_by(|a, b| a.0.total_cmp(&b.0));

        let baseline = MessageRates::from_log(baseline, 0.0, 1.0).unwrap();
        let compare = MessageRates::from_log(compare, 1.0, 2.0).unwrap();

        let dropped = compare_rates(&baseline, &compare, DEFAULT_DROP_THRESHOLD);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].addr, 1010);
        assert_eq!(dropped[0].bus, 0);
        assert!(dropped[0].drop_ratio < 0.5);
        assert!(dropped[0].to_string().starts_with("0:3f2"));
    }

    #[test]
    fn missing_message_counts_as_zero() {
        let lkas = frame(2, 1010);
        let baseline = MessageRates::from_log([(0.5, &lkas)], 0.0, 1.0).unwrap();
        let compare = MessageRates::default();

        let dropped = compare_rates(&baseline, &compare, DEFAULT_DROP_THRESHOLD);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].compare_rate, 0.0);
        assert_eq!(dropped[0].drop_ratio, 0.0);
    }

    const LOGGER_LOG: &str = "\
Time,MessageID,Message,Bus
0.00,1010,0000000000000000,0
0.10,909,0000000000000000,1
0.20,1010,0000000000000000,0
0.30,1010,0000000000000000,128
0.40,1010,0000000000000000,0
";

    const CABANA_LOG: &str = "\
time,addr,data,bus
0.0,0x3f2,0000000000000000,0
0.5,0x3F2,0000000000000000,0
1.0,0x38d,0000000000000000,1
";

    #[test]
    fn csv_logger_format() {
        let records = read_csv_log(LOGGER_LOG.as_bytes()).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[1], LogRecord { time: 0.1, bus: 1, addr: 909 });

        let rates = MessageRates::from_records(&records, 0.0, 1.0).unwrap();
        assert_eq!(rates.len(), 2);
        assert!((rates.get(0, 1010).unwrap() - 3.0).abs() < 1e-9);
        assert!((rates.get(1, 909).unwrap() - 1.0).abs() < 1e-9);

        // Metadata buses are skipped
        assert_eq!(rates.get(128, 1010), None);
    }

    #[test]
    fn csv_cabana_format() {
        let mut reader = csv::Reader::from_reader(CABANA_LOG.as_bytes());
        assert_eq!(LogFormat::detect(reader.headers().unwrap()), LogFormat::Cabana);

        let records = read_csv_log(CABANA_LOG.as_bytes()).unwrap();
        let addrs: Vec<u32> = records.iter().map(|r| r.addr).collect();
        assert_eq!(addrs, vec![0x3f2, 0x3f2, 0x38d]);

        let rates = MessageRates::from_records(&records, 0.0, 2.0).unwrap();
        assert!((rates.get(0, 1010).unwrap() - 1.0).abs() < 1e-9);
        assert!((rates.get(1, 909).unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn message_id_notation() {
        assert_eq!(parse_message_id("0x3f2"), Ok(1010));
        assert_eq!(parse_message_id("1010"), Ok(1010));
        assert_eq!(parse_message_id("0x18daf110"), Ok(0x18daf110));
        assert!(matches!(parse_message_id("3f2"), Err(Error::InvalidLogRecord(_))));
    }

    #[test]
    fn csv_bad_records() {
        let missing_bus = "time,addr,data\n0.0,0x3f2,00\n";
        assert!(matches!(read_csv_log(missing_bus.as_bytes()), Err(Error::InvalidLogRecord(_))));

        let bad_time = "time,addr,data,bus\nnow,0x3f2,00,0\n";
        assert!(matches!(read_csv_log(bad_time.as_bytes()), Err(Error::InvalidLogRecord(_))));

        let ragged = "time,addr,data,bus\n0.0,0x3f2\n";
        assert!(matches!(read_csv_log(ragged.as_bytes()), Err(Error::Csv(_))));
    }
}
