//! Lists messages that became less frequent between two parts of a CSV log.
//!
//! Usage: `can_drop <log.csv> <baseline start> <baseline end> <compare start> <compare end> [threshold]`
use automotive_safety::rates::{compare_rates, read_csv_log, MessageRates, DEFAULT_DROP_THRESHOLD};
use automotive_safety::Error;

fn arg(args: &[String], idx: usize, name: &str) -> automotive_safety::Result<f64> {
    let value = args
        .get(idx)
        .ok_or_else(|| Error::InvalidArgument(format!("missing {}", name)))?;
    value
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("invalid {} {:?}", name, value)))
}

fn main() -> automotive_safety::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    let path = args.get(1).ok_or_else(|| Error::InvalidArgument("missing log file".into()))?;
    let baseline_start = arg(&args, 2, "baseline start")?;
    let baseline_end = arg(&args, 3, "baseline end")?;
    let compare_start = arg(&args, 4, "compare start")?;
    let compare_end = arg(&args, 5, "compare end")?;
    let threshold = match args.get(6) {
        Some(_) => arg(&args, 6, "threshold")?,
        None => DEFAULT_DROP_THRESHOLD,
    };

    let file = std::fs::File::open(path).map_err(|e| Error::InvalidArgument(e.to_string()))?;
    let records = read_csv_log(file)?;

    let baseline = MessageRates::from_records(&records, baseline_start, baseline_end)?;
    let compare = MessageRates::from_records(&records, compare_start, compare_end)?;

    println!("{:<15} {:<20} {:<15} {:<10}", "Message ID", "Baseline Rate (Hz)", "New Rate (Hz)", "Drop Ratio");
    for dropped in compare_rates(&baseline, &compare, threshold) {
        println!("{}", dropped);
    }
    Ok(())
}
