//! lescan - print Bluetooth LE advertisements seen by a local controller
//!
//! Needs CAP_NET_RAW (or root) to open a raw HCI socket.

use clap::Parser;
use lescan::{
    AdvertisingReport, DeviceSession, HciAdapter, ScanEvent, ScanParameters, ScanType,
    SessionOptions,
};
use log::{debug, error, info, warn};
use std::ops::ControlFlow;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(about = "Scan for Bluetooth LE advertisements over a raw HCI socket")]
struct Args {
    /// Controller index (hciN). Defaults to the first controller that is up
    #[arg(short, long)]
    device: Option<u16>,

    /// Passive scan (no scan requests)
    #[arg(long)]
    passive: bool,

    /// Scan interval in 0.625 ms units, decimal or 0x-prefixed hex
    #[arg(long, default_value = "0x0010", value_parser = parse_timing)]
    interval: u16,

    /// Scan window in 0.625 ms units, decimal or 0x-prefixed hex
    #[arg(long, default_value = "0x0010", value_parser = parse_timing)]
    window: u16,

    /// Report every advertisement instead of letting the controller drop duplicates
    #[arg(long)]
    allow_duplicates: bool,

    /// Sleep between polls of an idle socket, in microseconds
    #[arg(long, default_value_t = 500)]
    poll_interval_us: u64,
}

/// Scan interval and window must lie in 0x0004..=0x4000
fn parse_timing(s: &str) -> Result<u16, String> {
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    }
    .map_err(|e| format!("{}: {}", s, e))?;

    if !(0x0004..=0x4000).contains(&value) {
        return Err(format!("{:#06x} is outside 0x0004..=0x4000", value));
    }
    Ok(value)
}

impl Args {
    fn scan_parameters(&self) -> ScanParameters {
        ScanParameters {
            scan_type: if self.passive {
                ScanType::Passive
            } else {
                ScanType::Active
            },
            interval: self.interval,
            window: self.window,
            filter_duplicates: !self.allow_duplicates,
            ..Default::default()
        }
    }
}

fn print_report(report: &AdvertisingReport) {
    let rssi = report
        .rssi
        .map(|rssi| format!("{} dBm", rssi))
        .unwrap_or_else(|| "?".to_string());

    println!(
        "{} ({:?}) {:?} rssi {}",
        report.address,
        report.address_type,
        report.kind(),
        rssi
    );
    for element in &report.elements {
        println!("    {}", element);
    }
    if let Some(malformed) = &report.malformed {
        println!("    malformed: {}", malformed);
    }
}

fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();

    if args.window > args.interval {
        error!(
            "Scan window {:#06x} is longer than the interval {:#06x}",
            args.window, args.interval
        );
        return ExitCode::FAILURE;
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }

    let mut options = SessionOptions::new().scan_parameters(args.scan_parameters());
    if let Some(device) = args.device {
        options = options.device(device);
    }

    let mut session = DeviceSession::open(&HciAdapter::new(), options);
    if let Some(e) = session.last_error() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    if let Err(e) = session.start_scan() {
        error!("{}", e);
        session.close();
        return ExitCode::FAILURE;
    }

    info!(
        "Scanning on hci{}, press Ctrl-C to stop",
        session.controller_id().unwrap_or_default()
    );

    let poll_interval = Duration::from_micros(args.poll_interval_us);
    let mut reports = 0usize;
    let result = session.listen(poll_interval, |event| {
        match event {
            ScanEvent::Report(report) => {
                reports += 1;
                print_report(report);
            }
            ScanEvent::Skipped(reason) => debug!("Skipped packet: {}", reason),
            ScanEvent::Idle => {}
        }

        if running.load(Ordering::SeqCst) {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        }
    });

    let mut status = ExitCode::SUCCESS;
    match result {
        Ok(exit) => info!("Stopped ({:?}) after {} reports", exit, reports),
        Err(e) => {
            error!("Read failed: {}", e);
            status = ExitCode::FAILURE;
        }
    }

    if let Err(e) = session.stop_scan() {
        error!("{}", e);
        status = ExitCode::FAILURE;
    }
    session.close();

    status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timing() {
        assert_eq!(parse_timing("0x0010"), Ok(0x0010));
        assert_eq!(parse_timing("16"), Ok(16));
        assert_eq!(parse_timing("0X4000"), Ok(0x4000));
        assert!(parse_timing("0x0003").is_err());
        assert!(parse_timing("0x4001").is_err());
        assert!(parse_timing("fast").is_err());
    }

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["lescan"]);
        let params = args.scan_parameters();

        assert_eq!(args.device, None);
        assert_eq!(params, ScanParameters::default());
        assert_eq!(args.poll_interval_us, 500);
    }

    #[test]
    fn test_passive_scan_with_duplicates() {
        let args = Args::parse_from([
            "lescan",
            "--device",
            "1",
            "--passive",
            "--interval",
            "0x0060",
            "--window",
            "0x0030",
            "--allow-duplicates",
        ]);
        let params = args.scan_parameters();

        assert_eq!(args.device, Some(1));
        assert_eq!(params.scan_type, ScanType::Passive);
        assert_eq!(params.interval, 0x0060);
        assert_eq!(params.window, 0x0030);
        assert!(!params.filter_duplicates);
    }
}
