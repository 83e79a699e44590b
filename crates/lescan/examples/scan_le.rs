//! Example: Scanning for BLE devices
//!
//! Opens the default controller, scans for ten seconds and prints every
//! advertising report it decodes.
//!
//! Note: This example requires root privileges to run, as opening raw HCI sockets
//! requires elevated permissions.

use lescan::{DeviceSession, HciAdapter, ScanEvent, SessionOptions};
use std::ops::ControlFlow;
use std::time::{Duration, Instant};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Opening default HCI device...");
    let mut session = DeviceSession::try_open(&HciAdapter::new(), SessionOptions::new())?;

    println!("Enabling LE scanning on hci{}...", session.controller_id().unwrap_or_default());
    session.start_scan()?;

    println!("Scanning for 10 seconds...");
    let deadline = Instant::now() + Duration::from_secs(10);

    session.listen(Duration::from_millis(1), |event| {
        if let ScanEvent::Report(report) = event {
            println!(
                "{} rssi={:?} name={:?}",
                report.address,
                report.rssi,
                report.name()
            );
            for element in &report.elements {
                println!("  {}", element);
            }
        }

        if Instant::now() < deadline {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        }
    })?;

    println!("Disabling LE scanning...");
    session.stop_scan()?;
    session.close();

    println!("Scan complete!");

    Ok(())
}
