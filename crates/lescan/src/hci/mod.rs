//! Bluetooth HCI (Host Controller Interface) implementation
//!
//! This module provides the raw socket transport, the commands the scanner
//! sends and the socket filter it manipulates.

pub mod constants;
pub mod filter;
pub mod packet;
pub mod socket;
pub mod transport;

#[cfg(test)]
mod tests;

pub use filter::HciFilter;
pub use packet::{HciCommand, HciEvent};
pub use socket::{HciAdapter, HciSocket};
pub use transport::{Adapter, HciHandle, ReadStatus};
