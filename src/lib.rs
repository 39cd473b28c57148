//! USB Host driver for the MAX3421E SPI host controller.
//! Refer to the MAX3421E Programming Guide (AN3785) for detailed explanation of registers.
//!
//! The `Max3421` chip driver owns the register link, the packet dispatcher, the transfer engines
//! and the enumeration state machine. `UsbHost` composes it with a registry of `DeviceConfig`s.
#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;

#[macro_use]
extern crate bitfield;

extern crate alloc;

pub mod config;
pub mod drivers;
pub mod max3421;
pub mod transport;
pub mod usb;

mod error;
mod host;

#[cfg(test)]
mod sim;

pub use config::{HostConfig, StallPolicy};
pub use error::{HostResult, UsbError};
pub use host::{DeviceConfig, HostState, InputCallback, UsbHost};
pub use max3421::{LinkState, Max3421, TransferStats, UsbState};
pub use transport::{SpiTransport, Transport};
pub use usb::{DeviceDescriptor, DeviceRecord, Endpoint, SetupPacket, Toggle, UsbBus};
