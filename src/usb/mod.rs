//! USB protocol types shared by the chip driver and the device drivers.
//!
//! The `UsbBus` trait is the transfer interface device configurations use to talk to their device.

pub mod address;
pub mod descriptor;
pub mod device;
pub mod endpoint;
pub mod setup;

pub use address::{Address, AddressPool};
pub use descriptor::{ConfigurationDescriptor, DeviceDescriptor};
pub use device::{DeviceRecord, DeviceTable};
pub use endpoint::{Direction, Endpoint, Toggle};
pub use setup::{DescriptorType, RequestCode, RequestDirection, RequestKind, RequestRecipient, RequestType, SetupPacket};

use crate::UsbError;

/// Host Controller Interface used by device configurations.
pub trait UsbBus {
    /// Issue a control transfer with an optional data stage on `endpoint` of device `address`.
    /// The data stage direction is determined by the direction of the setup request type.
    ///
    /// On success, the amount of data transferred into `data` is returned.
    fn control_request(&mut self, address: u8, endpoint: u8, setup: SetupPacket, data: Option<&mut [u8]>) -> Result<usize, UsbError>;

    /// Read from `ep` until a short packet arrives or `buf` is full.
    /// On success, the amount of data transferred into `buf` is returned.
    fn in_transfer(&mut self, ep: &mut Endpoint, buf: &mut [u8], nak_limit: u16) -> Result<usize, UsbError>;

    /// Send `data` to `ep` as a single packet.
    fn out_transfer(&mut self, ep: &mut Endpoint, data: &[u8], nak_limit: u16) -> Result<(), UsbError>;

    fn delay_ms(&mut self, ms: u32);

    fn get_device_descriptor(&mut self, address: u8) -> Result<DeviceDescriptor, UsbError> {
        let mut buf = [0; DeviceDescriptor::SIZE];
        let setup = SetupPacket::get_descriptor(DescriptorType::Device, 0, buf.len() as u16);
        let len = self.control_request(address, 0, setup, Some(&mut buf))?;
        DeviceDescriptor::parse(&buf[..len])
    }

    /// Only the 9 byte header, enough to learn the configuration value.
    fn get_configuration_descriptor(&mut self, address: u8, index: u8) -> Result<ConfigurationDescriptor, UsbError> {
        let mut buf = [0; ConfigurationDescriptor::SIZE];
        let setup = SetupPacket::get_descriptor(DescriptorType::Configuration, index, buf.len() as u16);
        let len = self.control_request(address, 0, setup, Some(&mut buf))?;
        ConfigurationDescriptor::parse(&buf[..len])
    }

    /// Current configuration value, 0 when the device is not configured.
    fn get_configuration(&mut self, address: u8) -> Result<u8, UsbError> {
        let mut buf = [0; 1];
        match self.control_request(address, 0, SetupPacket::get_configuration(), Some(&mut buf))? {
            0 => Err(UsbError::Receive),
            _ => Ok(buf[0]),
        }
    }

    fn set_configuration(&mut self, address: u8, config_value: u8) -> Result<(), UsbError> {
        self.control_request(address, 0, SetupPacket::set_configuration(config_value), None)?;
        Ok(())
    }

    fn set_device_address(&mut self, address: u8, new_address: u8) -> Result<(), UsbError> {
        self.control_request(address, 0, SetupPacket::set_address(new_address), None)?;
        Ok(())
    }
}
