//! Fixed-layout standard descriptors, decoded field by field from their little-endian wire form.

use crate::UsbError;

/// cf §9.6.1 of USB 2.0
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceDescriptor {
    pub b_length: u8,
    pub b_descriptor_type: u8,
    pub bcd_usb: u16,
    pub b_device_class: u8,
    pub b_device_sub_class: u8,
    pub b_device_protocol: u8,
    pub b_max_packet_size: u8,
    pub id_vendor: u16,
    pub id_product: u16,
    pub bcd_device: u16,
    pub i_manufacturer: u8,
    pub i_product: u8,
    pub i_serial_number: u8,
    pub b_num_configurations: u8,
}

impl DeviceDescriptor {
    pub const SIZE: usize = 18;

    pub fn parse(buf: &[u8]) -> Result<Self, UsbError> {
        if buf.len() < Self::SIZE {
            return Err(UsbError::Descriptor);
        }
        Ok(Self {
            b_length: buf[0],
            b_descriptor_type: buf[1],
            bcd_usb: u16::from_le_bytes([buf[2], buf[3]]),
            b_device_class: buf[4],
            b_device_sub_class: buf[5],
            b_device_protocol: buf[6],
            b_max_packet_size: buf[7],
            id_vendor: u16::from_le_bytes([buf[8], buf[9]]),
            id_product: u16::from_le_bytes([buf[10], buf[11]]),
            bcd_device: u16::from_le_bytes([buf[12], buf[13]]),
            i_manufacturer: buf[14],
            i_product: buf[15],
            i_serial_number: buf[16],
            b_num_configurations: buf[17],
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let bcd_usb = self.bcd_usb.to_le_bytes();
        let vid = self.id_vendor.to_le_bytes();
        let pid = self.id_product.to_le_bytes();
        let bcd_device = self.bcd_device.to_le_bytes();
        [
            self.b_length,
            self.b_descriptor_type,
            bcd_usb[0],
            bcd_usb[1],
            self.b_device_class,
            self.b_device_sub_class,
            self.b_device_protocol,
            self.b_max_packet_size,
            vid[0],
            vid[1],
            pid[0],
            pid[1],
            bcd_device[0],
            bcd_device[1],
            self.i_manufacturer,
            self.i_product,
            self.i_serial_number,
            self.b_num_configurations,
        ]
    }
}

/// Header of the configuration descriptor tree, cf §9.6.3 of USB 2.0
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigurationDescriptor {
    pub b_length: u8,
    pub b_descriptor_type: u8,
    pub w_total_length: u16,
    pub b_num_interfaces: u8,
    pub b_configuration_value: u8,
    pub i_configuration: u8,
    pub bm_attributes: u8,
    pub b_max_power: u8,
}

impl ConfigurationDescriptor {
    pub const SIZE: usize = 9;

    pub fn parse(buf: &[u8]) -> Result<Self, UsbError> {
        if buf.len() < Self::SIZE {
            return Err(UsbError::Descriptor);
        }
        Ok(Self {
            b_length: buf[0],
            b_descriptor_type: buf[1],
            w_total_length: u16::from_le_bytes([buf[2], buf[3]]),
            b_num_interfaces: buf[4],
            b_configuration_value: buf[5],
            i_configuration: buf[6],
            bm_attributes: buf[7],
            b_max_power: buf[8],
        })
    }
}
