use num_enum::TryFromPrimitive;

/// Direction of the data stage of a control request.
///
/// cf §9.3.1 of USB 2.0
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestDirection {
    HostToDevice = 0x00,
    DeviceToHost = 0x80,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestKind {
    Standard = 0x00,
    Class = 0x20,
    Vendor = 0x40,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestRecipient {
    Device = 0x00,
    Interface = 0x01,
    Endpoint = 0x02,
    Other = 0x03,
}

/// The `bmRequestType` byte.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RequestType(pub u8);

impl From<(RequestDirection, RequestKind, RequestRecipient)> for RequestType {
    fn from((dir, kind, recipient): (RequestDirection, RequestKind, RequestRecipient)) -> Self {
        RequestType(dir as u8 | kind as u8 | recipient as u8)
    }
}

impl RequestType {
    pub fn direction(&self) -> RequestDirection {
        if self.0 & 0x80 != 0 {
            RequestDirection::DeviceToHost
        } else {
            RequestDirection::HostToDevice
        }
    }

    pub fn standard_get() -> Self {
        Self::from((RequestDirection::DeviceToHost, RequestKind::Standard, RequestRecipient::Device))
    }

    pub fn standard_set() -> Self {
        Self::from((RequestDirection::HostToDevice, RequestKind::Standard, RequestRecipient::Device))
    }
}

/// Standard device requests, cf table 9-4 of USB 2.0
#[derive(Copy, Clone, Debug, Eq, PartialEq, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RequestCode {
    GetStatus = 0,
    ClearFeature = 1,
    SetFeature = 3,
    SetAddress = 5,
    GetDescriptor = 6,
    SetDescriptor = 7,
    GetConfiguration = 8,
    SetConfiguration = 9,
    GetInterface = 10,
    SetInterface = 11,
    SynchFrame = 12,
}

/// Descriptor types, cf table 9-5 of USB 2.0
#[derive(Copy, Clone, Debug, Eq, PartialEq, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DescriptorType {
    Device = 1,
    Configuration = 2,
    String = 3,
    Interface = 4,
    Endpoint = 5,
    DeviceQualifier = 6,
    OtherSpeed = 7,
    InterfacePower = 8,
    Otg = 9,
}

/// The 8 bytes sent in the SETUP stage of a control transfer.
///
/// cf §9.3 of USB 2.0
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupPacket {
    pub request_type: RequestType,
    pub request: u8,
    pub value_low: u8,
    pub value_high: u8,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    pub const SIZE: usize = 8;

    pub fn new(request_type: RequestType, request: RequestCode, value_low: u8, value_high: u8, index: u16, length: u16) -> Self {
        Self {
            request_type,
            request: request as u8,
            value_low,
            value_high,
            index,
            length,
        }
    }

    pub fn get_descriptor(desc_type: DescriptorType, desc_index: u8, length: u16) -> Self {
        Self::new(RequestType::standard_get(), RequestCode::GetDescriptor, desc_index, desc_type as u8, 0, length)
    }

    pub fn set_address(address: u8) -> Self {
        Self::new(RequestType::standard_set(), RequestCode::SetAddress, address, 0, 0, 0)
    }

    pub fn get_configuration() -> Self {
        Self::new(RequestType::standard_get(), RequestCode::GetConfiguration, 0, 0, 0, 1)
    }

    pub fn set_configuration(config_value: u8) -> Self {
        Self::new(RequestType::standard_set(), RequestCode::SetConfiguration, config_value, 0, 0, 0)
    }

    /// Wire layout, 16-bit fields little-endian.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let index = self.index.to_le_bytes();
        let length = self.length.to_le_bytes();
        [
            self.request_type.0,
            self.request,
            self.value_low,
            self.value_high,
            index[0],
            index[1],
            length[0],
            length[1],
        ]
    }

    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            request_type: RequestType(bytes[0]),
            request: bytes[1],
            value_low: bytes[2],
            value_high: bytes[3],
            index: u16::from_le_bytes([bytes[4], bytes[5]]),
            length: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn setup_layout_is_little_endian() {
        let setup = SetupPacket {
            request_type: RequestType(0xC1),
            request: 0x01,
            value_low: 0x34,
            value_high: 0x12,
            index: 0xBEEF,
            length: 0x0102,
        };
        let bytes = setup.to_bytes();
        assert_eq!(bytes, [0xC1, 0x01, 0x34, 0x12, 0xEF, 0xBE, 0x02, 0x01]);
        assert_eq!(SetupPacket::from_bytes(&bytes), setup);
    }

    #[test]
    fn setup_round_trips_16_bit_fields() {
        let values = [0x0000, 0x0001, 0x0100, 0x00FF, 0xFF00, 0x1234, 0xBEEF, 0xFFFF];
        for index in values {
            for length in values {
                let setup = SetupPacket {
                    request_type: RequestType(0x21),
                    request: 0x09,
                    value_low: (length >> 8) as u8,
                    value_high: index as u8,
                    index,
                    length,
                };
                let bytes = setup.to_bytes();
                assert_eq!(bytes[4..6], index.to_le_bytes());
                assert_eq!(bytes[6..8], length.to_le_bytes());
                assert_eq!(SetupPacket::from_bytes(&bytes), setup, "index {:#06x} length {:#06x}", index, length);
            }
        }
    }

    #[test]
    fn get_device_descriptor_matches_standard_request() {
        let bytes = SetupPacket::get_descriptor(DescriptorType::Device, 0, 18).to_bytes();
        assert_eq!(bytes, [0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x12, 0x00]);
    }

    #[test]
    fn set_address_carries_address_in_value_low() {
        let setup = SetupPacket::set_address(1);
        assert_eq!(setup.to_bytes(), [0x00, 0x05, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(setup.request_type.direction(), RequestDirection::HostToDevice);
        assert_eq!(RequestCode::try_from(setup.request).ok(), Some(RequestCode::SetAddress));
    }
}
