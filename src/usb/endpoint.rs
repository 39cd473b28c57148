/// Data toggle sequence bit, cf §8.6 of USB 2.0
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Toggle {
    #[default]
    Data0,
    Data1,
}

impl Toggle {
    pub fn flip(self) -> Self {
        match self {
            Toggle::Data0 => Toggle::Data1,
            Toggle::Data1 => Toggle::Data0,
        }
    }
}

impl From<bool> for Toggle {
    fn from(bit: bool) -> Self {
        if bit { Toggle::Data1 } else { Toggle::Data0 }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Out,
    In,
}

/// USB endpoint parameters and state
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Endpoint {
    /// Endpoint number, without direction bit
    pub address: u8,

    pub direction: Direction,

    /// The maximum packet size for this endpoint
    pub max_packet_size: u16,

    /// Milliseconds to wait between packets of one IN transfer, 0 for none
    pub interval: u8,

    pub send_toggle: Toggle,
    pub receive_toggle: Toggle,

    pub nak_power: u8,
}

impl Endpoint {
    pub fn new(address: u8, direction: Direction, max_packet_size: u16, interval: u8) -> Self {
        Self {
            address,
            direction,
            max_packet_size,
            interval,
            send_toggle: Toggle::Data0,
            receive_toggle: Toggle::Data0,
            nak_power: 0,
        }
    }

    /// Endpoint zero before the device told us its packet size.
    pub fn default_pipe() -> Self {
        Self::new(0, Direction::In, 8, 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn toggle_flips_and_maps_from_register_bit() {
        assert_eq!(Toggle::Data0.flip(), Toggle::Data1);
        assert_eq!(Toggle::Data1.flip(), Toggle::Data0);
        assert_eq!(Toggle::from(true), Toggle::Data1);
        assert_eq!(Toggle::from(false), Toggle::Data0);
    }
}
