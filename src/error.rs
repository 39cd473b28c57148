use num_enum::TryFromPrimitive;

/// Transaction outcome reported by the chip in the low nibble of HRSL.
#[derive(Copy, Clone, Debug, Eq, PartialEq, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum HostResult {
    Success = 0x00,
    Busy = 0x01,
    BadRequest = 0x02,
    Undefined = 0x03,
    Nak = 0x04,
    Stall = 0x05,
    Toggle = 0x06,
    WrongPid = 0x07,
    BadByteCount = 0x08,
    PidError = 0x09,
    PacketError = 0x0A,
    CrcError = 0x0B,
    /// Bit error, K state
    KError = 0x0C,
    /// Bit error, J state
    JError = 0x0D,
    Timeout = 0x0E,
    Babble = 0x0F,
}

impl HostResult {
    /// Decode the result nibble of an HRSL value, ignoring the status bits above it.
    pub fn from_nibble(hrsl: u8) -> Self {
        // every 4-bit value has a variant
        HostResult::try_from(hrsl & 0x0F).unwrap_or(HostResult::Undefined)
    }
}

/// Errors that can be generated when driving the host controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbError {
    /// Hardware result that survived the dispatcher's retry policy.
    Host(HostResult),

    /// The chip never raised its completion flag within the poll limit.
    NoResponse,

    /// A packet was acknowledged but the receive buffer flag was not set.
    Receive,

    /// OUT payload rejected (too long, or the transfer failed).
    Data,

    /// The send FIFO never became available.
    BufferFull,

    /// Requested transfer shape is not implemented (control OUT data stage).
    Unsupported,

    /// Descriptor was shorter than its fixed layout.
    Descriptor,
}

pub const RECEIVE_ERROR: u8 = 0xF0;
pub const DATA_ERROR: u8 = 0xF1;
pub const BUFFER_FULL: u8 = 0xF2;
pub const UNSUPPORTED: u8 = 0xF3;
pub const BAD_DESCRIPTOR: u8 = 0xF4;
pub const NO_RESPONSE: u8 = 0xFF;

impl UsbError {
    /// Numeric result code, hardware codes in 0x00..=0x0F and software codes above.
    pub fn code(&self) -> u8 {
        match self {
            UsbError::Host(result) => *result as u8,
            UsbError::NoResponse => NO_RESPONSE,
            UsbError::Receive => RECEIVE_ERROR,
            UsbError::Data => DATA_ERROR,
            UsbError::BufferFull => BUFFER_FULL,
            UsbError::Unsupported => UNSUPPORTED,
            UsbError::Descriptor => BAD_DESCRIPTOR,
        }
    }

    /// NAK means the device had nothing to say, callers usually try again later.
    pub fn is_nak(&self) -> bool {
        matches!(self, UsbError::Host(HostResult::Nak))
    }
}

impl From<HostResult> for UsbError {
    fn from(v: HostResult) -> Self {
        Self::Host(v)
    }
}
