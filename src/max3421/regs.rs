//! MAX3421E register map, host mode only.
//! Refer to the MAX3421E Programming Guide (AN3785).

pub const RCVFIFO: u8 = 1;
pub const SNDFIFO: u8 = 2;
pub const SUDFIFO: u8 = 4;
pub const RCVBC: u8 = 6;
pub const SNDBC: u8 = 7;
pub const USBIRQ: u8 = 13;
pub const USBIEN: u8 = 14;
pub const USBCTL: u8 = 15;
pub const CPUCTL: u8 = 16;
pub const PINCTL: u8 = 17;
pub const IOPINS1: u8 = 20;
pub const IOPINS2: u8 = 21;
pub const HIRQ: u8 = 25;
pub const HIEN: u8 = 26;
pub const MODE: u8 = 27;
pub const PERADDR: u8 = 28;
pub const HCTL: u8 = 29;
pub const HXFR: u8 = 30;
pub const HRSL: u8 = 31;

const WRITE: u8 = 0x02;

/// First byte of every SPI frame.
pub fn command(reg: u8, write: bool) -> u8 {
    if write { reg << 3 | WRITE } else { reg << 3 }
}

// USBIRQ
pub const OSCOKIRQ: u8 = 1 << 0;

// USBCTL
pub const CHIPRES: u8 = 1 << 5;
pub const PWRDOWN: u8 = 1 << 4;

// PINCTL
pub const FDUPSPI: u8 = 1 << 4;

// HIRQ
pub const HXFRDNIRQ: u8 = 1 << 7;
pub const FRAMEIRQ: u8 = 1 << 6;
pub const CONDETIRQ: u8 = 1 << 5;
pub const SUSDNIRQ: u8 = 1 << 4;
pub const SNDBAVIRQ: u8 = 1 << 3;
pub const RCVDAVIRQ: u8 = 1 << 2;
pub const RWUIRQ: u8 = 1 << 1;
pub const BUSEVENTIRQ: u8 = 1 << 0;

// HCTL
pub const SNDTOG1: u8 = 1 << 7;
pub const SNDTOG0: u8 = 1 << 6;
pub const RCVTOG1: u8 = 1 << 5;
pub const RCVTOG0: u8 = 1 << 4;
pub const SIGRSM: u8 = 1 << 3;
pub const SAMPLEBUS: u8 = 1 << 2;
pub const FRMRST: u8 = 1 << 1;
pub const BUSRST: u8 = 1 << 0;

// MODE
pub const DPPULLDN: u8 = 1 << 7;
pub const DMPULLDN: u8 = 1 << 6;
pub const DELAYISO: u8 = 1 << 5;
pub const SEPIRQ: u8 = 1 << 4;
pub const SOFKAENAB: u8 = 1 << 3;
pub const HUBPRE: u8 = 1 << 2;
pub const LOWSPEED: u8 = 1 << 1;
pub const HOST: u8 = 1 << 0;

pub const MODE_HOST_PULLDOWNS: u8 = DPPULLDN | DMPULLDN | HOST;
pub const MODE_FS_HOST: u8 = MODE_HOST_PULLDOWNS | SOFKAENAB;
pub const MODE_LS_HOST: u8 = MODE_FS_HOST | LOWSPEED;

/// HXFR token, OR'ed with the endpoint number on launch.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Token {
    Setup = 0x10,
    In = 0x00,
    Out = 0x20,
    /// Status stage IN handshake
    HsIn = 0x80,
    /// Status stage OUT handshake
    HsOut = 0xA0,
}

impl Token {
    pub fn launch(self, endpoint: u8) -> u8 {
        self as u8 | (endpoint & 0x0F)
    }
}

bitfield! {
    /// Host result register
    pub struct Hrsl(u8); impl Debug;
    pub jstatus, _: 7;
    pub kstatus, _: 6;
    pub sndtogrd, _: 5;
    pub rcvtogrd, _: 4;
    pub hrslt, _: 3, 0;
}

bitfield! {
    pub struct Mode(u8); impl Debug;
    pub dppulldn, set_dppulldn: 7;
    pub dmpulldn, set_dmpulldn: 6;
    pub sofkaenab, set_sofkaenab: 3;
    pub hubpre, set_hubpre: 2;
    pub lowspeed, set_lowspeed: 1;
    pub host, set_host: 0;
}
