//! Byte-level link to the chip.
//!
//! The chip is a trust boundary: a byte clocked back from the wire is taken at face value, a
//! broken link simply reads as garbage.

use embedded_hal::blocking::spi::Transfer;
use embedded_hal::digital::v2::OutputPin;

/// Narrow full-duplex byte interface with a slave-select line.
pub trait Transport {
    fn select(&mut self);

    fn deselect(&mut self);

    /// Clock one byte out and return the byte clocked in.
    fn exchange(&mut self, byte: u8) -> u8;
}

/// Slave selected for as long as the guard lives.
pub(crate) struct Selected<'a, T: Transport> {
    link: &'a mut T,
}

impl<'a, T: Transport> Selected<'a, T> {
    pub(crate) fn new(link: &'a mut T) -> Self {
        link.select();
        Self { link }
    }

    pub(crate) fn exchange(&mut self, byte: u8) -> u8 {
        self.link.exchange(byte)
    }
}

impl<T: Transport> Drop for Selected<'_, T> {
    fn drop(&mut self) {
        self.link.deselect()
    }
}

/// `Transport` over an embedded-hal SPI bus and a dedicated chip-select pin (active low).
pub struct SpiTransport<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS> SpiTransport<SPI, CS>
where
    SPI: Transfer<u8>,
    CS: OutputPin,
{
    pub fn new(spi: SPI, mut cs: CS) -> Self {
        if cs.set_high().is_err() {
            warn!("MAX3421 SPI: could not deselect chip");
        }
        Self { spi, cs }
    }

    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }
}

impl<SPI, CS> Transport for SpiTransport<SPI, CS>
where
    SPI: Transfer<u8>,
    CS: OutputPin,
{
    fn select(&mut self) {
        if self.cs.set_low().is_err() {
            warn!("MAX3421 SPI: chip select failed");
        }
    }

    fn deselect(&mut self) {
        if self.cs.set_high().is_err() {
            warn!("MAX3421 SPI: chip deselect failed");
        }
    }

    fn exchange(&mut self, byte: u8) -> u8 {
        let mut word = [byte];
        match self.spi.transfer(&mut word) {
            Ok(read) => read[0],
            Err(_) => {
                warn!("MAX3421 SPI: transfer failed");
                0
            }
        }
    }
}
