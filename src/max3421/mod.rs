//! MAX3421E chip driver.
//!
//! Every register access is a complete SPI frame: slave select, command byte, payload, deselect.
//! On top of that sit the bus link detector (`link`), the packet dispatcher (`dispatch`), the
//! control and bulk transfer engines (`transfer`) and the enumeration state machine (`enumerate`).

pub mod regs;

mod dispatch;
mod enumerate;
mod link;
mod transfer;

pub use enumerate::UsbState;
pub use link::LinkState;

use embedded_hal::blocking::delay::DelayMs;

use crate::transport::{Selected, Transport};
use crate::usb::{DeviceRecord, DeviceTable};
use crate::{HostConfig, UsbError};

use regs::*;

/// Protocol events counted by the dispatcher and the bulk engine.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferStats {
    pub naks: u32,
    /// TIMEOUT and retried STALL relaunches
    pub retries: u32,
    pub toggle_resyncs: u32,
}

pub struct Max3421<T, D> {
    link: T,
    delay: D,
    config: HostConfig,
    usb_state: UsbState,
    link_state: LinkState,
    low_speed: bool,
    devices: DeviceTable,
    stats: TransferStats,
}

impl<T, D> Max3421<T, D>
where
    T: Transport,
    D: DelayMs<u32>,
{
    pub fn new(link: T, delay: D, config: HostConfig) -> Self {
        Self {
            link,
            delay,
            config,
            usb_state: UsbState::Disconnected,
            link_state: LinkState::Disconnected,
            low_speed: false,
            devices: DeviceTable::new(),
            stats: TransferStats::default(),
        }
    }

    /// Bring the chip from power-up to host mode with D+/D- pulled down.
    pub fn init(&mut self) -> Result<(), UsbError> {
        self.write_single(PINCTL, FDUPSPI);

        if let Err(err) = self.reset_chip() {
            error!("MAX3421 oscillator did not start");
            return Err(err);
        }
        self.delay.delay_ms(self.config.power_on_delay.to_millis());

        self.write_single(MODE, MODE_HOST_PULLDOWNS);
        self.devices.reset();
        self.usb_state = UsbState::Disconnected;
        self.link_state = LinkState::Disconnected;
        debug!("MAX3421 initialized");
        Ok(())
    }

    fn reset_chip(&mut self) -> Result<(), UsbError> {
        self.write_single(USBCTL, CHIPRES);
        // also clears PWRDOWN
        self.write_single(USBCTL, 0);

        for _ in 0..self.config.oscillator_poll_limit {
            if self.read_single(USBIRQ) & OSCOKIRQ != 0 {
                return Ok(());
            }
            self.delay.delay_ms(1);
        }
        Err(UsbError::NoResponse)
    }

    pub fn write_single(&mut self, reg: u8, value: u8) {
        let mut spi = Selected::new(&mut self.link);
        spi.exchange(command(reg, true));
        spi.exchange(value);
    }

    pub fn write_multiple(&mut self, reg: u8, bytes: &[u8]) {
        let mut spi = Selected::new(&mut self.link);
        spi.exchange(command(reg, true));
        for byte in bytes {
            spi.exchange(*byte);
        }
    }

    pub fn read_single(&mut self, reg: u8) -> u8 {
        let mut spi = Selected::new(&mut self.link);
        spi.exchange(command(reg, false));
        spi.exchange(0)
    }

    pub fn read_multiple(&mut self, reg: u8, buf: &mut [u8]) {
        let mut spi = Selected::new(&mut self.link);
        spi.exchange(command(reg, false));
        for byte in buf.iter_mut() {
            *byte = spi.exchange(0);
        }
    }

    fn hrsl(&mut self) -> Hrsl {
        Hrsl(self.read_single(HRSL))
    }

    /// Target `address` with the next transfers, with low speed signalling if the link requires it.
    pub fn set_peripheral_address(&mut self, address: u8) {
        self.write_single(PERADDR, address);
        let mut mode = Mode(self.read_single(MODE));
        mode.set_lowspeed(self.low_speed);
        mode.set_hubpre(self.low_speed);
        self.write_single(MODE, mode.0);
    }

    /// The addressed device, once enumeration fetched its descriptor.
    pub fn active_record(&self) -> Option<&DeviceRecord> {
        self.devices.active()
    }

    pub fn log_device_info(&self) {
        if let Some((vid, pid)) = self.active_record().and_then(|rec| rec.vid_pid()) {
            info!("USB Device VID: {} PID: {}", vid, pid);
        }
    }

    pub fn state(&self) -> UsbState {
        self.usb_state
    }

    pub fn link_state(&self) -> LinkState {
        self.link_state
    }

    /// Host coordinator hands over to the device driver.
    pub fn set_running(&mut self) {
        self.set_state(UsbState::Running);
    }

    fn set_state(&mut self, state: UsbState) {
        if self.usb_state != state {
            debug!("USB State [{:?}] -> [{:?}]", self.usb_state, state);
            self.usb_state = state;
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn stats(&self) -> TransferStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = TransferStats::default();
    }

    pub fn transport(&self) -> &T {
        &self.link
    }

    pub fn release(self) -> (T, D) {
        (self.link, self.delay)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::{self, Line};

    #[test]
    fn init_resets_chip_and_enters_host_mode() {
        let (mut chip, handle) = sim::chip(HostConfig::default());
        chip.init().unwrap();

        let state = handle.borrow();
        assert_eq!(state.reg(PINCTL), FDUPSPI);
        assert_eq!(state.reg(MODE), DPPULLDN | DMPULLDN | HOST);
        assert!(state.chip_resets >= 1);
        assert_eq!(state.elapsed_ms, 1000);
        assert_eq!(chip.state(), UsbState::Disconnected);
    }

    #[test]
    fn dead_oscillator_is_no_response() {
        let (mut chip, handle) = sim::chip(HostConfig::default());
        handle.borrow_mut().oscillator_dead = true;
        assert_eq!(chip.init(), Err(UsbError::NoResponse));
        // one millisecond per poll, no power-on wait
        assert_eq!(handle.borrow().elapsed_ms, 255);
    }

    #[test]
    fn peripheral_address_sets_low_speed_bits() {
        let (mut chip, handle) = sim::chip(HostConfig::default());
        chip.init().unwrap();
        handle.borrow_mut().line = Line::K;
        assert_eq!(chip.probe_bus(), Ok(LinkState::LowSpeed));

        chip.set_peripheral_address(5);
        let state = handle.borrow();
        assert_eq!(state.peraddr_writes, [5]);
        assert_eq!(state.reg(MODE) & (LOWSPEED | HUBPRE), LOWSPEED | HUBPRE);
    }

    #[test]
    fn register_frames_are_bracketed() {
        let (mut chip, handle) = sim::chip(HostConfig::default());
        chip.write_multiple(SNDFIFO, &[1, 2, 3]);
        chip.write_single(SNDBC, 3);
        let mut buf = [0; 2];
        chip.read_multiple(RCVFIFO, &mut buf);

        let state = handle.borrow();
        assert_eq!(state.frames, 3);
        assert!(!state.selected);
        assert_eq!(state.reg(SNDBC), 3);
    }
}
