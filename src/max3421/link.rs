use embedded_hal::blocking::delay::DelayMs;

use super::regs::*;
use super::Max3421;
use crate::transport::Transport;
use crate::UsbError;

/// Data line state, as sampled by the chip.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// J and K both reported, should not happen
    Undefined,
    /// SE0, nothing attached
    Disconnected,
    LowSpeed,
    FullSpeed,
}

impl<T, D> Max3421<T, D>
where
    T: Transport,
    D: DelayMs<u32>,
{
    /// Sample D+/D-, classify the attached device and switch MODE to match.
    pub fn probe_bus(&mut self) -> Result<LinkState, UsbError> {
        self.write_single(HCTL, SAMPLEBUS);
        self.wait_bus_sample()?;

        let hrsl = self.hrsl();
        // J and K swap meaning with the current LOWSPEED setting
        let low_speed_mode = Mode(self.read_single(MODE)).lowspeed();

        let link = match (hrsl.jstatus(), hrsl.kstatus()) {
            (true, false) if low_speed_mode => LinkState::LowSpeed,
            (true, false) => LinkState::FullSpeed,
            (false, true) if low_speed_mode => LinkState::FullSpeed,
            (false, true) => LinkState::LowSpeed,
            (true, true) => LinkState::Undefined,
            (false, false) => LinkState::Disconnected,
        };

        match link {
            LinkState::LowSpeed => {
                self.write_single(MODE, MODE_LS_HOST);
                self.low_speed = true;
            }
            LinkState::FullSpeed => {
                self.write_single(MODE, MODE_FS_HOST);
                self.low_speed = false;
            }
            LinkState::Disconnected => self.write_single(MODE, MODE_HOST_PULLDOWNS),
            LinkState::Undefined => error!("USB Undefined bus state"),
        }

        if self.link_state != link {
            debug!("USB Link [{:?}] -> [{:?}]", self.link_state, link);
            self.link_state = link;
        }
        Ok(link)
    }

    fn wait_bus_sample(&mut self) -> Result<(), UsbError> {
        for _ in 0..self.config.sample_poll_limit {
            if self.read_single(HCTL) & SAMPLEBUS != 0 {
                return Ok(());
            }
        }
        warn!("USB Bus sample never completed");
        Err(UsbError::NoResponse)
    }
}
