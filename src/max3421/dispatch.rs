use embedded_hal::blocking::delay::DelayMs;

use super::regs::*;
use super::Max3421;
use crate::config::StallPolicy;
use crate::transport::Transport;
use crate::{HostResult, UsbError};

impl<T, D> Max3421<T, D>
where
    T: Transport,
    D: DelayMs<u32>,
{
    /// Launch `token` at `endpoint` of the current peripheral address until the device answers.
    /// NAKs are retried up to `nak_limit` times, TIMEOUT (and STALL, if so configured) up to the
    /// configured retry limit. Any other outcome is final.
    pub(crate) fn dispatch(&mut self, token: Token, endpoint: u8, nak_limit: u16) -> Result<(), UsbError> {
        let mut naks: u32 = 0;
        let mut retries: u32 = 0;

        loop {
            trace!("USB Dispatch [{:?}] EP{}", token, endpoint);
            self.write_single(HXFR, token.launch(endpoint));
            self.wait_transfer_done()?;

            let result = HostResult::from_nibble(self.read_single(HRSL));
            match result {
                HostResult::Success => return Ok(()),
                HostResult::Nak => {
                    self.stats.naks += 1;
                    naks += 1;
                    if naks > nak_limit as u32 {
                        return Err(UsbError::Host(result));
                    }
                }
                HostResult::Stall if self.config.stall_policy == StallPolicy::Fail => {
                    return Err(UsbError::Host(result));
                }
                HostResult::Timeout | HostResult::Stall => {
                    self.stats.retries += 1;
                    retries += 1;
                    if retries > self.config.retry_limit as u32 {
                        warn!("USB Dispatch [{:?}] EP{} gave up after {} retries", token, endpoint, retries - 1);
                        return Err(UsbError::Host(result));
                    }
                }
                _ => return Err(UsbError::Host(result)),
            }
        }
    }

    /// Completion flag is left untouched on timeout.
    fn wait_transfer_done(&mut self) -> Result<(), UsbError> {
        for _ in 0..self.config.completion_poll_limit {
            if self.read_single(HIRQ) & HXFRDNIRQ != 0 {
                self.write_single(HIRQ, HXFRDNIRQ);
                return Ok(());
            }
        }
        Err(UsbError::NoResponse)
    }
}
