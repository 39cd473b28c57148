use embedded_hal::blocking::delay::DelayMs;

use super::regs::*;
use super::{LinkState, Max3421};
use crate::transport::Transport;
use crate::usb::{Address, UsbBus};
use crate::UsbError;

/// Enumeration progress of the attached device.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbState {
    Disconnected,
    Illegal,
    /// Enumeration failed, waiting for the device to go away
    Error,
    DeviceFound,
    Initialize,
    Settle,
    PeripheralReset,
    WaitReset,
    WaitSof,
    GetDescriptor,
    Addressing,
    /// Addressed, ready for the host to pick a configuration
    Configuring,
    Running,
}

impl<T, D> Max3421<T, D>
where
    T: Transport,
    D: DelayMs<u32>,
{
    /// Advance enumeration by one step.
    pub fn tick(&mut self) -> UsbState {
        // fold in what the last bus probe saw
        match self.link_state {
            LinkState::Undefined => self.set_state(UsbState::Illegal),
            LinkState::Disconnected => {
                if self.usb_state != UsbState::Disconnected {
                    self.devices.reset();
                }
                self.set_state(UsbState::Disconnected)
            }
            LinkState::LowSpeed | LinkState::FullSpeed => {
                if matches!(self.usb_state, UsbState::Disconnected | UsbState::Illegal) {
                    self.set_state(UsbState::Settle)
                }
            }
        }

        let next = match self.usb_state {
            UsbState::Disconnected | UsbState::Illegal | UsbState::Error => {
                if self.probe_bus().is_err() {
                    self.link_state = LinkState::Undefined;
                }
                self.usb_state
            }
            UsbState::Settle => {
                self.delay.delay_ms(self.config.settle_delay.to_millis());
                UsbState::DeviceFound
            }
            UsbState::DeviceFound => UsbState::Initialize,
            UsbState::Initialize => {
                self.devices.reset();
                UsbState::PeripheralReset
            }
            UsbState::PeripheralReset => {
                self.write_single(HCTL, BUSRST);
                UsbState::WaitReset
            }
            UsbState::WaitReset => {
                if self.read_single(HCTL) & BUSRST == 0 {
                    let mode = self.read_single(MODE);
                    // SOF packets, or keep-alive pulses on low speed links
                    self.write_single(MODE, mode | SOFKAENAB);
                    UsbState::WaitSof
                } else {
                    UsbState::WaitReset
                }
            }
            UsbState::WaitSof => {
                if self.read_single(HIRQ) & FRAMEIRQ != 0 {
                    self.delay.delay_ms(self.config.sof_settle_delay.to_millis());
                    UsbState::GetDescriptor
                } else {
                    UsbState::WaitSof
                }
            }
            UsbState::GetDescriptor => match self.fetch_descriptor() {
                Ok(()) => UsbState::Addressing,
                Err(err) => {
                    error!("USB Device descriptor fetch failed [{:?}]", err);
                    UsbState::Error
                }
            },
            UsbState::Addressing => match self.assign_address() {
                Ok(()) => {
                    self.log_device_info();
                    UsbState::Configuring
                }
                Err(err) => {
                    error!("USB Device addressing failed [{:?}]", err);
                    UsbState::Error
                }
            },
            UsbState::Configuring | UsbState::Running => self.usb_state,
        };
        self.set_state(next);
        self.usb_state
    }

    fn fetch_descriptor(&mut self) -> Result<(), UsbError> {
        self.devices.template_mut().endpoint.max_packet_size = 8;
        let desc = self.get_device_descriptor(0)?;

        let template = self.devices.template_mut();
        template.endpoint.max_packet_size = desc.b_max_packet_size as u16;
        template.descriptor = Some(desc);
        Ok(())
    }

    /// Move the device from address 0 to the first free address.
    fn assign_address(&mut self) -> Result<(), UsbError> {
        if self.devices.device().is_some() {
            return Ok(());
        }
        let address: Address = self.devices.next_address().ok_or(UsbError::Unsupported)?;

        if let Err(err) = self.set_device_address(0, address.into()) {
            self.devices.release_address(address);
            return Err(err);
        }
        self.delay.delay_ms(self.config.address_settle_delay.to_millis());
        self.devices.insert_device(address);
        Ok(())
    }
}
