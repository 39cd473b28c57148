use alloc::boxed::Box;
use alloc::vec::Vec;

use embedded_hal::blocking::delay::DelayMs;

use crate::max3421::{Max3421, UsbState};
use crate::transport::Transport;
use crate::usb::{DeviceRecord, UsbBus};
use crate::UsbError;

/// Invoked with the driver's event payload whenever the device reports a change.
pub type InputCallback = Box<dyn FnMut(&[u8])>;

/// Driver for one kind of device, selected by vendor and product id.
pub trait DeviceConfig {
    fn vid(&self) -> u16;

    fn pid(&self) -> u16;

    /// Bring the freshly addressed device into a usable configuration.
    fn configure(&mut self, bus: &mut dyn UsbBus, record: &DeviceRecord) -> Result<(), UsbError>;

    /// Called on every host step once configured.
    fn process(&mut self, bus: &mut dyn UsbBus);

    fn add_callback(&mut self, callback: InputCallback);

    /// Queue a driver-specific output, carried out by the next `process`.
    fn output_request(&self, request_type: u8, params: &[u8]);
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostState {
    Disconnected,
    DeviceFound,
    ConfigFound,
    DeviceConfigured,
    Running,
}

/// Enumerates the attached device, matches it against registered configs and runs the match.
pub struct UsbHost<T, D> {
    chip: Max3421<T, D>,
    configs: Vec<Box<dyn DeviceConfig>>,
    active: Option<usize>,
    record: Option<DeviceRecord>,
    pending_callbacks: Vec<InputCallback>,
    state: HostState,
}

impl<T, D> UsbHost<T, D>
where
    T: Transport,
    D: DelayMs<u32>,
{
    pub fn new(chip: Max3421<T, D>) -> Self {
        Self {
            chip,
            configs: Vec::new(),
            active: None,
            record: None,
            pending_callbacks: Vec::new(),
            state: HostState::Disconnected,
        }
    }

    pub fn init(&mut self) -> Result<(), UsbError> {
        self.chip.init()
    }

    /// Configs are matched in registration order.
    pub fn add_device_config(&mut self, config: Box<dyn DeviceConfig>) {
        self.configs.push(config);
    }

    /// Attach `callback` to whichever config becomes active.
    pub fn add_callback(&mut self, callback: InputCallback) {
        match self.active {
            Some(idx) if self.state == HostState::Running => self.configs[idx].add_callback(callback),
            _ => self.pending_callbacks.push(callback),
        }
    }

    /// Dropped silently when no config is active.
    pub fn output_request(&self, request_type: u8, params: &[u8]) {
        if let Some(idx) = self.active {
            self.configs[idx].output_request(request_type, params);
        }
    }

    /// Advance the host by one step.
    ///
    /// Once running, a disconnect goes unnoticed: the active config keeps being processed.
    pub fn step(&mut self) {
        let prev = self.state;

        self.state = match self.state {
            HostState::Disconnected => match self.chip.tick() {
                UsbState::Configuring => HostState::DeviceFound,
                _ => HostState::Disconnected,
            },

            HostState::DeviceFound => match self.find_config() {
                Some((idx, record)) => {
                    info!("USB Device config #{} matches VID: {} PID: {}", idx, self.configs[idx].vid(), self.configs[idx].pid());
                    self.active = Some(idx);
                    self.record = Some(record);
                    HostState::ConfigFound
                }
                None => HostState::DeviceFound,
            },

            HostState::ConfigFound => match (self.active, self.record) {
                (Some(idx), Some(record)) => match self.configs[idx].configure(&mut self.chip, &record) {
                    Ok(()) => HostState::DeviceConfigured,
                    Err(err) => {
                        warn!("USB Device configuration failed [{:?}]", err);
                        HostState::ConfigFound
                    }
                },
                _ => HostState::DeviceFound,
            },

            HostState::DeviceConfigured => {
                self.chip.set_running();
                if let Some(idx) = self.active {
                    for callback in self.pending_callbacks.drain(..) {
                        self.configs[idx].add_callback(callback);
                    }
                }
                self.process();
                HostState::Running
            }

            HostState::Running => {
                self.process();
                HostState::Running
            }
        };

        if prev != self.state {
            debug!("USB Host [{:?}] -> [{:?}]", prev, self.state);
        }
    }

    fn process(&mut self) {
        if let Some(idx) = self.active {
            self.configs[idx].process(&mut self.chip);
        }
    }

    /// First registered config matching the addressed device.
    fn find_config(&self) -> Option<(usize, DeviceRecord)> {
        let record = *self.chip.active_record()?;
        let desc = record.descriptor?;
        if desc.b_num_configurations == 0 {
            return None;
        }
        self.configs
            .iter()
            .position(|cfg| cfg.vid() == desc.id_vendor && cfg.pid() == desc.id_product)
            .map(|idx| (idx, record))
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    pub fn chip(&self) -> &Max3421<T, D> {
        &self.chip
    }

    pub fn chip_mut(&mut self) -> &mut Max3421<T, D> {
        &mut self.chip
    }
}
