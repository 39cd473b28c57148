//! Wired Xbox 360 pad.
//!
//! Endpoint layout is fixed for this device and not read from its descriptors.
//! Callbacks receive `[primary, secondary]` button bytes, see `XboxInput`.

use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::Mutex;

use crate::host::{DeviceConfig, InputCallback};
use crate::usb::{DeviceRecord, Direction, Endpoint, UsbBus};
use crate::UsbError;

pub const VID: u16 = 1118;
pub const PID: u16 = 654;

pub const SECONDARY_KEYS_OFFSET: usize = 2;
pub const PRIMARY_KEYS_OFFSET: usize = 3;

/// Bits of the primary button byte
pub mod primary {
    pub const LB: u8 = 1;
    pub const RB: u8 = 2;
    pub const CENTER: u8 = 4;
    pub const A: u8 = 16;
    pub const B: u8 = 32;
    pub const X: u8 = 64;
    pub const Y: u8 = 128;
}

/// Bits of the secondary button byte
pub mod secondary {
    pub const UP: u8 = 1;
    pub const DOWN: u8 = 2;
    pub const LEFT: u8 = 4;
    pub const RIGHT: u8 = 8;
    pub const START: u8 = 16;
    pub const BACK: u8 = 32;
    pub const ANALOG_DOWN_LEFT: u8 = 64;
    pub const ANALOG_DOWN_RIGHT: u8 = 128;
}

pub mod led {
    pub const ONE: u8 = 0x06;
    pub const TWO: u8 = 0x07;
    pub const THREE: u8 = 0x08;
    pub const FOUR: u8 = 0x09;
    pub const ROTATING: u8 = 0x0A;
}

pub const REQUEST_INVALID: u8 = 0;
/// Params: left motor speed, right motor speed
pub const REQUEST_RUMBLE: u8 = 1;
/// Params: LED animation
pub const REQUEST_LED: u8 = 2;

const RUMBLE_TYPE: u8 = 0x00;
const LED_TYPE: u8 = 0x01;

const REPORT_LEN: usize = 64;
const RUMBLE_MS: u32 = 200;
const CONFIGURED_SETTLE_MS: u32 = 100;
// the pad queues a few stale reports across configuration
const FLUSH_REPORTS: usize = 3;

/// Button state carried by an input report.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct XboxInput {
    pub primary: u8,
    pub secondary: u8,
}

impl XboxInput {
    fn from_report(report: &[u8]) -> Option<Self> {
        Some(XboxInput {
            primary: *report.get(PRIMARY_KEYS_OFFSET)?,
            secondary: *report.get(SECONDARY_KEYS_OFFSET)?,
        })
    }

    /// Decode a callback payload.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        match payload {
            [primary, secondary, ..] => Some(XboxInput { primary: *primary, secondary: *secondary }),
            _ => None,
        }
    }

    pub fn to_payload(&self) -> [u8; 2] {
        [self.primary, self.secondary]
    }

    pub fn pressed(&self, primary_mask: u8, secondary_mask: u8) -> bool {
        self.primary & primary_mask != 0 || self.secondary & secondary_mask != 0
    }
}

/// Pending output slots, shareable with other tasks.
/// A newer request replaces one that was not carried out yet.
#[derive(Clone, Default)]
pub struct XboxRequests {
    rumble: Arc<Mutex<Option<(u8, u8)>>>,
    led: Arc<Mutex<Option<u8>>>,
}

impl XboxRequests {
    pub fn rumble(&self, left: u8, right: u8) {
        *self.rumble.lock() = Some((left, right));
    }

    pub fn led(&self, animation: u8) {
        *self.led.lock() = Some(animation);
    }

    fn take_rumble(&self) -> Option<(u8, u8)> {
        self.rumble.lock().take()
    }

    fn take_led(&self) -> Option<u8> {
        self.led.lock().take()
    }
}

pub struct Xbox360 {
    address: u8,
    input: Endpoint,
    output: Endpoint,
    last_input: XboxInput,
    callbacks: Vec<InputCallback>,
    requests: XboxRequests,
}

impl Default for Xbox360 {
    fn default() -> Self {
        Self::new()
    }
}

impl Xbox360 {
    pub fn new() -> Self {
        Self {
            address: 0,
            input: Self::input_endpoint(),
            output: Self::output_endpoint(),
            last_input: XboxInput::default(),
            callbacks: Vec::new(),
            requests: XboxRequests::default(),
        }
    }

    fn input_endpoint() -> Endpoint {
        Endpoint::new(1, Direction::In, 32, 4)
    }

    fn output_endpoint() -> Endpoint {
        Endpoint::new(1, Direction::Out, 32, 8)
    }

    /// Handle for queuing rumble and LED requests from elsewhere.
    pub fn requests(&self) -> XboxRequests {
        self.requests.clone()
    }

    fn poll_inputs(&mut self, bus: &mut dyn UsbBus) {
        let mut report = [0; REPORT_LEN];
        match bus.in_transfer(&mut self.input, &mut report, 1) {
            Ok(len) => {
                let input = match XboxInput::from_report(&report[..len]) {
                    Some(input) => input,
                    None => return,
                };
                // analog sticks and triggers are not reported
                if input == self.last_input {
                    return;
                }
                self.last_input = input;
                let payload = input.to_payload();
                for callback in self.callbacks.iter_mut() {
                    callback(&payload);
                }
            }
            Err(err) if err.is_nak() => {}
            Err(err) => warn!("Xbox input poll failed [{:?}]", err),
        }
    }

    fn rumble(&mut self, bus: &mut dyn UsbBus, left: u8, right: u8) -> Result<(), UsbError> {
        bus.out_transfer(&mut self.output, &[RUMBLE_TYPE, 0x08, 0x00, left, right, 0x00, 0x00, 0x00], 0)?;
        bus.delay_ms(RUMBLE_MS);
        bus.out_transfer(&mut self.output, &[RUMBLE_TYPE, 0x08, 0x00, 0, 0, 0x00, 0x00, 0x00], 0)
    }

    fn set_led(&mut self, bus: &mut dyn UsbBus, animation: u8) -> Result<(), UsbError> {
        bus.out_transfer(&mut self.output, &[LED_TYPE, 0x03, animation], 0)
    }

    fn flush_input(&mut self, bus: &mut dyn UsbBus) {
        for _ in 0..FLUSH_REPORTS {
            let mut report = [0; REPORT_LEN];
            let _ = bus.in_transfer(&mut self.input, &mut report, 1);
        }
    }
}

impl DeviceConfig for Xbox360 {
    fn vid(&self) -> u16 {
        VID
    }

    fn pid(&self) -> u16 {
        PID
    }

    fn configure(&mut self, bus: &mut dyn UsbBus, record: &DeviceRecord) -> Result<(), UsbError> {
        self.address = record.address.into();
        self.input = Self::input_endpoint();
        self.output = Self::output_endpoint();

        if let Ok(value) = bus.get_configuration(self.address) {
            if value != 0 {
                debug!("Xbox already in configuration {}", value);
                return Ok(());
            }
        }

        let conf = bus.get_configuration_descriptor(self.address, 0)?;
        debug!("Xbox enabling configuration {}", conf.b_configuration_value);
        bus.set_configuration(self.address, conf.b_configuration_value)?;
        bus.delay_ms(CONFIGURED_SETTLE_MS);

        self.flush_input(bus);
        info!("Xbox 360 pad configured");
        Ok(())
    }

    fn process(&mut self, bus: &mut dyn UsbBus) {
        self.poll_inputs(bus);

        if let Some((left, right)) = self.requests.take_rumble() {
            if let Err(err) = self.rumble(bus, left, right) {
                warn!("Xbox rumble failed [{:?}]", err);
            }
        }
        if let Some(animation) = self.requests.take_led() {
            if let Err(err) = self.set_led(bus, animation) {
                warn!("Xbox LED failed [{:?}]", err);
            }
        }
    }

    fn add_callback(&mut self, callback: InputCallback) {
        self.callbacks.push(callback);
    }

    fn output_request(&self, request_type: u8, params: &[u8]) {
        match (request_type, params) {
            (REQUEST_RUMBLE, [left, right, ..]) => self.requests.rumble(*left, *right),
            (REQUEST_LED, [animation, ..]) => self.requests.led(*animation),
            _ => debug!("Xbox ignored output request {}", request_type),
        }
    }
}
