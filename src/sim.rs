//! Register-level MAX3421E stand-in for tests.
//!
//! Decodes SPI frames the way the chip does and answers each HXFR launch from a script of
//! replies, or else from a minimal device model that handles the standard requests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::blocking::delay::DelayMs;

use crate::max3421::regs::*;
use crate::max3421::Max3421;
use crate::transport::Transport;
use crate::usb::SetupPacket;
use crate::{HostConfig, HostResult};

pub type Handle = Rc<RefCell<ChipState>>;

pub fn chip(config: HostConfig) -> (Max3421<SimChip, SimDelay>, Handle) {
    let handle = Rc::new(RefCell::new(ChipState::new()));
    let chip = Max3421::new(SimChip { state: handle.clone() }, SimDelay { state: handle.clone() }, config);
    (chip, handle)
}

/// Outcome of one HXFR launch.
#[derive(Clone, Debug)]
pub enum Reply {
    Result(HostResult),
    /// Successful IN carrying this packet
    Data(Vec<u8>),
    /// Completion flag never raised
    Silent,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Line {
    #[default]
    Se0,
    J,
    K,
    Both,
}

const TOKEN_SETUP: u8 = 0x10;
const TOKEN_IN: u8 = 0x00;
const TOKEN_OUT: u8 = 0x20;

/// Answers standard requests on endpoint 0 and serves queued reports on the others.
#[derive(Clone, Debug)]
pub struct Device {
    pub descriptor: [u8; 18],
    pub config_descriptor: [u8; 9],
    pub address: u8,
    pub configuration: u8,
    pub reports: VecDeque<Vec<u8>>,
    control_data: VecDeque<u8>,
}

impl Device {
    pub fn xbox_pad() -> Self {
        Self {
            descriptor: [
                0x12, 0x01, 0x00, 0x02, 0xFF, 0xFF, 0xFF, 0x08, 0x5E, 0x04, 0x8E, 0x02, 0x14, 0x01, 0x01, 0x02, 0x03, 0x01,
            ],
            config_descriptor: [0x09, 0x02, 0x99, 0x00, 0x04, 0x01, 0x00, 0xA0, 0xFA],
            address: 0,
            configuration: 0,
            reports: VecDeque::new(),
            control_data: VecDeque::new(),
        }
    }

    fn setup(&mut self, setup: SetupPacket) {
        let len = setup.length as usize;
        let response: &[u8] = match (setup.request_type.0, setup.request) {
            (0x80, 6) if setup.value_high == 1 => &self.descriptor,
            (0x80, 6) if setup.value_high == 2 => &self.config_descriptor,
            (0x80, 8) => core::slice::from_ref(&self.configuration),
            (0x00, 5) => {
                self.address = setup.value_low;
                &[]
            }
            (0x00, 9) => {
                self.configuration = setup.value_low;
                &[]
            }
            _ => &[],
        };
        self.control_data = response[..response.len().min(len)].iter().copied().collect();
    }

    fn control_packet(&mut self) -> Vec<u8> {
        let mps = self.descriptor[7] as usize;
        let take = self.control_data.len().min(mps);
        self.control_data.drain(..take).collect()
    }
}

pub struct ChipState {
    regs: [u8; 32],
    pub line: Line,
    pub script: VecDeque<Reply>,
    /// Reply to every launch once the script runs dry
    pub fallback: Option<HostResult>,
    pub device: Option<Device>,

    pub launches: Vec<u8>,
    pub setups: Vec<SetupPacket>,
    pub sent: Vec<Vec<u8>>,
    pub peraddr_writes: Vec<u8>,
    pub elapsed_ms: u32,
    pub chip_resets: u32,
    pub bus_resets: u32,
    pub hirq_polls: u32,
    pub frames: u32,
    pub selected: bool,

    pub oscillator_dead: bool,
    pub sample_stuck: bool,
    pub send_buffer_busy: bool,
    pub suppress_rcvdav: bool,
    /// HCTL reads that still see BUSRST after a bus reset
    pub reset_ticks: u32,
    /// HIRQ reads before the first frame marker once SOFKAENAB is written
    pub sof_delay_ticks: u32,
    /// SOFKAENAB writes seen while a bus reset was still running
    pub sof_during_reset: u32,

    command: Option<u8>,
    rcvfifo: VecDeque<u8>,
    sndfifo: Vec<u8>,
    sudfifo: Vec<u8>,
    snd_toggle: bool,
    rcv_toggle: bool,
    result: u8,
    reset_pending: u32,
    frame_countdown: Option<u32>,
}

impl ChipState {
    fn new() -> Self {
        let mut regs = [0; 32];
        regs[HIRQ as usize] = SNDBAVIRQ;
        Self {
            regs,
            line: Line::Se0,
            script: VecDeque::new(),
            fallback: None,
            device: None,
            launches: Vec::new(),
            setups: Vec::new(),
            sent: Vec::new(),
            peraddr_writes: Vec::new(),
            elapsed_ms: 0,
            chip_resets: 0,
            bus_resets: 0,
            hirq_polls: 0,
            frames: 0,
            selected: false,
            oscillator_dead: false,
            sample_stuck: false,
            send_buffer_busy: false,
            suppress_rcvdav: false,
            reset_ticks: 0,
            sof_delay_ticks: 0,
            sof_during_reset: 0,
            command: None,
            rcvfifo: VecDeque::new(),
            sndfifo: Vec::new(),
            sudfifo: Vec::new(),
            snd_toggle: false,
            rcv_toggle: false,
            result: 0,
            reset_pending: 0,
            frame_countdown: None,
        }
    }

    pub fn reg(&self, reg: u8) -> u8 {
        self.regs[reg as usize]
    }

    pub fn attach(&mut self, line: Line, device: Device) {
        self.line = line;
        self.device = Some(device);
    }

    fn read(&mut self, reg: u8) -> u8 {
        match reg {
            RCVFIFO => self.rcvfifo.pop_front().unwrap_or(0),
            HIRQ => {
                self.hirq_polls += 1;
                self.frame_countdown = match self.frame_countdown {
                    Some(0) => {
                        self.regs[HIRQ as usize] |= FRAMEIRQ;
                        None
                    }
                    Some(n) => Some(n - 1),
                    None => None,
                };
                let hirq = self.regs[HIRQ as usize];
                if self.send_buffer_busy { hirq & !SNDBAVIRQ } else { hirq }
            }
            HCTL if self.reset_pending > 0 => {
                self.reset_pending -= 1;
                self.regs[HCTL as usize] | BUSRST
            }
            HRSL => {
                let (j, k) = match self.line {
                    Line::Se0 => (false, false),
                    Line::J => (true, false),
                    Line::K => (false, true),
                    Line::Both => (true, true),
                };
                (j as u8) << 7 | (k as u8) << 6 | (self.snd_toggle as u8) << 5 | (self.rcv_toggle as u8) << 4 | self.result
            }
            _ => self.regs[reg as usize],
        }
    }

    fn write(&mut self, reg: u8, value: u8) {
        match reg {
            SNDFIFO => self.sndfifo.push(value),
            SUDFIFO => self.sudfifo.push(value),
            HIRQ => self.regs[HIRQ as usize] &= !value,
            HCTL => {
                if value & BUSRST != 0 {
                    self.bus_resets += 1;
                    self.reset_pending = self.reset_ticks;
                }
                if value & SAMPLEBUS != 0 && !self.sample_stuck {
                    self.regs[HCTL as usize] |= SAMPLEBUS;
                }
                if value & SNDTOG0 != 0 {
                    self.snd_toggle = false;
                }
                if value & SNDTOG1 != 0 {
                    self.snd_toggle = true;
                }
                if value & RCVTOG0 != 0 {
                    self.rcv_toggle = false;
                }
                if value & RCVTOG1 != 0 {
                    self.rcv_toggle = true;
                }
            }
            MODE => {
                self.regs[MODE as usize] = value;
                if value & SOFKAENAB != 0 {
                    if self.reset_pending > 0 {
                        self.sof_during_reset += 1;
                    }
                    if self.sof_delay_ticks == 0 {
                        self.regs[HIRQ as usize] |= FRAMEIRQ;
                    } else {
                        self.regs[HIRQ as usize] &= !FRAMEIRQ;
                        self.frame_countdown = Some(self.sof_delay_ticks);
                    }
                }
            }
            USBCTL => {
                self.regs[USBCTL as usize] = value;
                if value & CHIPRES != 0 {
                    self.chip_resets += 1;
                    self.regs[USBIRQ as usize] = 0;
                } else if !self.oscillator_dead {
                    self.regs[USBIRQ as usize] |= OSCOKIRQ;
                }
            }
            PERADDR => {
                self.peraddr_writes.push(value);
                self.regs[PERADDR as usize] = value;
            }
            HXFR => {
                self.regs[HXFR as usize] = value;
                self.launch(value);
            }
            _ => self.regs[reg as usize] = value,
        }
    }

    fn launch(&mut self, hxfr: u8) {
        self.launches.push(hxfr);
        let (token, ep) = (hxfr & 0xF0, hxfr & 0x0F);

        if token == TOKEN_SETUP && self.sudfifo.len() >= SetupPacket::SIZE {
            let mut bytes = [0; SetupPacket::SIZE];
            bytes.copy_from_slice(&self.sudfifo[..SetupPacket::SIZE]);
            self.setups.push(SetupPacket::from_bytes(&bytes));
        }

        let reply = match self.script.pop_front() {
            Some(reply) => reply,
            None => match self.fallback {
                Some(result) => Reply::Result(result),
                None => self.device_reply(token, ep),
            },
        };

        match reply {
            Reply::Silent => return,
            Reply::Result(result) => {
                self.result = result as u8;
                if result == HostResult::Success {
                    self.complete(token, Vec::new());
                }
            }
            Reply::Data(packet) => {
                self.result = HostResult::Success as u8;
                self.complete(token, packet);
            }
        }
        self.regs[HIRQ as usize] |= HXFRDNIRQ;
    }

    fn device_reply(&mut self, token: u8, ep: u8) -> Reply {
        let setup = self.setups.last().copied();
        let device = match self.device.as_mut() {
            Some(device) => device,
            None if token == TOKEN_IN => return Reply::Result(HostResult::Nak),
            None => return Reply::Result(HostResult::Success),
        };
        match token {
            TOKEN_SETUP => {
                if let Some(setup) = setup {
                    device.setup(setup);
                }
                Reply::Result(HostResult::Success)
            }
            TOKEN_IN if ep == 0 => Reply::Data(device.control_packet()),
            TOKEN_IN => match device.reports.pop_front() {
                Some(report) => Reply::Data(report),
                None => Reply::Result(HostResult::Nak),
            },
            _ => Reply::Result(HostResult::Success),
        }
    }

    fn complete(&mut self, token: u8, packet: Vec<u8>) {
        match token {
            TOKEN_IN => {
                self.regs[RCVBC as usize] = packet.len() as u8;
                self.rcvfifo = packet.into();
                if !self.suppress_rcvdav {
                    self.regs[HIRQ as usize] |= RCVDAVIRQ;
                }
                self.rcv_toggle = !self.rcv_toggle;
            }
            TOKEN_OUT => {
                let len = (self.regs[SNDBC as usize] as usize).min(self.sndfifo.len());
                self.sent.push(self.sndfifo[..len].to_vec());
                self.snd_toggle = !self.snd_toggle;
            }
            _ => {}
        }
    }
}

pub struct SimChip {
    state: Handle,
}

impl Transport for SimChip {
    fn select(&mut self) {
        let mut state = self.state.borrow_mut();
        state.selected = true;
        state.command = None;
    }

    fn deselect(&mut self) {
        let mut state = self.state.borrow_mut();
        state.selected = false;
        state.command = None;
        state.frames += 1;
    }

    fn exchange(&mut self, byte: u8) -> u8 {
        let mut state = self.state.borrow_mut();
        assert!(state.selected, "exchange outside of a frame");
        let command = state.command;
        match command {
            None => {
                state.command = Some(byte);
                let (reg, write) = (byte >> 3, byte & 0x02 != 0);
                if write && reg == SNDFIFO {
                    state.sndfifo.clear();
                }
                if write && reg == SUDFIFO {
                    state.sudfifo.clear();
                }
                // status byte clocked out with the command
                state.regs[HIRQ as usize]
            }
            Some(command) if command & 0x02 != 0 => {
                state.write(command >> 3, byte);
                0
            }
            Some(command) => state.read(command >> 3),
        }
    }
}

pub struct SimDelay {
    state: Handle,
}

impl DelayMs<u32> for SimDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.state.borrow_mut().elapsed_ms += ms;
    }
}
