use embedded_hal::blocking::delay::DelayMs;

use super::regs::*;
use super::Max3421;
use crate::transport::Transport;
use crate::usb::{Endpoint, RequestDirection, SetupPacket, Toggle, UsbBus};
use crate::{HostResult, UsbError};

/// SNDFIFO holds a single 64 byte packet
pub const MAX_OUT_PACKET: usize = 64;

impl<T, D> Max3421<T, D>
where
    T: Transport,
    D: DelayMs<u32>,
{
    /// SETUP, optional IN data stage, handshake.
    /// Returns the number of bytes received during the data stage.
    pub fn control_transfer(&mut self, address: u8, endpoint: u8, setup: SetupPacket, data: Option<&mut [u8]>) -> Result<usize, UsbError> {
        let direction = setup.request_type.direction();
        let data = data.filter(|buf| !buf.is_empty());
        if direction == RequestDirection::HostToDevice && data.is_some() {
            warn!("USB Control OUT data stage not supported");
            return Err(UsbError::Unsupported);
        }

        self.set_peripheral_address(address);
        self.write_multiple(SUDFIFO, &setup.to_bytes());
        if let Err(err) = self.dispatch(Token::Setup, endpoint, self.config.nak_limit) {
            error!("USB Control SETUP failed [{:?}]", err);
            return Err(err);
        }

        let mut pipe = self.control_pipe(address);
        pipe.address = endpoint;

        let mut len = 0;
        if let Some(buf) = data {
            // data stage starts on the toggle opposite to the SETUP packet
            pipe.receive_toggle = if self.hrsl().sndtogrd() { Toggle::Data0 } else { Toggle::Data1 };
            let wanted = buf.len().min(setup.length as usize);
            let (interval, nak_limit) = (self.config.control_interval, self.config.nak_limit);
            let result = self.bulk_in(&mut pipe, &mut buf[..wanted], interval, nak_limit);
            self.store_control_pipe(address, pipe);
            len = match result {
                Ok(len) => len,
                Err(err) => {
                    error!("USB Control data stage failed [{:?}]", err);
                    return Err(err);
                }
            };
        }

        let handshake = match direction {
            RequestDirection::DeviceToHost => Token::HsOut,
            RequestDirection::HostToDevice => Token::HsIn,
        };
        self.dispatch(handshake, endpoint, self.config.nak_limit)?;
        Ok(len)
    }

    /// Send one packet of at most 64 bytes.
    pub fn bulk_out(&mut self, ep: &mut Endpoint, data: &[u8], nak_limit: u16) -> Result<(), UsbError> {
        if data.len() > MAX_OUT_PACKET {
            return Err(UsbError::Data);
        }

        self.program_send_toggle(ep.send_toggle);
        self.wait_send_buffer()?;
        self.write_multiple(SNDFIFO, data);
        self.write_single(SNDBC, data.len() as u8);

        let mut resynced = false;
        loop {
            match self.dispatch(Token::Out, ep.address, nak_limit) {
                Ok(()) => {
                    ep.send_toggle = Toggle::from(self.hrsl().sndtogrd());
                    return Ok(());
                }
                Err(UsbError::Host(HostResult::Toggle)) if !resynced => {
                    resynced = true;
                    self.stats.toggle_resyncs += 1;
                    ep.send_toggle = Toggle::from(self.hrsl().sndtogrd()).flip();
                    self.program_send_toggle(ep.send_toggle);
                    // the failed packet is still in SNDFIFO
                    self.write_single(SNDBC, data.len() as u8);
                }
                Err(err) => {
                    warn!("USB OUT EP{} failed [{:?}]", ep.address, err);
                    return Err(UsbError::Data);
                }
            }
        }
    }

    /// Read packets into `buf` until a short packet arrives or `buf` is full.
    /// Bytes beyond `buf` are dropped, the returned length never exceeds `buf.len()`.
    ///
    /// Toggle errors are resynchronized and retried without limit.
    pub fn bulk_in(&mut self, ep: &mut Endpoint, buf: &mut [u8], interval: u8, nak_limit: u16) -> Result<usize, UsbError> {
        let requested = buf.len();
        let mut total = 0;

        self.program_receive_toggle(ep.receive_toggle);
        loop {
            match self.dispatch(Token::In, ep.address, nak_limit) {
                Ok(()) => {}
                Err(UsbError::Host(HostResult::Toggle)) => {
                    self.stats.toggle_resyncs += 1;
                    ep.receive_toggle = Toggle::from(self.hrsl().rcvtogrd()).flip();
                    self.program_receive_toggle(ep.receive_toggle);
                    continue;
                }
                Err(err) => return Err(err),
            }

            if self.read_single(HIRQ) & RCVDAVIRQ == 0 {
                return Err(UsbError::Receive);
            }

            let received = self.read_single(RCVBC) as usize;
            let room = requested - total.min(requested);
            let take = received.min(room);
            if take > 0 {
                self.read_multiple(RCVFIFO, &mut buf[total..total + take]);
            }
            if received > room {
                warn!("USB IN EP{} dropped {} bytes", ep.address, received - room);
            }
            // frees the receive buffer
            self.write_single(HIRQ, RCVDAVIRQ);
            total += received;

            if received < ep.max_packet_size as usize || total >= requested {
                ep.receive_toggle = Toggle::from(self.hrsl().rcvtogrd());
                return Ok(total.min(requested));
            }
            if interval > 0 {
                self.delay.delay_ms(interval as u32);
            }
        }
    }

    fn program_send_toggle(&mut self, toggle: Toggle) {
        let bits = match toggle {
            Toggle::Data0 => SNDTOG0,
            Toggle::Data1 => SNDTOG1,
        };
        self.write_single(HCTL, bits);
    }

    fn program_receive_toggle(&mut self, toggle: Toggle) {
        let bits = match toggle {
            Toggle::Data0 => RCVTOG0,
            Toggle::Data1 => RCVTOG1,
        };
        self.write_single(HCTL, bits);
    }

    fn wait_send_buffer(&mut self) -> Result<(), UsbError> {
        for _ in 0..self.config.send_buffer_poll_limit {
            if self.read_single(HIRQ) & SNDBAVIRQ != 0 {
                return Ok(());
            }
        }
        Err(UsbError::BufferFull)
    }

    /// Control endpoint state of the device at `address`, the default pipe if not addressed yet.
    fn control_pipe(&self, address: u8) -> Endpoint {
        match self.devices.device() {
            Some(rec) if u8::from(rec.address) == address => rec.endpoint,
            _ => self.devices.template().endpoint,
        }
    }

    fn store_control_pipe(&mut self, address: u8, mut pipe: Endpoint) {
        match self.devices.device_mut() {
            Some(rec) if u8::from(rec.address) == address => {
                pipe.address = rec.endpoint.address;
                rec.endpoint = pipe;
            }
            _ => {
                let template = &mut self.devices.template_mut().endpoint;
                pipe.address = template.address;
                *template = pipe;
            }
        }
    }
}

impl<T, D> UsbBus for Max3421<T, D>
where
    T: Transport,
    D: DelayMs<u32>,
{
    fn control_request(&mut self, address: u8, endpoint: u8, setup: SetupPacket, data: Option<&mut [u8]>) -> Result<usize, UsbError> {
        self.control_transfer(address, endpoint, setup, data)
    }

    fn in_transfer(&mut self, ep: &mut Endpoint, buf: &mut [u8], nak_limit: u16) -> Result<usize, UsbError> {
        let interval = ep.interval;
        self.bulk_in(ep, buf, interval, nak_limit)
    }

    fn out_transfer(&mut self, ep: &mut Endpoint, data: &[u8], nak_limit: u16) -> Result<(), UsbError> {
        self.bulk_out(ep, data, nak_limit)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms)
    }
}
