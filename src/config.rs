//! Tunable limits and delays of the host stack.
//!
//! All hardware waits are bounded by iteration counts rather than wall-clock deadlines so that
//! a scripted chip gives the same outcome on every run.

use fugit::MillisDurationU32;

/// How the dispatcher treats a STALL handshake.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StallPolicy {
    /// Count STALL against the same retry budget as bus TIMEOUT.
    Retry,
    /// Report STALL to the caller on first sight.
    Fail,
}

#[derive(Copy, Clone, Debug)]
pub struct HostConfig {
    /// NAKs tolerated per token during control transfers.
    pub nak_limit: u16,

    /// TIMEOUT (and STALL, under `StallPolicy::Retry`) relaunches per token.
    pub retry_limit: u16,

    pub stall_policy: StallPolicy,

    /// HIRQ reads waiting for HXFRDNIRQ after each token launch.
    pub completion_poll_limit: u32,

    /// HCTL reads waiting for the bus sample to complete.
    pub sample_poll_limit: u32,

    /// HIRQ reads waiting for the send FIFO to free up.
    pub send_buffer_poll_limit: u32,

    /// Milliseconds waited for the oscillator after a chip reset.
    pub oscillator_poll_limit: u32,

    /// Wait after chip reset before switching to host mode.
    pub power_on_delay: MillisDurationU32,

    /// Wait after attach before resetting the peripheral.
    pub settle_delay: MillisDurationU32,

    /// Wait after the first frame marker before talking to the device.
    pub sof_settle_delay: MillisDurationU32,

    /// SET_ADDRESS recovery interval, cf §9.2.6.3 of USB 2.0
    pub address_settle_delay: MillisDurationU32,

    /// Polling interval of the control pipe data stage.
    pub control_interval: u8,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            nak_limit: 100,
            retry_limit: 100,
            stall_policy: StallPolicy::Retry,
            completion_poll_limit: 1000,
            sample_poll_limit: 1000,
            send_buffer_poll_limit: 1000,
            oscillator_poll_limit: 255,
            power_on_delay: MillisDurationU32::millis(1000),
            settle_delay: MillisDurationU32::millis(200),
            sof_settle_delay: MillisDurationU32::millis(20),
            address_settle_delay: MillisDurationU32::millis(2),
            control_interval: 1,
        }
    }
}
