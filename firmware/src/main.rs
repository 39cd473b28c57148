//! Wired Xbox 360 pad on a MAX3421E, wired to SPI1 of an STM32F411 (black pill).
//!
//! PA5/PA6/PA7 SCK/MISO/MOSI, PA4 chip select, PB0 MAX3421 reset.
//! Pressing A rumbles the pad, Start cycles the LED animation.

#![no_std]
#![no_main]

extern crate alloc;

#[macro_use]
extern crate log;

extern crate panic_rtt_target as _;

extern crate stm32f4xx_hal as hal;

mod log_rtt;

use alloc::boxed::Box;

use buddy_alloc::{BuddyAllocParam, FastAllocParam, NonThreadsafeAlloc};
use cortex_m_rt::entry;

use hal::pac;
use hal::prelude::*;
use hal::spi::{Mode, Phase, Polarity};

use max3421_host::drivers::xbox360::{led, primary, secondary, REQUEST_LED};
use max3421_host::drivers::{Xbox360, XboxInput};
use max3421_host::{HostConfig, HostState, Max3421, SpiTransport, UsbHost};

const FAST_HEAP_SIZE: usize = 4 * 1024;
const HEAP_SIZE: usize = 16 * 1024;
const LEAF_SIZE: usize = 16;

pub static mut FAST_HEAP: [u8; FAST_HEAP_SIZE] = [0u8; FAST_HEAP_SIZE];
pub static mut HEAP: [u8; HEAP_SIZE] = [0u8; HEAP_SIZE];

#[global_allocator]
static ALLOC: NonThreadsafeAlloc = unsafe {
    let fast_param = FastAllocParam::new(FAST_HEAP.as_ptr(), FAST_HEAP_SIZE);
    let buddy_param = BuddyAllocParam::new(HEAP.as_ptr(), HEAP_SIZE, LEAF_SIZE);
    NonThreadsafeAlloc::new(fast_param, buddy_param)
};

const LED_CYCLE: [u8; 5] = [led::ONE, led::TWO, led::THREE, led::FOUR, led::ROTATING];

#[entry]
fn main() -> ! {
    log_rtt::init();
    info!("init");

    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.use_hse(25.MHz()).sysclk(96.MHz()).freeze();

    let gpioa = dp.GPIOA.split();
    let gpiob = dp.GPIOB.split();

    // release MAX3421 from reset
    let mut max_reset = gpiob.pb0.into_push_pull_output();
    max_reset.set_high();

    let mode = Mode {
        polarity: Polarity::IdleLow,
        phase: Phase::CaptureOnFirstTransition,
    };
    let spi = dp.SPI1.spi((gpioa.pa5, gpioa.pa6, gpioa.pa7), mode, 8.MHz(), &clocks);
    let cs = gpioa.pa4.into_push_pull_output();
    let delay = cp.SYST.delay(&clocks);

    let chip = Max3421::new(SpiTransport::new(spi, cs), delay, HostConfig::default());
    let mut host = UsbHost::new(chip);
    if let Err(err) = host.init() {
        error!("MAX3421 init failed [{:?}]", err);
    }

    let pad = Xbox360::new();
    let requests = pad.requests();
    host.add_device_config(Box::new(pad));

    let mut led_idx = 0;
    host.add_callback(Box::new(move |payload: &[u8]| {
        let input = match XboxInput::from_payload(payload) {
            Some(input) => input,
            None => return,
        };
        debug!("Xbox buttons {:08b} {:08b}", input.primary, input.secondary);
        if input.pressed(primary::A, 0) {
            requests.rumble(0xFF, 0xFF);
        }
        if input.pressed(0, secondary::START) {
            requests.led(LED_CYCLE[led_idx]);
            led_idx = (led_idx + 1) % LED_CYCLE.len();
        }
    }));

    let mut announced = false;
    loop {
        host.step();
        if host.state() == HostState::Running && !announced {
            announced = true;
            host.output_request(REQUEST_LED, &[led::ONE]);
        }
    }
}
