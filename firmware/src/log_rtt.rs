use log::{LevelFilter, Metadata, Record};

/// Forwards `log` records to the RTT up channel.
pub struct RttLogger {
    level: LevelFilter,
}

impl log::Log for RttLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            rtt_target::rprintln!("{} - {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: RttLogger = RttLogger { level: LevelFilter::Debug };

pub fn init() {
    rtt_target::rtt_init_print!(NoBlockSkip, 1024);
    log::set_max_level(LOGGER.level);
    // single core, called once before anything logs
    if unsafe { log::set_logger_racy(&LOGGER) }.is_err() {
        rtt_target::rprintln!("logger already installed");
    }
}
