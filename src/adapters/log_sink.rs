//! Link log backend.
//!
//! Forwards the firmware's `log` records to the host as LOG packets, so a
//! target without a second debug UART still gets its diagnostics out.
//! Records are formatted into a bounded line buffer, wrapped as a LOG
//! packet and best-effort sent; everything logged before the handshake
//! completes is discarded. The link's own modules are filtered out,
//! otherwise every transmitted line would log its own transmission.

use core::fmt::Write as _;
use std::sync::Arc;

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::link::channel::LinkChannel;
use crate::link::transport::Transport;

/// Longest forwarded line, truncation beyond.
const MAX_LINE: usize = 512;

/// `log::Log` backend that ships records over the link.
pub struct LinkLogSink<T: Transport + Send + 'static> {
    channel: Arc<LinkChannel<T>>,
    max_level: LevelFilter,
}

impl<T: Transport + Send + 'static> LinkLogSink<T> {
    pub fn new(channel: Arc<LinkChannel<T>>, max_level: LevelFilter) -> Self {
        Self { channel, max_level }
    }

    /// Install this sink as the process-wide logger.
    pub fn install(
        channel: Arc<LinkChannel<T>>,
        max_level: LevelFilter,
    ) -> Result<(), log::SetLoggerError> {
        log::set_boxed_logger(Box::new(Self::new(channel, max_level)))?;
        log::set_max_level(max_level);
        Ok(())
    }

    fn format_line(record: &Record) -> heapless::String<MAX_LINE> {
        let mut line: heapless::String<MAX_LINE> = heapless::String::new();
        // Overflow just truncates the line; a cut-off log beats no log.
        let _ = write!(
            line,
            "[{}] {}: {}\n",
            level_tag(record.level()),
            record.target(),
            record.args()
        );
        line
    }
}

impl<T: Transport + Send + 'static> Log for LinkLogSink<T> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // Never feed the link's own diagnostics back into the link.
        if record.target().starts_with("uartlink") {
            return;
        }
        // Discard lines until the channel can carry them.
        if !self.channel.is_available() {
            return;
        }

        let line = Self::format_line(record);
        let Ok(mut buf) = self.channel.alloc_buf(line.len()) else {
            return;
        };
        if buf.extend_from_slice(line.as_bytes()).is_err() {
            return;
        }
        let _ = self.channel.send_log(buf);
    }

    fn flush(&self) {}
}

/// Severity squeezed to one character for host-side rendering.
pub fn level_tag(level: Level) -> char {
    match level {
        Level::Error => 'E',
        Level::Warn => 'W',
        Level::Info => 'I',
        Level::Debug => 'D',
        Level::Trace => 'T',
    }
}
