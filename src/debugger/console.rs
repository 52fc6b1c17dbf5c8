use std::backtrace::Backtrace;
use std::cell::Cell;
use std::io::{self, Write};
use std::sync::{Arc, OnceLock};

use serde_json::json;
use tracing::{trace, Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;

use super::events::CONSOLE_LOG;
use crate::transport::Channel;

thread_local! {
    static FORWARDING: Cell<bool> = const { Cell::new(false) };
}

/// Console output sink that mirrors writes to the remote UI once armed.
///
/// Logging is routed through [`ConsoleWriter`]; nothing patches the process
/// streams. Arming happens at most once per tee.
#[derive(Default)]
pub struct ConsoleTee {
    channel: OnceLock<Arc<dyn Channel>>,
}

impl ConsoleTee {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Starts forwarding to `channel`. Returns false if already armed.
    pub fn arm(&self, channel: Arc<dyn Channel>) -> bool {
        self.channel.set(channel).is_ok()
    }

    pub fn is_armed(&self) -> bool {
        self.channel.get().is_some()
    }

    /// Sends `text` with a captured stack trace. Writes made while a forward
    /// is already in progress on this thread are not forwarded again.
    pub fn forward(&self, text: &str) {
        let Some(channel) = self.channel.get() else {
            return;
        };
        FORWARDING.with(|busy| {
            if busy.replace(true) {
                return;
            }
            let stack = Backtrace::capture().to_string();
            if let Err(e) = channel.emit(CONSOLE_LOG, json!([text, stack])) {
                // Still guarded: this line is not forwarded again.
                trace!("console forward skipped: {}", e);
            }
            busy.set(false);
        });
    }

    pub fn writer(self: &Arc<Self>) -> ConsoleWriter {
        ConsoleWriter {
            tee: Arc::clone(self),
        }
    }

    pub fn stdout(self: &Arc<Self>) -> TeeWriter<StdStream> {
        TeeWriter::new(Arc::clone(self), StdStream::Stdout)
    }

    pub fn stderr(self: &Arc<Self>) -> TeeWriter<StdStream> {
        TeeWriter::new(Arc::clone(self), StdStream::Stderr)
    }
}

pub enum StdStream {
    Stdout,
    Stderr,
}

impl Write for StdStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            StdStream::Stdout => io::stdout().write(buf),
            StdStream::Stderr => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            StdStream::Stdout => io::stdout().flush(),
            StdStream::Stderr => io::stderr().flush(),
        }
    }
}

/// Passes writes through to `inner` unmodified and forwards what was written.
pub struct TeeWriter<W> {
    tee: Arc<ConsoleTee>,
    inner: W,
}

impl<W: Write> TeeWriter<W> {
    pub fn new(tee: Arc<ConsoleTee>, inner: W) -> Self {
        Self { tee, inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for TeeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.tee.forward(&String::from_utf8_lossy(&buf[..written]));
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// `MakeWriter` for the fmt subscriber: WARN and ERROR go to stderr,
/// everything else to stdout.
#[derive(Clone)]
pub struct ConsoleWriter {
    tee: Arc<ConsoleTee>,
}

impl<'a> MakeWriter<'a> for ConsoleWriter {
    type Writer = TeeWriter<StdStream>;

    fn make_writer(&'a self) -> Self::Writer {
        self.tee.stdout()
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        if *meta.level() <= Level::WARN {
            self.tee.stderr()
        } else {
            self.tee.stdout()
        }
    }
}
