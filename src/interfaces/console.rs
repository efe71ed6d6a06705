use std::io::Write;
use std::sync::Mutex;

use crate::domain::ports::Redirector;
use crate::error::{PaymentError, Result};

/// Hands hosted payment pages to a terminal user by printing the link.
///
/// The CLI writes results to stdout, so links go to stderr by default.
pub struct ConsoleRedirector<W: Write + Send> {
    out: Mutex<W>,
}

impl ConsoleRedirector<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write + Send> ConsoleRedirector<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> Redirector for ConsoleRedirector<W> {
    fn open(&self, url: &str) -> Result<()> {
        tracing::info!(%url, "Opening payment page");
        let mut out = self
            .out
            .lock()
            .map_err(|_| PaymentError::Io(std::io::Error::other("console writer poisoned")))?;
        writeln!(out, "Complete your payment at: {url}")?;
        out.flush()?;
        Ok(())
    }
}
