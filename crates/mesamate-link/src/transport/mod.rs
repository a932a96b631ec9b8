//! Transport layer for I/O abstraction

use crate::error::{LinkError, Result};
use crate::protocol::Command;

mod mock;
mod serial;
pub use mock::MockTransport;
pub use serial::{DEFAULT_BAUD_RATE, SerialTransport};

/// Byte-oriented command channel to the device.
pub trait Transport: Send {
    /// Read available data into buffer, returns number of bytes read.
    /// Returns `Ok(0)` when nothing arrived within the transport's timeout.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write data from buffer, returns number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Flush any pending writes (blocking until complete)
    fn flush(&mut self) -> Result<()>;

    /// Open an independent handle on the same channel, so that one thread
    /// can read while another writes.
    fn try_clone(&self) -> Result<Box<dyn Transport>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        (**self).read(buffer)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn try_clone(&self) -> Result<Box<dyn Transport>> {
        (**self).try_clone()
    }
}

/// Write one command line and flush it.
pub fn send_command<T: Transport + ?Sized>(transport: &mut T, command: &Command) -> Result<()> {
    let bytes = command.encode();
    let written = transport.write(&bytes)?;
    if written != bytes.len() {
        return Err(LinkError::ShortWrite {
            written,
            expected: bytes.len(),
        });
    }
    transport.flush()?;
    log::debug!("sent `{command}`");
    Ok(())
}
