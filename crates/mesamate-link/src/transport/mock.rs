//! Mock transport for testing

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use super::Transport;
use crate::error::Result;

/// In-memory transport. Clones share the same buffers, so a test can keep
/// one handle to inspect traffic while the controller and listener own
/// others.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    read_buffer: VecDeque<u8>,
    write_buffer: Vec<u8>,
    fail_writes: bool,
    /// Writes still allowed before `fail_writes` switches on.
    writes_left: Option<usize>,
    fail_reads: bool,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        MockTransport {
            inner: Arc::new(Mutex::new(MockTransportInner::default())),
        }
    }

    /// Inject data to be read
    pub fn inject_read(&self, data: &[u8]) {
        self.inner.lock().read_buffer.extend(data);
    }

    /// Inject one device line; a trailing newline is appended.
    pub fn inject_line(&self, line: &str) {
        let mut inner = self.inner.lock();
        inner.read_buffer.extend(line.as_bytes());
        inner.read_buffer.push_back(b'\n');
    }

    /// Get all written data
    pub fn written(&self) -> Vec<u8> {
        self.inner.lock().write_buffer.clone()
    }

    /// Written data split into lines, without terminators.
    pub fn written_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.inner.lock().write_buffer)
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Clear written data
    pub fn clear_written(&self) {
        self.inner.lock().write_buffer.clear();
    }

    /// Make subsequent writes fail with a broken-pipe error.
    pub fn set_fail_writes(&self, fail: bool) {
        let mut inner = self.inner.lock();
        inner.fail_writes = fail;
        inner.writes_left = None;
    }

    /// Accept `count` more writes, then fail every later one.
    pub fn fail_writes_after(&self, count: usize) {
        let mut inner = self.inner.lock();
        inner.fail_writes = false;
        inner.writes_left = Some(count);
    }

    /// Make subsequent reads fail with a broken-pipe error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.lock().fail_reads = fail;
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        if inner.fail_reads {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock read failure").into());
        }
        let available = inner.read_buffer.len().min(buffer.len());
        for (slot, byte) in buffer.iter_mut().zip(inner.read_buffer.drain(..available)) {
            *slot = byte;
        }
        Ok(available)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        if let Some(left) = inner.writes_left {
            if left == 0 {
                inner.fail_writes = true;
            } else {
                inner.writes_left = Some(left - 1);
            }
        }
        if inner.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure").into());
        }
        inner.write_buffer.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn try_clone(&self) -> Result<Box<dyn Transport>> {
        Ok(Box::new(self.clone()))
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}
