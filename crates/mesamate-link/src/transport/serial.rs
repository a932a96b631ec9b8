//! Serial transport implementation

use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use super::Transport;
use crate::error::{LinkError, Result};

/// Baud rate of the motion controller board.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Serial transport for the USB/UART link to the motion controller
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open a serial port
    ///
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/ttyACM0")
    /// * `baud_rate` - Baud rate (e.g., 9600)
    /// * `read_timeout` - How long a read blocks before reporting no data
    pub fn open(path: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(read_timeout)
            .open()?;

        log::info!("Opened serial port: {} at {} baud", path, baud_rate);
        Ok(SerialTransport { port })
    }

    /// Try each candidate path in order and return the first port that
    /// opens, after waiting `settle` for the board to finish resetting.
    pub fn open_first(
        candidates: &[String],
        baud_rate: u32,
        read_timeout: Duration,
        settle: Duration,
    ) -> Result<(String, Self)> {
        for path in candidates {
            log::info!("Attempting to connect to {path}...");
            match Self::open(path, baud_rate, read_timeout) {
                Ok(transport) => {
                    // Opening the port resets the board.
                    thread::sleep(settle);
                    return Ok((path.clone(), transport));
                }
                Err(e) => log::warn!("Failed to connect to {path}: {e}"),
            }
        }
        Err(LinkError::NoPort(candidates.to_vec()))
    }

    /// Name of the underlying port, if the driver reports one.
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.port.write_all(data)?;
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        self.port.flush()?;
        Ok(())
    }

    fn try_clone(&self) -> Result<Box<dyn Transport>> {
        let port = self.port.try_clone()?;
        Ok(Box::new(SerialTransport { port }))
    }
}
