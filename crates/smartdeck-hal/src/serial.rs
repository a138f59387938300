//! [`SerialTransport`] – a [`Transport`] over a host serial port.

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use smartdeck_types::DeckError;
use tracing::info;

use crate::transport::Transport;

/// Reads are gated on `bytes_to_read`, so the port timeout only bounds the
/// rare case where the driver reports bytes it cannot deliver yet.
const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// A serial port to the SmartPort board.
pub struct SerialTransport {
    name: String,
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open `path` at `baud_rate`, 8N1.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::TransportOpen`] when the device cannot be opened.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, DeckError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| DeckError::TransportOpen {
                port: path.to_string(),
                details: e.to_string(),
            })?;

        info!(port = path, baud_rate, "serial port opened");
        Ok(Self {
            name: path.to_string(),
            port,
        })
    }
}

impl Transport for SerialTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        let waiting = self.port.bytes_to_read()?;
        Ok(waiting as usize)
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_missing_device_is_transport_open_error() {
        let result = SerialTransport::open("/dev/smartdeck-does-not-exist", 1_000_000);
        match result {
            Err(DeckError::TransportOpen { port, .. }) => {
                assert_eq!(port, "/dev/smartdeck-does-not-exist");
            }
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("opening a missing device must fail"),
        }
    }
}
