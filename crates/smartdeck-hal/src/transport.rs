//! Generic `Transport` trait for raw byte links to a control board.
//!
//! A transport only moves bytes.  Framing, resynchronisation and sharing
//! between vehicles live in [`protocol`][crate::protocol] and
//! [`connection`][crate::connection].

use std::io;

/// A raw, buffered byte stream to a control board.
///
/// Implementations are owned by exactly one
/// [`Link`][crate::connection::Link], which serialises all access.
pub trait Transport {
    /// Identifier used in logs and errors, e.g. the serial device path.
    fn name(&self) -> &str;

    /// Number of received bytes waiting in the input buffer.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read up to `buf.len()` already-buffered bytes; returns the count read.
    ///
    /// Must not block waiting for more data than is buffered.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write the whole of `data` and flush it to the device.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;
}
