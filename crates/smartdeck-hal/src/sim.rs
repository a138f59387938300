//! In-process simulated board for tests and dry runs.
//!
//! [`SimOpener`] hands out [`SimTransport`]s that record every write and
//! serve scripted inbound bytes, so the full deck can run without a serial
//! device.  With [`SimOpener::with_board_echo`] the simulated board answers
//! every state packet with an acknowledgement mirroring it, the way the real
//! firmware reports which players and selections it has applied.
//!
//! # Example
//!
//! ```rust
//! use smartdeck_hal::connection::ConnectionManager;
//! use smartdeck_hal::sim::SimOpener;
//! use smartdeck_hal::vehicle::DeviceKind;
//!
//! let opener = SimOpener::new();
//! let mut manager = ConnectionManager::new(Box::new(opener.clone()));
//! let link = manager.link(DeviceKind::SmartPortArduino).unwrap();
//! link.borrow_mut().send(&[0xFE, 0xFF]).unwrap();
//!
//! let handle = opener.handle(DeviceKind::SmartPortArduino).unwrap();
//! assert_eq!(handle.written(), vec![vec![0xFE, 0xFF]]);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::rc::Rc;

use smartdeck_types::DeckError;

use crate::connection::TransportOpener;
use crate::protocol::{
    ACK_PLAYERS, AckFrame, END_SENTINEL, SLOT_LEN, START_SENTINEL, selection_from_wire,
};
use crate::transport::Transport;
use crate::vehicle::DeviceKind;

// ─────────────────────────────────────────────────────────────────────────────
// Shared state
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct SimState {
    written: Vec<Vec<u8>>,
    inbound: VecDeque<u8>,
    fail_writes: bool,
    board_echo: bool,
}

/// Test-side view of a [`SimTransport`].  Clones share the same state.
#[derive(Clone, Default)]
pub struct SimHandle(Rc<RefCell<SimState>>);

impl SimHandle {
    /// Every packet written so far, oldest first.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.0.borrow().written.clone()
    }

    pub fn last_written(&self) -> Option<Vec<u8>> {
        self.0.borrow().written.last().cloned()
    }

    /// Queue bytes as if the board had sent them.
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.0.borrow_mut().inbound.extend(bytes);
    }

    /// Bytes queued but not yet read.
    pub fn pending_inbound(&self) -> usize {
        self.0.borrow().inbound.len()
    }

    /// Make every subsequent write fail with a broken-pipe error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.0.borrow_mut().fail_writes = fail;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

/// A [`Transport`] backed by in-memory buffers.
pub struct SimTransport {
    name: String,
    state: SimHandle,
}

impl SimTransport {
    pub fn new(name: impl Into<String>) -> (Self, SimHandle) {
        let state = SimHandle::default();
        (
            Self {
                name: name.into(),
                state: state.clone(),
            },
            state,
        )
    }
}

impl Transport for SimTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.state.pending_inbound())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.0.borrow_mut();
        let n = buf.len().min(state.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.state.0.borrow_mut();
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "simulated write fault"));
        }
        state.written.push(data.to_vec());
        if state.board_echo
            && let Some(ack) = echo_ack(data)
        {
            state.inbound.extend(ack.to_bytes());
        }
        Ok(())
    }
}

/// The acknowledgement a healthy board would send after applying `packet`.
///
/// Slots are reported in packet order; positions past the last slot read as
/// empty.  Returns `None` for anything that is not a well-formed packet.
pub fn echo_ack(packet: &[u8]) -> Option<AckFrame> {
    let (&first, rest) = packet.split_first()?;
    let (&last, payload) = rest.split_last()?;
    if first != START_SENTINEL || last != END_SENTINEL || payload.len() % SLOT_LEN != 0 {
        return None;
    }

    let mut ack = AckFrame {
        status: 1,
        player_ids: [0; ACK_PLAYERS],
        selections: [None; ACK_PLAYERS],
    };
    for (position, slot) in payload.chunks_exact(SLOT_LEN).take(ACK_PLAYERS).enumerate() {
        ack.player_ids[position] = slot[0];
        ack.selections[position] = selection_from_wire(slot[1]);
    }
    Some(ack)
}

// ─────────────────────────────────────────────────────────────────────────────
// Opener
// ─────────────────────────────────────────────────────────────────────────────

/// A [`TransportOpener`] producing [`SimTransport`]s.  Clones share the
/// same record of opened transports.
#[derive(Clone, Default)]
pub struct SimOpener {
    handles: Rc<RefCell<HashMap<DeviceKind, SimHandle>>>,
    opens: Rc<Cell<usize>>,
    board_echo: bool,
}

impl SimOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Have every transport opened from now on answer packets like a board.
    pub fn with_board_echo(mut self) -> Self {
        self.board_echo = true;
        self
    }

    /// Handle to the transport opened for `kind`, if any.
    pub fn handle(&self, kind: DeviceKind) -> Option<SimHandle> {
        self.handles.borrow().get(&kind).cloned()
    }

    /// How many transports have been opened in total.
    pub fn open_count(&self) -> usize {
        self.opens.get()
    }
}

impl TransportOpener for SimOpener {
    fn open(&mut self, kind: DeviceKind) -> Result<Box<dyn Transport>, DeckError> {
        let (transport, handle) = SimTransport::new(format!("sim:{kind}"));
        handle.0.borrow_mut().board_echo = self.board_echo;
        self.handles.borrow_mut().insert(kind, handle);
        self.opens.set(self.opens.get() + 1);
        Ok(Box::new(transport))
    }
}
