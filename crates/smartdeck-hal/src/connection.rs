//! Shared board links and the [`ConnectionManager`] that owns them.
//!
//! Every vehicle of a given [`DeviceKind`] talks to the same physical board,
//! so the transport is opened once, on the first vehicle of that kind, and
//! handed out by reference to every later one.
//!
//! # Sequencing
//!
//! A [`SharedLink`] is an `Rc<RefCell<Link>>`.  It is neither `Send` nor
//! `Sync`: the deck and everything holding a link must be driven from one
//! thread, one event at a time.  A multi-threaded host has to put the whole
//! deck behind its own mutex or single-writer queue.
//!
//! # Read policy
//!
//! [`Link::poll_ack`] only reads once a full acknowledgement could be
//! buffered, drains everything waiting in one call, and keeps the freshest
//! valid frame.  Nothing is carried over between calls.  Buffers that do not
//! decode are dropped silently apart from a `trace` line and the
//! [`LinkStats::frames_dropped`] counter.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use smartdeck_types::{DeckError, SerialSettings};
use tracing::{debug, info, trace, warn};

use crate::protocol::{self, ACK_FRAME_LEN, AckFrame};
use crate::serial::SerialTransport;
use crate::transport::Transport;
use crate::vehicle::DeviceKind;

/// A link shared by every vehicle of one device type.
pub type SharedLink = Rc<RefCell<Link>>;

/// Counters kept per link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub packets_sent: u64,
    pub acks_decoded: u64,
    pub frames_dropped: u64,
}

/// An open transport plus what has been learned from the board over it.
pub struct Link {
    kind: DeviceKind,
    transport: Box<dyn Transport>,
    last_ack: Option<AckFrame>,
    stats: LinkStats,
}

impl Link {
    pub fn new(kind: DeviceKind, transport: Box<dyn Transport>) -> Self {
        Self {
            kind,
            transport,
            last_ack: None,
            stats: LinkStats::default(),
        }
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// The most recent acknowledgement successfully decoded on this link.
    pub fn last_ack(&self) -> Option<&AckFrame> {
        self.last_ack.as_ref()
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Write one packet.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::Transport`] if the write fails.
    pub fn send(&mut self, packet: &[u8]) -> Result<(), DeckError> {
        self.transport
            .write_all(packet)
            .map_err(|e| DeckError::transport(self.transport.name(), e))?;
        self.stats.packets_sent += 1;
        debug!(link = %self.kind, packet = %protocol::hex(packet), "packet sent");
        Ok(())
    }

    /// Try to pick up an acknowledgement without blocking.
    ///
    /// Returns `Ok(None)` when fewer than a frame's worth of bytes are
    /// buffered or when the buffer holds no valid frame.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::Transport`] if probing or reading fails.
    pub fn poll_ack(&mut self) -> Result<Option<AckFrame>, DeckError> {
        let available = self
            .transport
            .bytes_available()
            .map_err(|e| DeckError::transport(self.transport.name(), e))?;
        if available < ACK_FRAME_LEN {
            return Ok(None);
        }

        let mut buf = vec![0u8; available];
        let read = self
            .transport
            .read_available(&mut buf)
            .map_err(|e| DeckError::transport(self.transport.name(), e))?;
        buf.truncate(read);

        let Some(ack) = protocol::decode_ack(&buf) else {
            self.stats.frames_dropped += 1;
            trace!(link = %self.kind, bytes = buf.len(), "no valid acknowledgement in buffer");
            return Ok(None);
        };

        self.stats.acks_decoded += 1;
        self.note_link_state(&ack);
        debug!(
            link = %self.kind,
            status = ack.status,
            players = ?ack.player_ids,
            "acknowledgement decoded"
        );
        self.last_ack = Some(ack.clone());
        Ok(Some(ack))
    }

    fn note_link_state(&self, ack: &AckFrame) {
        let was_up = self.last_ack.as_ref().map(AckFrame::link_up);
        match (was_up, ack.link_up()) {
            (Some(true), false) => warn!(link = %self.kind, "board reports SmartPort link down"),
            (Some(false) | None, true) => info!(link = %self.kind, "board reports SmartPort link up"),
            _ => {}
        }
    }
}

/// Opens the transport behind a device type's link.
pub trait TransportOpener {
    /// # Errors
    ///
    /// Returns [`DeckError::TransportOpen`] or [`DeckError::InvalidConfig`]
    /// when no transport can be produced for `kind`.
    fn open(&mut self, kind: DeviceKind) -> Result<Box<dyn Transport>, DeckError>;
}

/// Opens board links on the configured serial port.
pub struct SerialOpener {
    settings: SerialSettings,
}

impl SerialOpener {
    pub fn new(settings: SerialSettings) -> Self {
        Self { settings }
    }
}

impl TransportOpener for SerialOpener {
    fn open(&mut self, kind: DeviceKind) -> Result<Box<dyn Transport>, DeckError> {
        let Some(port) = self.settings.port.as_deref() else {
            return Err(DeckError::InvalidConfig(format!(
                "device type '{kind}' needs a serial port, none configured"
            )));
        };
        Ok(Box::new(SerialTransport::open(port, self.settings.baud_rate)?))
    }
}

/// Owns one lazily opened [`SharedLink`] per device type.
pub struct ConnectionManager {
    opener: Box<dyn TransportOpener>,
    links: HashMap<DeviceKind, SharedLink>,
}

impl ConnectionManager {
    pub fn new(opener: Box<dyn TransportOpener>) -> Self {
        Self {
            opener,
            links: HashMap::new(),
        }
    }

    /// Return the link for `kind`, opening it on first use.
    ///
    /// # Errors
    ///
    /// Propagates the opener's error; nothing is cached on failure.
    pub fn link(&mut self, kind: DeviceKind) -> Result<SharedLink, DeckError> {
        if let Some(link) = self.links.get(&kind) {
            return Ok(Rc::clone(link));
        }

        let transport = self.opener.open(kind)?;
        info!(link = %kind, transport = transport.name(), "link opened");
        let link = Rc::new(RefCell::new(Link::new(kind, transport)));
        self.links.insert(kind, Rc::clone(&link));
        Ok(link)
    }

    /// The link for `kind` if it has already been opened.
    pub fn get(&self, kind: DeviceKind) -> Option<SharedLink> {
        self.links.get(&kind).cloned()
    }

    pub fn is_open(&self, kind: DeviceKind) -> bool {
        self.links.contains_key(&kind)
    }
}
