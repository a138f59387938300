//! Newline-delimited JSON event loop standing in for the real-time push
//! transport.
//!
//! One [`DeckEvent`] per input line; every player-list change is written as
//! one [`DeckNotice::Players`] line.  Blank lines are skipped, malformed
//! lines are logged and skipped.

use std::io::{BufRead, Write};

use smartdeck_kernel::{EventRouter, EventSink};
use smartdeck_types::{DeckError, DeckEvent, DeckNotice, PlayerInfo};
use tracing::{debug, warn};

/// Writes player-list notices as JSON lines.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn players_changed(&mut self, players: &[PlayerInfo]) -> Result<(), DeckError> {
        let notice = DeckNotice::Players {
            players: players.to_vec(),
        };
        serde_json::to_writer(&mut self.out, &notice)
            .map_err(|e| DeckError::transport("event output", e))?;
        self.out
            .write_all(b"\n")
            .and_then(|()| self.out.flush())
            .map_err(|e| DeckError::transport("event output", e))
    }
}

/// Feed every line of `input` through `router` until end of input.
///
/// Returns the number of events processed.
///
/// # Errors
///
/// Stops at the first read failure, transport fault or sink failure.
pub fn run<R: BufRead, S: EventSink>(
    input: R,
    router: &mut EventRouter<S>,
) -> Result<u64, DeckError> {
    let mut processed = 0;
    for (index, line) in input.lines().enumerate() {
        let line = line.map_err(|e| DeckError::transport("event input", e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: DeckEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = index + 1, error = %e, "malformed event skipped");
                continue;
            }
        };
        debug!(?event, "event received");
        router.handle(event)?;
        processed += 1;
    }
    Ok(processed)
}
