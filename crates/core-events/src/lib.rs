//! Event types and async event sources for the command loop.
//!
//! All score mutation happens on the single command loop. Producers (the
//! script reader, MIDI input) run as tokio tasks and hand their events over a
//! bounded `mpsc` channel sized by [`EVENT_CHANNEL_CAP`]. A MIDI note may land
//! between any two script lines; once received it is applied atomically like
//! any other event.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::{info, trace};

pub const EVENT_CHANNEL_CAP: usize = 1024;

/// Capacity of the queue between a MIDI driver callback and its source task.
pub const MIDI_QUEUE_CAP: usize = 256;

// Relaxed counters; inspected by tests and logged at shutdown.
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static SCRIPT_LINES: AtomicU64 = AtomicU64::new(0);
pub static MIDI_NOTES_FORWARDED: AtomicU64 = AtomicU64::new(0);
pub static MIDI_NOTES_DROPPED: AtomicU64 = AtomicU64::new(0);

/// Top-level event consumed by the command loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// One line of the command script.
    Script(ScriptLine),
    /// A note-on from the MIDI input.
    Midi(MidiNote),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    /// 1-based line number in the source.
    pub number: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiNote {
    pub key: u8,
    pub velocity: u8,
}

/// Observe events at the loop boundary. Hooks must not block.
pub trait EventHooks: Send + Sync + 'static {
    fn pre_handle(&self, _event: &Event) {}
    fn post_handle(&self, _event: &Event) {}
}

pub struct NoopEventHooks;

impl EventHooks for NoopEventHooks {}

/// Any async event producer. Implementors spawn one task that pushes events
/// into the shared channel and stops once `tx.send(..)` fails.
pub trait AsyncEventSource: Send + 'static {
    fn name(&self) -> &'static str;
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

#[derive(Default)]
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Spawn every registered source with its own clone of `tx`. The registry
    /// is drained, so a second call spawns nothing. During shutdown drop the
    /// last `Sender` before awaiting the handles.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            let name = src.name();
            info!(target: "runtime.events", source = name, "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}

async fn forward(tx: &Sender<Event>, event: Event) -> bool {
    if tx.send(event).await.is_err() {
        CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
        return false;
    }
    true
}

/// Reads a command script line by line. Blank lines are skipped; everything
/// else (comments included) goes to the loop, which owns the grammar.
pub struct ScriptEventSource {
    reader: Box<dyn AsyncBufRead + Send + Unpin>,
    shutdown_at_eof: bool,
}

impl ScriptEventSource {
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            shutdown_at_eof: true,
        }
    }

    /// Keep the channel open after the last line (interactive use).
    pub fn keep_open(mut self) -> Self {
        self.shutdown_at_eof = false;
        self
    }
}

impl AsyncEventSource for ScriptEventSource {
    fn name(&self) -> &'static str {
        "script"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let Self {
            reader,
            shutdown_at_eof,
        } = *self;
        tokio::spawn(async move {
            let mut lines = reader.lines();
            let mut number = 0usize;
            loop {
                let text = match lines.next_line().await {
                    Ok(Some(text)) => text,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(target: "runtime.events", line = number + 1, error = %e, "script_read_failed");
                        break;
                    }
                };
                number += 1;
                if text.trim().is_empty() {
                    continue;
                }
                SCRIPT_LINES.fetch_add(1, Ordering::Relaxed);
                if !forward(&tx, Event::Script(ScriptLine { number, text })).await {
                    return;
                }
            }
            trace!(target: "runtime.events", lines = number, "script_eof");
            if shutdown_at_eof {
                forward(&tx, Event::Shutdown).await;
            }
        })
    }
}

/// Handle held by a MIDI driver callback. Never blocks: a full queue drops
/// the note and counts it.
#[derive(Debug, Clone)]
pub struct MidiInjector {
    tx: Sender<MidiNote>,
}

impl MidiInjector {
    pub fn inject(&self, key: u8, velocity: u8) -> bool {
        match self.tx.try_send(MidiNote { key, velocity }) {
            Ok(()) => true,
            Err(_) => {
                MIDI_NOTES_DROPPED.fetch_add(1, Ordering::Relaxed);
                trace!(target: "runtime.events", key, "midi_note_dropped");
                false
            }
        }
    }
}

/// Marshals notes from a [`MidiInjector`] onto the command loop channel.
/// Note-offs (velocity 0) are filtered out.
pub struct MidiEventSource {
    rx: Receiver<MidiNote>,
}

impl MidiEventSource {
    pub fn channel(capacity: usize) -> (MidiInjector, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (MidiInjector { tx }, Self { rx })
    }
}

impl AsyncEventSource for MidiEventSource {
    fn name(&self) -> &'static str {
        "midi"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let mut rx = self.rx;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    note = rx.recv() => {
                        let Some(note) = note else { break };
                        if note.velocity == 0 {
                            continue;
                        }
                        if !forward(&tx, Event::Midi(note)).await {
                            break;
                        }
                        MIDI_NOTES_FORWARDED.fetch_add(1, Ordering::Relaxed);
                    }
                    _ = tx.closed() => break,
                }
            }
        })
    }
}
