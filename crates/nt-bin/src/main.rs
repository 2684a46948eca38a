//! notator: headless driver for the notation editor core.
//!
//! Reads a command script (file or stdin), feeds it through the event loop
//! together with any MIDI notes given on the command line, and prints the
//! text dump of the score at the end.
use anyhow::{Context, Result};
use clap::Parser;
use core_actions::dispatcher::Status;
use core_actions::{Action, EditKind, ScriptTranslator, dispatch, session_from_config};
use core_config::load_from;
use core_events::{
    EVENT_CHANNEL_CAP, Event, EventHooks, EventSourceRegistry, MIDI_QUEUE_CAP, MidiEventSource,
    MidiNote, NoopEventHooks, ScriptEventSource, ScriptLine,
};
use core_score::{Movement, Score, ScoreExporter, TextExporter};
use core_state::EditorSession;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "notator", version, about = "Headless music notation editor")]
struct Args {
    /// Command script to run. Reads stdin when omitted.
    pub script: Option<PathBuf>,
    /// Configuration file path (overrides discovery of `notator.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Staffs in the initial score.
    #[arg(long, default_value_t = 1)]
    pub staffs: usize,
    /// Measures per staff in the initial score.
    #[arg(long, default_value_t = 1)]
    pub measures: usize,
    /// MIDI keys played while the script runs, comma separated.
    #[arg(long = "midi", value_delimiter = ',')]
    pub midi: Vec<u8>,
    /// Skip the score dump at exit.
    #[arg(long)]
    pub quiet: bool,
    /// Directory receiving `notator.log`.
    #[arg(long = "log-dir", default_value = ".")]
    pub log_dir: PathBuf,
}

fn configure_logging(log_dir: &Path) -> Option<WorkerGuard> {
    let log_path = log_dir.join("notator.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }
    let file_appender = tracing_appender::rolling::never(log_dir, "notator.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .with_ansi(false)
        .try_init()
    {
        Ok(()) => Some(guard),
        // Global subscriber already installed; dropping the guard stops the writer.
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopControl {
    Continue,
    Break,
}

/// What the loop produced, printed by `main` once the loop is done.
#[derive(Debug, Default)]
struct Transcript {
    /// Query output (`print`, `undo-log`).
    output: Vec<String>,
    /// `line N: reason` for every line that failed.
    failures: Vec<String>,
    commands: usize,
}

struct Runtime {
    session: EditorSession,
    rx: mpsc::Receiver<Event>,
    source_handles: Vec<JoinHandle<()>>,
    hooks: Box<dyn EventHooks>,
    transcript: Transcript,
}

impl Runtime {
    fn new(
        session: EditorSession,
        rx: mpsc::Receiver<Event>,
        source_handles: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            session,
            rx,
            source_handles,
            hooks: Box::new(NoopEventHooks),
            transcript: Transcript::default(),
        }
    }

    /// Runs until `Shutdown`, `quit`, or every sender is gone.
    async fn run(&mut self) {
        let span = tracing::debug_span!(target: "runtime", "event_loop");
        let _enter = span.enter();

        while let Some(event) = self.rx.recv().await {
            self.hooks.pre_handle(&event);
            let control = match &event {
                Event::Script(line) => self.handle_script_line(line),
                Event::Midi(note) => self.handle_midi(*note),
                Event::Shutdown => LoopControl::Break,
            };
            if control == LoopControl::Break {
                break;
            }
            self.hooks.post_handle(&event);
        }
        self.rx.close();
        self.finalize_shutdown().await;
    }

    fn handle_script_line(&mut self, line: &ScriptLine) -> LoopControl {
        let action = match ScriptTranslator::translate(&line.text) {
            Ok(Some(action)) => action,
            Ok(None) => return LoopControl::Continue,
            Err(err) => {
                warn!(target: "runtime", line = line.number, %err, "script_line_rejected");
                self.transcript
                    .failures
                    .push(format!("line {}: {err}", line.number));
                return LoopControl::Continue;
            }
        };
        self.apply(action, Some(line.number))
    }

    fn handle_midi(&mut self, note: MidiNote) -> LoopControl {
        trace!(target: "runtime", key = note.key, velocity = note.velocity, "midi_note");
        self.apply(Action::Edit(EditKind::Midi(note.key)), None)
    }

    fn apply(&mut self, action: Action, line: Option<usize>) -> LoopControl {
        self.transcript.commands += 1;
        let result = dispatch(action, &mut self.session, &[]);
        match result.status {
            Status::Ok => {}
            Status::Output(text) => self.transcript.output.push(text),
            Status::Failed(reason) => {
                let origin = line.map_or_else(|| "midi".to_string(), |n| format!("line {n}"));
                self.transcript.failures.push(format!("{origin}: {reason}"));
            }
        }
        if result.quit {
            LoopControl::Break
        } else {
            LoopControl::Continue
        }
    }

    async fn finalize_shutdown(&mut self) {
        while let Some(handle) = self.source_handles.pop() {
            match tokio::time::timeout(Duration::from_millis(200), handle).await {
                Ok(Ok(())) => trace!(target: "runtime.shutdown", "event_source_task_stopped"),
                Ok(Err(err)) if err.is_cancelled() => {
                    trace!(target: "runtime.shutdown", "event_source_task_cancelled")
                }
                Ok(Err(err)) => error!(target: "runtime.shutdown", ?err, "event_source_task_error"),
                Err(_) => warn!(target: "runtime.shutdown", "event_source_task_timeout"),
            }
        }
        info!(
            target: "runtime.shutdown",
            commands = self.transcript.commands,
            failures = self.transcript.failures.len(),
            script_lines = core_events::SCRIPT_LINES.load(Ordering::Relaxed),
            midi_forwarded = core_events::MIDI_NOTES_FORWARDED.load(Ordering::Relaxed),
            midi_dropped = core_events::MIDI_NOTES_DROPPED.load(Ordering::Relaxed),
            "shutdown_complete"
        );
    }
}

async fn script_source(path: Option<&Path>) -> Result<ScriptEventSource> {
    Ok(match path {
        Some(p) => {
            let file = tokio::fs::File::open(p)
                .await
                .with_context(|| format!("opening script {}", p.display()))?;
            ScriptEventSource::from_reader(BufReader::new(file))
        }
        None => ScriptEventSource::from_reader(BufReader::new(tokio::io::stdin())),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = configure_logging(&args.log_dir);
    install_panic_hook();
    info!(target: "runtime", "startup");

    let config = load_from(args.config.clone())?;
    let score = Score::new(Movement::new(args.staffs.max(1), args.measures.max(1)));
    let session = session_from_config(score, &config);
    let config_path = config.path.as_ref().map(|p| p.display().to_string());
    info!(
        target: "runtime.startup",
        config_path = config_path.as_deref(),
        staffs = args.staffs,
        measures = args.measures,
        midi_notes = args.midi.len(),
        "bootstrap_complete"
    );

    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let mut registry = EventSourceRegistry::new();
    registry.register(script_source(args.script.as_deref()).await?);
    if !args.midi.is_empty() {
        let (injector, midi) = MidiEventSource::channel(MIDI_QUEUE_CAP);
        for key in &args.midi {
            injector.inject(*key, 100);
        }
        registry.register(midi);
    }
    let handles = registry.spawn_all(&tx);
    // Sources hold their own clones; the loop ends once they are all gone.
    drop(tx);

    let mut runtime = Runtime::new(session, rx, handles);
    runtime.run().await;

    for text in &runtime.transcript.output {
        print!("{text}");
    }
    for failure in &runtime.transcript.failures {
        eprintln!("{failure}");
    }
    if !args.quiet {
        print!("{}", TextExporter.export_to_string(&runtime.session.score));
    }
    Ok(())
}
