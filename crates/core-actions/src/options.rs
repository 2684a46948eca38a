//! Configuration to session wiring.

use core_config::{Config, InputModeConfig};
use core_layout::{LayoutEngine, StandardWidths};
use core_score::Score;
use core_state::{EditorSession, InputMode, SessionOptions};

pub fn session_options(cfg: &Config) -> SessionOptions {
    let f = &cfg.file;
    SessionOptions {
        undo_history_max: f.undo.history_max,
        clipboard_stack_max: f.clipboard.stack_max,
        default_duration: f.input.default_duration,
        input_mode: match f.input.mode {
            InputModeConfig::Insert => InputMode::Insert,
            InputModeConfig::Edit => InputMode::Edit,
        },
        default_measure_width: f.layout.default_measure_width,
    }
}

pub fn standard_widths(cfg: &Config) -> StandardWidths {
    let w = &cfg.file.widths;
    StandardWidths {
        note_head: w.note_head,
        dot: w.dot,
        accidental: w.accidental,
        flag: w.flag,
        clef: w.clef,
        key_accidental: w.key_accidental,
        time_signature: w.time_signature,
        marker: w.marker,
        directive: w.directive,
        measure_padding: cfg.file.layout.measure_padding,
    }
}

pub fn layout_engine(cfg: &Config) -> LayoutEngine {
    LayoutEngine::new(standard_widths(cfg)).with_stem_margin(cfg.file.layout.stem_margin)
}

/// Open a session over `score` configured by `cfg`.
pub fn session_from_config(score: Score, cfg: &Config) -> EditorSession {
    EditorSession::with_layout(score, session_options(cfg), layout_engine(cfg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::ConfigFile;

    #[test]
    fn defaults_match_library_defaults() {
        let cfg = Config::default();
        assert_eq!(session_options(&cfg), SessionOptions::default());
        assert_eq!(standard_widths(&cfg), StandardWidths::default());
    }

    #[test]
    fn configured_values_flow_into_the_session() {
        let mut file = ConfigFile::default();
        file.undo.history_max = 3;
        file.input.mode = InputModeConfig::Edit;
        file.input.default_duration = 3;
        file.layout.default_measure_width = 200;
        file.layout.stem_margin = 5;
        file.widths.clef = 30;
        let cfg = Config {
            file,
            ..Config::default()
        };

        let session = session_from_config(Score::default(), &cfg);
        assert_eq!(session.input_mode, InputMode::Edit);
        assert_eq!(session.duration, 3);
        assert_eq!(session.layout.stem_margin, 5);
        assert_eq!(session.movement().default_measure_width, 200);
        assert_eq!(standard_widths(&cfg).clef, 30);
    }
}
