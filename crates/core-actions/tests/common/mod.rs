#![allow(dead_code)] // Shared across integration tests; each test binary uses a subset of helpers.

use core_actions::{DispatchResult, ScriptTranslator, dispatch};
use core_state::EditorSession;

/// Translate and dispatch every line of `script`, panicking on a line that
/// does not translate.
pub fn run(session: &mut EditorSession, script: &str) -> Vec<DispatchResult> {
    script
        .lines()
        .filter_map(|line| match ScriptTranslator::translate(line) {
            Ok(action) => action,
            Err(e) => panic!("bad script line {line:?}: {e}"),
        })
        .map(|action| dispatch(action, session, &[]))
        .collect()
}

/// Like [`run`] but asserts every command succeeded.
pub fn run_ok(session: &mut EditorSession, script: &str) {
    for (i, r) in run(session, script).iter().enumerate() {
        assert!(r.is_ok(), "command {i} failed: {:?}", r.status);
    }
}

/// Diatonic offsets of every note in one measure.
pub fn pitches(session: &EditorSession, staff: usize, measure: usize) -> Vec<i32> {
    session
        .movement()
        .measure(staff, measure)
        .unwrap()
        .objects()
        .iter()
        .filter_map(|o| o.as_chord())
        .flat_map(|c| c.notes.iter().map(|n| n.mid_c_offset))
        .collect()
}
