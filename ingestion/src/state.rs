//! EDC pipeline states as an explicit state machine, grounded on the
//! teacher's `ingestion-pipeline::pipeline::state` (`state_machines::
//! state_machine!` macro, `Ready` initial state, `abort` fan-in to
//! `Failed` from every state).

use common::error::AceError;
use state_machines::core::GuardError;
use state_machines::state_machine;

state_machine! {
    name: IngestionMachine,
    state: IngestionState,
    initial: Ready,
    states: [Ready, Extracted, Defined, Canonicalized, Written, Failed],
    events {
        extract { transition: { from: Ready, to: Extracted } }
        define { transition: { from: Extracted, to: Defined } }
        canonicalize { transition: { from: Defined, to: Canonicalized } }
        write { transition: { from: Canonicalized, to: Written } }
        abort {
            transition: { from: Ready, to: Failed }
            transition: { from: Extracted, to: Failed }
            transition: { from: Defined, to: Failed }
            transition: { from: Canonicalized, to: Failed }
            transition: { from: Written, to: Failed }
        }
    }
}

pub fn ready() -> IngestionMachine<(), Ready> {
    IngestionMachine::new(())
}

/// Maps an illegal-transition guard failure (should be unreachable —
/// every stage only ever drives the event matching its own starting
/// state) into a fatal pipeline error, grounded on the teacher's
/// `map_guard_error`.
pub fn map_guard_error(event: &str, guard: &GuardError) -> AceError {
    AceError::Fatal(format!("invalid ingestion pipeline transition during {event}: {guard:?}"))
}
