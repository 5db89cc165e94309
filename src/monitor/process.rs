use super::state::ProcessState;

/// Map a `ps -o stat=` value to a state.
///
/// Only the first letter (the scheduler state) matters; the trailing flags
/// (`s`, `+`, `l`, ...) are ignored.
pub fn state_from_ps_stat(stat: &str) -> ProcessState {
    match stat.trim().chars().next() {
        Some('R') => ProcessState::Busy,
        Some('S') => ProcessState::Idle,
        Some('D') => ProcessState::Waiting,
        Some('Z') => ProcessState::Error,
        _ => ProcessState::Unknown,
    }
}
