use crate::proto::command::Command;

/// Which logical direction keys are held during one tick.
///
/// Each direction folds its arrow key and its WASD key together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// Discrete press edges delivered alongside the per-tick key state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    SpeedUp,
    SpeedDown,
}

/// Map a key snapshot to exactly one motion command.
///
/// With `diagonals` the four two-key combinations are checked first, in the
/// order up+left, up+right, down+left, down+right. The cardinal checks then
/// run in the order up, down, left, right, and no match means STOPPED.
pub fn classify(keys: KeyState, diagonals: bool) -> Command {
    let KeyState {
        up,
        down,
        left,
        right,
    } = keys;

    if diagonals {
        match (up, down, left, right) {
            (true, _, true, _) => return Command::UpperLeft,
            (true, _, _, true) => return Command::UpperRight,
            (_, true, true, _) => return Command::DownLeft,
            (_, true, _, true) => return Command::DownRight,
            _ => {}
        }
    }

    if up {
        Command::Forward
    } else if down {
        Command::Backward
    } else if left {
        Command::Left
    } else if right {
        Command::Right
    } else {
        Command::Stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(up: bool, down: bool, left: bool, right: bool) -> KeyState {
        KeyState {
            up,
            down,
            left,
            right,
        }
    }

    fn all_snapshots() -> impl Iterator<Item = KeyState> {
        (0u8..16).map(|m| keys(m & 1 != 0, m & 2 != 0, m & 4 != 0, m & 8 != 0))
    }

    #[test]
    fn nothing_held_is_stop() {
        assert_eq!(classify(KeyState::default(), false), Command::Stop);
        assert_eq!(classify(KeyState::default(), true), Command::Stop);
    }

    #[test]
    fn cardinal_priority() {
        assert_eq!(classify(keys(true, true, true, true), false), Command::Forward);
        assert_eq!(classify(keys(false, true, true, true), false), Command::Backward);
        assert_eq!(classify(keys(false, false, true, true), false), Command::Left);
        assert_eq!(classify(keys(false, false, false, true), false), Command::Right);
    }

    #[test]
    fn diagonals_take_priority() {
        assert_eq!(classify(keys(true, false, true, false), true), Command::UpperLeft);
        assert_eq!(classify(keys(true, false, false, true), true), Command::UpperRight);
        assert_eq!(classify(keys(false, true, true, false), true), Command::DownLeft);
        assert_eq!(classify(keys(false, true, false, true), true), Command::DownRight);
        // up+left outranks everything else held at the same time
        assert_eq!(classify(keys(true, true, true, true), true), Command::UpperLeft);
        // up+down with no side key is not a diagonal
        assert_eq!(classify(keys(true, true, false, false), true), Command::Forward);
    }

    #[test]
    fn without_diagonals_never_yields_one() {
        for snap in all_snapshots() {
            let cmd = classify(snap, false);
            assert!(!cmd.is_diagonal(), "{snap:?} -> {cmd:?}");
            assert!(cmd.is_motion());
        }
    }

    #[test]
    fn total_and_deterministic() {
        for snap in all_snapshots() {
            for diagonals in [false, true] {
                let first = classify(snap, diagonals);
                assert_eq!(first, classify(snap, diagonals));
                assert!(first.is_motion());
            }
        }
    }
}
