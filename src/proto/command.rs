/// One discrete instruction for the vehicle.
///
/// Motion commands are level state on the vehicle side (the last one received
/// keeps the motors running). Speed commands are one-shot steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    // ---- Cardinal ----
    Forward,
    Backward,
    Left,
    Right,
    Stop,

    // ---- Diagonal (extended variant, not in the legacy table) ----
    UpperLeft,
    UpperRight,
    DownLeft,
    DownRight,

    // ---- Speed ----
    SpeedUp,
    SpeedDown,
}

impl Command {
    pub const ALL: [Command; 11] = [
        Command::Forward,
        Command::Backward,
        Command::Left,
        Command::Right,
        Command::Stop,
        Command::UpperLeft,
        Command::UpperRight,
        Command::DownLeft,
        Command::DownRight,
        Command::SpeedUp,
        Command::SpeedDown,
    ];

    /// Display name used in the history log and trace lines.
    pub fn name(self) -> &'static str {
        match self {
            Command::Forward => "FORWARD",
            Command::Backward => "BACKWARD",
            Command::Left => "LEFT",
            Command::Right => "RIGHT",
            Command::Stop => "STOPPED",
            Command::UpperLeft => "UPPER_LEFT",
            Command::UpperRight => "UPPER_RIGHT",
            Command::DownLeft => "DOWN_LEFT",
            Command::DownRight => "DOWN_RIGHT",
            Command::SpeedUp => "SPEED_UP",
            Command::SpeedDown => "SPEED_DOWN",
        }
    }

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Command::UpperLeft | Command::UpperRight | Command::DownLeft | Command::DownRight
        )
    }

    pub fn is_motion(self) -> bool {
        !matches!(self, Command::SpeedUp | Command::SpeedDown)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
