use crate::cli::ConfigError;
use crate::proto::command::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedBounds {
    pub min: u16,
    pub max: u16,
    pub step: u16,
}

impl SpeedBounds {
    pub fn new(min: u16, max: u16, step: u16) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvertedBounds { min, max });
        }
        if step == 0 {
            return Err(ConfigError::ZeroStep);
        }
        Ok(Self { min, max, step })
    }

    pub fn contains(&self, value: u16) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// One press of the speed up/down control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedChange {
    Up,
    Down,
}

impl SpeedChange {
    pub fn command(self) -> Command {
        match self {
            SpeedChange::Up => Command::SpeedUp,
            SpeedChange::Down => Command::SpeedDown,
        }
    }

    /// History/trace text for a change that landed on `value`.
    pub fn describe(self, value: u16) -> String {
        match self {
            SpeedChange::Up => format!("Speed increased to {value}"),
            SpeedChange::Down => format!("Speed decreased to {value}"),
        }
    }
}

/// Throttle level, always inside its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Speed {
    value: u16,
    bounds: SpeedBounds,
}

impl Speed {
    pub fn new(initial: u16, bounds: SpeedBounds) -> Result<Self, ConfigError> {
        if !bounds.contains(initial) {
            return Err(ConfigError::InitialOutOfRange {
                initial,
                min: bounds.min,
                max: bounds.max,
            });
        }
        Ok(Self {
            value: initial,
            bounds,
        })
    }

    pub fn value(&self) -> u16 {
        self.value
    }

    pub fn bounds(&self) -> SpeedBounds {
        self.bounds
    }

    /// Step by one increment and clamp. Returns the new value, which equals
    /// the old one when already at the limit.
    pub fn apply(&mut self, change: SpeedChange) -> u16 {
        let SpeedBounds { min, max, step } = self.bounds;
        self.value = match change {
            SpeedChange::Up => self.value.saturating_add(step).min(max),
            SpeedChange::Down => self.value.saturating_sub(step).max(min),
        };
        self.value
    }
}
