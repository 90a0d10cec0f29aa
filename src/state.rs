use std::collections::VecDeque;
use std::fmt;

use crate::proto::command::Command;
use crate::speed::Speed;

/// Outcome of the most recent send attempt. Nothing else feeds it: there is
/// no acknowledgment, so `Connected` only means the local send call succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Error(String),
}

impl ConnectionStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, ConnectionStatus::Error(_))
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connecting => f.write_str("CONNECTING..."),
            ConnectionStatus::Connected => f.write_str("CONNECTED"),
            ConnectionStatus::Error(detail) => write!(f, "ERROR: {detail}"),
        }
    }
}

/// Bounded FIFO of dispatched command descriptions.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.into());
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn latest(&self) -> Option<&str> {
        self.entries.back().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything the front end shows. Owned by the dispatcher, lent out
/// read-only once per tick.
#[derive(Debug, Clone)]
pub struct DriveState {
    pub command: Command,
    pub speed: Speed,
    pub status: ConnectionStatus,
    pub packets: u64,
    pub history: History,
}

impl DriveState {
    pub fn new(speed: Speed, history_capacity: usize) -> Self {
        Self {
            command: Command::Stop,
            speed,
            status: ConnectionStatus::default(),
            packets: 0,
            history: History::new(history_capacity),
        }
    }
}
