use clap::ValueEnum;
use log::{debug, info, warn};

use crate::link::Transport;
use crate::proto::codec::Alphabet;
use crate::proto::command::Command;
use crate::speed::SpeedChange;
use crate::state::{ConnectionStatus, DriveState};

/// When a held motion command goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransmitPolicy {
    /// Only when the command differs from the last one sent
    Edge,
    /// Every tick, as a keep-alive for the car's auto-stop
    Level,
}

/// Owns the transport and all drive state. Every send, status change,
/// packet count and history entry goes through here.
pub struct Dispatcher<T: Transport> {
    transport: T,
    alphabet: Alphabet,
    policy: TransmitPolicy,
    /// Last motion command that reached the socket.
    last_sent: Option<Command>,
    state: DriveState,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(
        transport: T,
        alphabet: Alphabet,
        policy: TransmitPolicy,
        state: DriveState,
    ) -> Self {
        Self {
            transport,
            alphabet,
            policy,
            last_sent: None,
            state,
        }
    }

    pub fn state(&self) -> &DriveState {
        &self.state
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[cfg(test)]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Offer this tick's motion command. Returns true if a datagram left.
    ///
    /// A failed send leaves `last_sent` untouched, so under the edge policy
    /// the same command is retried on the next tick.
    pub fn dispatch_motion(&mut self, cmd: Command) -> bool {
        debug_assert!(cmd.is_motion());
        let changed = self.last_sent != Some(cmd);
        if !changed && self.policy == TransmitPolicy::Edge {
            return false;
        }
        if !self.send(cmd) {
            return false;
        }
        self.state.command = cmd;
        self.last_sent = Some(cmd);
        if changed {
            self.state.history.push(cmd.name());
            info!("-> {}", cmd);
        }
        true
    }

    /// Handle one speed-control press: step, clamp, send, log. The press is
    /// always sent and logged, even when the value is already at its limit.
    pub fn adjust_speed(&mut self, change: SpeedChange) -> bool {
        let value = self.state.speed.apply(change);
        let sent = self.send(change.command());
        let entry = change.describe(value);
        info!("-> {}", entry);
        self.state.history.push(entry);
        sent
    }

    /// Unconditional STOP used on the way out.
    pub fn stop(&mut self) -> bool {
        let sent = self.send(Command::Stop);
        if sent {
            self.state.command = Command::Stop;
            self.last_sent = Some(Command::Stop);
        }
        sent
    }

    fn send(&mut self, cmd: Command) -> bool {
        let code = match self.alphabet.encode(cmd) {
            Ok(code) => code,
            Err(e) => {
                warn!("{e}");
                self.state.status = ConnectionStatus::Error(e.to_string());
                return false;
            }
        };
        match self.transport.send(&[code]) {
            Ok(()) => {
                if self.state.status.is_error() {
                    info!("link recovered");
                }
                self.state.status = ConnectionStatus::Connected;
                self.state.packets += 1;
                debug!("sent {:?} ({})", code as char, cmd);
                true
            }
            Err(e) => {
                if !self.state.status.is_error() {
                    warn!("{e}");
                }
                self.state.status = ConnectionStatus::Error(e.to_string());
                false
            }
        }
    }
}
