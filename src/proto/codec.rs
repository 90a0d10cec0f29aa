// src/proto/codec.rs
use clap::ValueEnum;
use thiserror::Error;

use super::command::Command;

/// Byte table used on the wire.
///
/// `Standard` is the only table the controller sends, whatever the
/// variant: the one the vehicle firmware decodes, where BACKWARD is `K` and
/// RIGHT is `E` so that `R` and `B` can carry UPPER_LEFT and DOWN_RIGHT.
/// `Legacy` is the older five-direction firmware table, where `B` and `R`
/// still mean BACKWARD and RIGHT; it exists so the receiver can stand in
/// for that firmware and is never a controller default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Alphabet {
    #[default]
    Standard,
    Legacy,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("{0} has no code in the {1:?} alphabet")]
    Unsupported(Command, Alphabet),
    #[error("unknown code 0x{0:02X} in the {1:?} alphabet")]
    Unknown(u8, Alphabet),
}

impl Alphabet {
    /// Serialize a command to its single wire byte.
    pub fn encode(self, cmd: Command) -> Result<u8, CodecError> {
        use Command::*;
        let code = match (self, cmd) {
            (_, Forward) => b'F',
            (_, Left) => b'L',
            (_, Stop) => b'S',
            (_, SpeedUp) => b'+',
            (_, SpeedDown) => b'-',

            (Alphabet::Standard, Backward) => b'K',
            (Alphabet::Standard, Right) => b'E',
            (Alphabet::Standard, UpperLeft) => b'R',
            (Alphabet::Standard, UpperRight) => b'Y',
            (Alphabet::Standard, DownLeft) => b'C',
            (Alphabet::Standard, DownRight) => b'B',

            (Alphabet::Legacy, Backward) => b'B',
            (Alphabet::Legacy, Right) => b'R',
            (Alphabet::Legacy, _) => return Err(CodecError::Unsupported(cmd, self)),
        };
        Ok(code)
    }

    /// Parse a wire byte back into a command.
    pub fn decode(self, code: u8) -> Result<Command, CodecError> {
        use Command::*;
        let cmd = match (self, code) {
            (_, b'F') => Forward,
            (_, b'L') => Left,
            (_, b'S') => Stop,
            (_, b'+') => SpeedUp,
            (_, b'-') => SpeedDown,

            (Alphabet::Standard, b'K') => Backward,
            (Alphabet::Standard, b'E') => Right,
            (Alphabet::Standard, b'R') => UpperLeft,
            (Alphabet::Standard, b'Y') => UpperRight,
            (Alphabet::Standard, b'C') => DownLeft,
            (Alphabet::Standard, b'B') => DownRight,

            (Alphabet::Legacy, b'B') => Backward,
            (Alphabet::Legacy, b'R') => Right,

            _ => return Err(CodecError::Unknown(code, self)),
        };
        Ok(cmd)
    }
}

/* ---------- tests ---------- */
