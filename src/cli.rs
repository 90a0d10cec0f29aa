use clap::{Args, Parser, Subcommand, ValueEnum};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;
use thiserror::Error;

use crate::dispatch::TransmitPolicy;
use crate::proto::codec::Alphabet;
use crate::speed::{Speed, SpeedBounds};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "drive-link",
    about = "Keyboard remote for a UDP-driven RC car (drive) and a bench receiver (listen)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// Drive the car from the keyboard
    Drive(DriveOpts),
    /// Act as the car: decode commands and print what it would do
    Listen(ListenOpts),
}

#[derive(Args, Debug, Clone)]
pub struct SpeedOpts {
    /// Lowest speed level
    #[arg(long = "speed-min")]
    pub min: Option<u16>,
    /// Highest speed level
    #[arg(long = "speed-max", default_value_t = 1023)]
    pub max: u16,
    /// Change per speed step
    #[arg(long = "speed-step", default_value_t = 100)]
    pub step: u16,
    /// Speed level at start
    #[arg(long = "speed-initial", default_value_t = 512)]
    pub initial: u16,
}

impl SpeedOpts {
    /// Build the starting speed. `default_min` applies when `--speed-min` is absent.
    pub fn resolve(&self, default_min: u16) -> Result<Speed, ConfigError> {
        let bounds = SpeedBounds::new(self.min.unwrap_or(default_min), self.max, self.step)?;
        Speed::new(self.initial, bounds)
    }
}

#[derive(Args, Debug, Clone)]
pub struct DriveOpts {
    /// Car IPv4 address
    #[arg(long, default_value = "10.67.214.228")]
    pub addr: Ipv4Addr,
    /// Car UDP port
    #[arg(long, default_value_t = 4210)]
    pub port: u16,
    /// Controller profile (diagonals, default policy and rate)
    #[arg(long, value_enum, default_value_t = Variant::Basic)]
    pub variant: Variant,
    /// Override the profile's transmit policy
    #[arg(long, value_enum)]
    pub policy: Option<TransmitPolicy>,
    /// Override the profile's tick rate (ticks per second)
    #[arg(long)]
    pub rate: Option<u32>,
    #[command(flatten)]
    pub speed: SpeedOpts,
    /// Number of history entries kept
    #[arg(long, default_value_t = 10)]
    pub history: usize,
    /// Socket write timeout in milliseconds
    #[arg(long, default_value_t = 100)]
    pub send_timeout_ms: u64,
    /// How long a key counts as held after its last press/repeat when the
    /// terminal cannot report releases
    #[arg(long, default_value_t = 550)]
    pub hold_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct ListenOpts {
    /// Local address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: Ipv4Addr,
    /// UDP port to listen on
    #[arg(long, default_value_t = 4210)]
    pub port: u16,
    /// Code table used to decode incoming bytes; `legacy` stands in for the
    /// older five-direction firmware
    #[arg(long, value_enum, default_value_t = Alphabet::Standard)]
    pub alphabet: Alphabet,
    /// Stop the motors when no command arrived for this long (ms)
    #[arg(long, default_value_t = 300)]
    pub timeout_ms: u64,
    /// Stats print interval in seconds
    #[arg(long, default_value_t = 5.0)]
    pub stats: f64,
    #[command(flatten)]
    pub speed: SpeedOpts,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tick rate must be at least 1 tick/s")]
    ZeroRate,
    #[error("history capacity must be at least 1")]
    ZeroHistory,
    #[error("speed step must be non-zero")]
    ZeroStep,
    #[error("speed bounds inverted: min {min} > max {max}")]
    InvertedBounds { min: u16, max: u16 },
    #[error("initial speed {initial} outside [{min}, {max}]")]
    InitialOutOfRange { initial: u16, min: u16, max: u16 },
    #[error("{0} must be non-zero")]
    ZeroDuration(&'static str),
}

/// Built-in controller profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    /// Four directions, send on change, 30 ticks/s
    Basic,
    /// Diagonals, send every tick, 20 ticks/s
    Extended,
}

impl Variant {
    pub fn diagonals(self) -> bool {
        matches!(self, Variant::Extended)
    }
    pub fn policy(self) -> TransmitPolicy {
        match self {
            Variant::Basic => TransmitPolicy::Edge,
            Variant::Extended => TransmitPolicy::Level,
        }
    }
    pub fn rate(self) -> u32 {
        match self {
            Variant::Basic => 30,
            Variant::Extended => 20,
        }
    }
}

/// Resolved drive settings: variant defaults with command line overrides.
/// Every variant sends the standard code table; variants differ only in
/// diagonals, policy and rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub alphabet: Alphabet,
    pub diagonals: bool,
    pub policy: TransmitPolicy,
    pub rate: u32,
    pub history: usize,
    pub send_timeout: Duration,
    pub hold: Duration,
}

impl Profile {
    pub fn from_cli(opts: &DriveOpts) -> Result<Self, ConfigError> {
        let rate = opts.rate.unwrap_or(opts.variant.rate());
        if rate == 0 {
            return Err(ConfigError::ZeroRate);
        }
        if opts.history == 0 {
            return Err(ConfigError::ZeroHistory);
        }
        Ok(Profile {
            alphabet: Alphabet::Standard,
            diagonals: opts.variant.diagonals(),
            policy: opts.policy.unwrap_or(opts.variant.policy()),
            rate,
            history: opts.history,
            send_timeout: non_zero_ms(opts.send_timeout_ms, "send timeout")?,
            hold: non_zero_ms(opts.hold_ms, "hold time")?,
        })
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(1) / self.rate
    }
}

impl DriveOpts {
    pub fn peer(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.addr, self.port)
    }
}

pub fn non_zero_ms(ms: u64, what: &'static str) -> Result<Duration, ConfigError> {
    if ms == 0 {
        return Err(ConfigError::ZeroDuration(what));
    }
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::command::Command;

    fn drive(args: &[&str]) -> DriveOpts {
        let argv = ["drive-link", "drive"].iter().chain(args.iter()).copied();
        match Cli::try_parse_from(argv).unwrap().cmd {
            Cmd::Drive(opts) => opts,
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn basic_defaults() {
        let opts = drive(&[]);
        assert_eq!(opts.peer(), "10.67.214.228:4210".parse::<SocketAddrV4>().unwrap());
        let p = Profile::from_cli(&opts).unwrap();
        assert_eq!(p.alphabet, Alphabet::Standard);
        assert!(!p.diagonals);
        assert_eq!(p.policy, TransmitPolicy::Edge);
        assert_eq!(p.rate, 30);
        assert_eq!(p.history, 10);
        assert_eq!(p.send_timeout, Duration::from_millis(100));
    }

    #[test]
    fn extended_defaults_and_overrides() {
        let p = Profile::from_cli(&drive(&["--variant", "extended"])).unwrap();
        assert_eq!(p.alphabet, Alphabet::Standard);
        assert!(p.diagonals);
        assert_eq!(p.policy, TransmitPolicy::Level);
        assert_eq!(p.rate, 20);
        assert_eq!(p.tick_period(), Duration::from_millis(50));

        let p = Profile::from_cli(&drive(&[
            "--variant", "extended", "--policy", "edge", "--rate", "50",
        ]))
        .unwrap();
        assert_eq!(p.policy, TransmitPolicy::Edge);
        assert_eq!(p.rate, 50);
        assert!(p.diagonals);
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            Profile::from_cli(&drive(&["--rate", "0"])),
            Err(ConfigError::ZeroRate)
        );
        assert_eq!(
            Profile::from_cli(&drive(&["--history", "0"])),
            Err(ConfigError::ZeroHistory)
        );
        assert!(matches!(
            Profile::from_cli(&drive(&["--send-timeout-ms", "0"])),
            Err(ConfigError::ZeroDuration(_))
        ));
        assert!(Cli::try_parse_from(["drive-link", "drive", "--addr", "car.local"]).is_err());
        assert!(Cli::try_parse_from(["drive-link", "drive", "--policy", "sometimes"]).is_err());
        assert_eq!(
            drive(&["--speed-min", "600", "--speed-max", "500"]).speed.resolve(200),
            Err(ConfigError::InvertedBounds { min: 600, max: 500 })
        );
        assert!(matches!(
            drive(&["--speed-initial", "100"]).speed.resolve(200),
            Err(ConfigError::InitialOutOfRange { .. })
        ));
    }

    #[test]
    fn listen_defaults() {
        match Cli::try_parse_from(["drive-link", "listen"]).unwrap().cmd {
            Cmd::Listen(opts) => {
                assert_eq!(opts.port, 4210);
                assert_eq!(opts.alphabet, Alphabet::Standard);
                assert_eq!(opts.timeout_ms, 300);
                assert_eq!(opts.speed.min, None);
                let speed = opts.speed.resolve(400).unwrap();
                assert_eq!(speed.bounds().min, 400);
                assert_eq!(speed.value(), 512);
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn default_drive_and_listen_agree_on_every_code() {
        let sender = Profile::from_cli(&drive(&[])).unwrap().alphabet;
        let receiver = match Cli::try_parse_from(["drive-link", "listen"]).unwrap().cmd {
            Cmd::Listen(opts) => opts.alphabet,
            _ => panic!("wrong subcommand"),
        };
        for variant in ["basic", "extended"] {
            let p = Profile::from_cli(&drive(&["--variant", variant])).unwrap();
            assert_eq!(p.alphabet, sender, "{variant} changes the code table");
        }
        for cmd in Command::ALL {
            let byte = sender.encode(cmd).unwrap();
            assert_eq!(receiver.decode(byte).unwrap(), cmd, "{cmd} sent as {:?}", byte as char);
        }
    }

    #[test]
    fn legacy_receiver_is_opt_in() {
        match Cli::try_parse_from(["drive-link", "listen", "--alphabet", "legacy"])
            .unwrap()
            .cmd
        {
            Cmd::Listen(opts) => assert_eq!(opts.alphabet, Alphabet::Legacy),
            _ => panic!("wrong subcommand"),
        }
    }
}
