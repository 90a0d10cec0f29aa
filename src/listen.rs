use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io;
use std::net::UdpSocket;
use std::time::{Duration, Instant};

use crate::cli::{ListenOpts, non_zero_ms};
use crate::proto::codec::{Alphabet, CodecError};
use crate::proto::command::Command;
use crate::speed::{Speed, SpeedChange};
use crate::stats::Stats;

/// Socket read timeout; bounds how late the auto-stop can fire.
const POLL: Duration = Duration::from_millis(20);

/// What the car would be doing, driven by received command bytes.
#[derive(Debug, Clone)]
pub struct Vehicle {
    alphabet: Alphabet,
    motion: Command,
    speed: Speed,
    last_rx: Instant,
    timeout: Duration,
}

impl Vehicle {
    pub fn new(alphabet: Alphabet, speed: Speed, timeout: Duration, now: Instant) -> Self {
        Self {
            alphabet,
            motion: Command::Stop,
            speed,
            last_rx: now,
            timeout,
        }
    }

    pub fn motion(&self) -> Command {
        self.motion
    }

    pub fn speed(&self) -> u16 {
        self.speed.value()
    }

    /// Apply one received byte. Any datagram, even an unknown one, counts
    /// as a sign of life for the auto-stop.
    pub fn receive(&mut self, code: u8, now: Instant) -> Result<Command, CodecError> {
        self.last_rx = now;
        let cmd = self.alphabet.decode(code)?;
        match cmd {
            Command::SpeedUp => {
                self.speed.apply(SpeedChange::Up);
            }
            Command::SpeedDown => {
                self.speed.apply(SpeedChange::Down);
            }
            motion => self.motion = motion,
        }
        Ok(cmd)
    }

    /// Stop if moving and nothing arrived for longer than the timeout.
    /// Returns true only on the tick that performs the stop.
    pub fn check_timeout(&mut self, now: Instant) -> bool {
        if self.motion != Command::Stop
            && now.saturating_duration_since(self.last_rx) > self.timeout
        {
            self.motion = Command::Stop;
            return true;
        }
        false
    }
}

/// Receive at most one datagram and apply it, then run the auto-stop check.
fn step(
    socket: &UdpSocket,
    vehicle: &mut Vehicle,
    stats: &mut Stats,
    buf: &mut [u8],
) -> Result<()> {
    match socket.recv_from(buf) {
        Ok((0, _)) => {}
        Ok((n, from)) => {
            stats.add_bytes(n);
            match vehicle.receive(buf[0], Instant::now()) {
                Ok(cmd) if cmd.is_motion() => {
                    stats.inc_received();
                    info!("{} from {}", cmd, from);
                }
                Ok(cmd) => {
                    stats.inc_received();
                    info!("{} from {} [speed {}]", cmd, from, vehicle.speed());
                }
                Err(e) => {
                    stats.inc_unknown();
                    debug!("ignoring datagram from {}: {}", from, e);
                }
            }
        }
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
        // ICMP port-unreachable from an earlier reply surfaces here on some platforms
        Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {
            warn!("udp receive: {}", e);
        }
        Err(e) => return Err(e).context("udp receive"),
    }

    if vehicle.check_timeout(Instant::now()) {
        stats.inc_timeouts();
        info!("[TIMEOUT - STOPPED]");
    }
    Ok(())
}

pub fn run(opts: ListenOpts) -> Result<()> {
    let speed = opts.speed.resolve(400)?;
    let timeout = non_zero_ms(opts.timeout_ms, "timeout")?;
    let socket = UdpSocket::bind((opts.bind, opts.port))
        .with_context(|| format!("bind {}:{}", opts.bind, opts.port))?;
    socket
        .set_read_timeout(Some(POLL))
        .context("set udp read timeout")?;

    info!(
        "listening on {} alphabet={:?} timeout={:?} speed={} [{}..{}]",
        socket.local_addr()?,
        opts.alphabet,
        timeout,
        speed.value(),
        speed.bounds().min,
        speed.bounds().max
    );

    let mut vehicle = Vehicle::new(opts.alphabet, speed, timeout, Instant::now());
    let mut stats = Stats::new();
    let mut buf = [0u8; 255];

    loop {
        step(&socket, &mut vehicle, &mut stats, &mut buf)?;
        stats.maybe_print(opts.stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speed::SpeedBounds;
    use std::net::Ipv4Addr;

    fn vehicle(now: Instant) -> Vehicle {
        let speed = Speed::new(512, SpeedBounds::new(400, 1023, 100).unwrap()).unwrap();
        Vehicle::new(Alphabet::Standard, speed, Duration::from_millis(300), now)
    }

    #[test]
    fn decodes_motion_and_speed() {
        let t0 = Instant::now();
        let mut v = vehicle(t0);
        assert_eq!(v.receive(b'Y', t0).unwrap(), Command::UpperRight);
        assert_eq!(v.motion(), Command::UpperRight);
        v.receive(b'-', t0).unwrap();
        v.receive(b'-', t0).unwrap();
        assert_eq!(v.speed(), 400);
        // speed steps leave the motion alone
        assert_eq!(v.motion(), Command::UpperRight);
        for _ in 0..8 {
            v.receive(b'+', t0).unwrap();
        }
        assert_eq!(v.speed(), 1023);
    }

    #[test]
    fn unknown_byte_ignored() {
        let t0 = Instant::now();
        let mut v = vehicle(t0);
        v.receive(b'F', t0).unwrap();
        assert!(matches!(
            v.receive(b'Z', t0),
            Err(CodecError::Unknown(b'Z', Alphabet::Standard))
        ));
        assert_eq!(v.motion(), Command::Forward);
    }

    #[test]
    fn legacy_receiver_reads_b_and_r_as_cardinals() {
        let t0 = Instant::now();
        let speed = Speed::new(512, SpeedBounds::new(400, 1023, 100).unwrap()).unwrap();
        let mut v = Vehicle::new(Alphabet::Legacy, speed, Duration::from_millis(300), t0);
        assert_eq!(v.receive(b'R', t0).unwrap(), Command::Right);
        assert_eq!(v.receive(b'B', t0).unwrap(), Command::Backward);
        assert!(v.receive(b'Y', t0).is_err());
        assert_eq!(v.motion(), Command::Backward);
    }

    #[test]
    fn silence_stops_once() {
        let t0 = Instant::now();
        let mut v = vehicle(t0);
        v.receive(b'K', t0).unwrap();
        assert!(!v.check_timeout(t0 + Duration::from_millis(300)));
        assert!(v.check_timeout(t0 + Duration::from_millis(301)));
        assert_eq!(v.motion(), Command::Stop);
        assert!(!v.check_timeout(t0 + Duration::from_secs(2)));
    }

    #[test]
    fn keepalive_prevents_stop() {
        let t0 = Instant::now();
        let mut v = vehicle(t0);
        for i in 0..10 {
            let now = t0 + Duration::from_millis(50 * i);
            v.receive(b'F', now).unwrap();
            assert!(!v.check_timeout(now + Duration::from_millis(50)));
        }
        assert_eq!(v.motion(), Command::Forward);
    }

    #[test]
    fn step_reads_from_socket() {
        let rx = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        rx.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let tx = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        tx.send_to(b"C", rx.local_addr().unwrap()).unwrap();
        tx.send_to(b"?", rx.local_addr().unwrap()).unwrap();

        let mut v = vehicle(Instant::now());
        let mut stats = Stats::new();
        let mut buf = [0u8; 255];
        step(&rx, &mut v, &mut stats, &mut buf).unwrap();
        assert_eq!(v.motion(), Command::DownLeft);
        step(&rx, &mut v, &mut stats, &mut buf).unwrap();
        assert_eq!(v.motion(), Command::DownLeft);
        assert_eq!((stats.received, stats.unknown, stats.bytes), (1, 1, 2));
    }
}
