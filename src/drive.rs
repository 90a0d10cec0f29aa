use anyhow::{Context, Result};
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::cli::{DriveOpts, Profile};
use crate::dispatch::Dispatcher;
use crate::input::{InputEvent, KeyState, classify};
use crate::link::{Transport, UdpLink};
use crate::pacing::Ticker;
use crate::speed::SpeedChange;
use crate::state::DriveState;
use crate::term::Terminal;

/// The presentation side of the loop: where key state comes from and where
/// status goes.
pub trait Frontend {
    /// Drain press edges that arrived since the last tick.
    fn poll(&mut self) -> Result<Vec<InputEvent>>;
    /// Keys held right now.
    fn snapshot(&self) -> KeyState;
    /// Show this tick's state.
    fn present(&mut self, state: &DriveState) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Classifier plus dispatcher, advanced one tick at a time.
pub struct Session<T: Transport> {
    dispatcher: Dispatcher<T>,
    diagonals: bool,
}

impl<T: Transport> Session<T> {
    pub fn new(dispatcher: Dispatcher<T>, diagonals: bool) -> Self {
        Self {
            dispatcher,
            diagonals,
        }
    }

    pub fn state(&self) -> &DriveState {
        self.dispatcher.state()
    }

    /// Speed presses are handled before the motion command; a quit skips
    /// the motion command since the final STOP follows.
    pub fn tick(&mut self, events: &[InputEvent], keys: KeyState) -> Flow {
        let mut flow = Flow::Continue;
        for event in events {
            match event {
                InputEvent::Quit => flow = Flow::Quit,
                InputEvent::SpeedUp => {
                    self.dispatcher.adjust_speed(SpeedChange::Up);
                }
                InputEvent::SpeedDown => {
                    self.dispatcher.adjust_speed(SpeedChange::Down);
                }
            }
        }
        if flow == Flow::Quit {
            return flow;
        }
        self.dispatcher.dispatch_motion(classify(keys, self.diagonals));
        Flow::Continue
    }

    /// Final STOP, then hand back the transport so the caller can drop it.
    pub fn finish(mut self) -> (DriveState, T) {
        if !self.dispatcher.stop() {
            warn!("final STOP could not be sent: {}", self.state().status);
        }
        let state = self.dispatcher.state().clone();
        (state, self.dispatcher.into_transport())
    }
}

/// Run ticks until the front end asks to quit or fails, or `terminate` is
/// raised. The flag is checked once per tick.
pub fn drive_loop<T: Transport, F: Frontend>(
    session: &mut Session<T>,
    frontend: &mut F,
    ticker: &mut Ticker,
    terminate: &AtomicBool,
) -> Result<()> {
    loop {
        if terminate.load(Ordering::Relaxed) {
            info!("termination signal received");
            return Ok(());
        }
        let events = frontend.poll()?;
        let flow = session.tick(&events, frontend.snapshot());
        frontend.present(session.state())?;
        if flow == Flow::Quit {
            return Ok(());
        }
        ticker.wait();
    }
}

/// Raise `flag` on SIGTERM, SIGINT, SIGQUIT and, on unix, SIGHUP.
fn watch_termination(flag: &Arc<AtomicBool>) -> Result<()> {
    for &sig in signal_hook::consts::TERM_SIGNALS {
        signal_hook::flag::register(sig, Arc::clone(flag))
            .with_context(|| format!("install handler for signal {sig}"))?;
    }
    #[cfg(unix)]
    signal_hook::flag::register(signal_hook::consts::SIGHUP, Arc::clone(flag))
        .context("install SIGHUP handler")?;
    Ok(())
}

pub fn run(opts: DriveOpts) -> Result<()> {
    let profile = Profile::from_cli(&opts)?;
    let speed = opts.speed.resolve(200)?;
    let link = UdpLink::open(opts.peer(), profile.send_timeout)
        .with_context(|| format!("opening link to {}", opts.peer()))?;

    info!(
        "target={} variant={:?} policy={:?} rate={}/s speed={} [{}..{}]",
        link.peer(),
        opts.variant,
        profile.policy,
        profile.rate,
        speed.value(),
        speed.bounds().min,
        speed.bounds().max
    );
    info!("W/Up forward  S/Down backward  A/Left left  D/Right right  +/- speed  Esc/q quit");

    let dispatcher = Dispatcher::new(
        link,
        profile.alphabet,
        profile.policy,
        DriveState::new(speed, profile.history),
    );
    let mut session = Session::new(dispatcher, profile.diagonals);
    let mut ticker = Ticker::new(profile.tick_period());
    let terminate = Arc::new(AtomicBool::new(false));

    let result = match watch_termination(&terminate).and_then(|()| Terminal::open(profile.hold)) {
        Ok(mut term) => drive_loop(&mut session, &mut term, &mut ticker, &terminate),
        Err(e) => Err(e),
    };

    // STOP goes out even when the loop failed, before the socket closes.
    let (state, link) = session.finish();
    drop(link);
    if !state.history.is_empty() {
        let entries: Vec<&str> = state.history.iter().collect();
        info!("last {} commands: {}", state.history.len(), entries.join(", "));
    }
    info!("controller stopped, packets={}", state.packets);
    result
}
