use anyhow::{Context, Result};
use crossterm::cursor::MoveToColumn;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{execute, queue};
use log::info;
use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

use crate::drive::Frontend;
use crate::input::{InputEvent, KeyState};
use crate::state::DriveState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

/// Arrow key or its WASD twin. Tracked apart so releasing one does not
/// drop the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Arrow = 0,
    Letter = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mapped {
    Held(Direction, Source),
    Edge(InputEvent),
}

fn map_key(key: &KeyEvent) -> Option<Mapped> {
    use Direction::*;
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c' | 'C'))
            .then_some(Mapped::Edge(InputEvent::Quit));
    }
    let mapped = match key.code {
        KeyCode::Up => Mapped::Held(Up, Source::Arrow),
        KeyCode::Down => Mapped::Held(Down, Source::Arrow),
        KeyCode::Left => Mapped::Held(Left, Source::Arrow),
        KeyCode::Right => Mapped::Held(Right, Source::Arrow),
        KeyCode::Esc => Mapped::Edge(InputEvent::Quit),
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'w' => Mapped::Held(Up, Source::Letter),
            's' => Mapped::Held(Down, Source::Letter),
            'a' => Mapped::Held(Left, Source::Letter),
            'd' => Mapped::Held(Right, Source::Letter),
            '+' | '=' => Mapped::Edge(InputEvent::SpeedUp),
            '-' | '_' => Mapped::Edge(InputEvent::SpeedDown),
            'q' => Mapped::Edge(InputEvent::Quit),
            _ => return None,
        },
        _ => return None,
    };
    Some(mapped)
}

/// Turns a stream of key events into held-key state plus press edges.
///
/// When the terminal reports releases a key is held from press to release.
/// Otherwise it is held until `hold` has passed since its last press or
/// autorepeat, and autorepeat arrives as plain presses, so an edge key
/// pressed again within `hold` of its previous press is a repeat and
/// produces no event.
#[derive(Debug)]
struct Keyboard {
    seen: [[Option<Instant>; 2]; 4],
    /// Last press of each edge key, indexed by `edge_slot`.
    last_edge: [Option<Instant>; 3],
    releases: bool,
    hold: Duration,
    pending: Vec<InputEvent>,
}

impl Keyboard {
    fn new(hold: Duration, releases: bool) -> Self {
        Self {
            seen: [[None; 2]; 4],
            last_edge: [None; 3],
            releases,
            hold,
            pending: Vec::new(),
        }
    }

    fn handle(&mut self, key: &KeyEvent, now: Instant) {
        let Some(mapped) = map_key(key) else {
            return;
        };
        match (mapped, key.kind) {
            (Mapped::Held(dir, src), KeyEventKind::Press | KeyEventKind::Repeat) => {
                self.seen[dir as usize][src as usize] = Some(now);
            }
            (Mapped::Held(dir, src), KeyEventKind::Release) => {
                self.seen[dir as usize][src as usize] = None;
            }
            (Mapped::Edge(ev), KeyEventKind::Press) if self.releases => self.pending.push(ev),
            (Mapped::Edge(ev), KeyEventKind::Press) => {
                let last = self.last_edge[edge_slot(ev)].replace(now);
                if !last.is_some_and(|t| now.saturating_duration_since(t) < self.hold) {
                    self.pending.push(ev);
                }
            }
            (Mapped::Edge(_), _) => {}
        }
    }

    fn take_events(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.pending)
    }

    fn held(&self, dir: Direction, now: Instant) -> bool {
        self.seen[dir as usize].iter().flatten().any(|&t| {
            self.releases || now.saturating_duration_since(t) < self.hold
        })
    }

    fn snapshot(&self, now: Instant) -> KeyState {
        KeyState {
            up: self.held(Direction::Up, now),
            down: self.held(Direction::Down, now),
            left: self.held(Direction::Left, now),
            right: self.held(Direction::Right, now),
        }
    }
}

fn edge_slot(ev: InputEvent) -> usize {
    match ev {
        InputEvent::Quit => 0,
        InputEvent::SpeedUp => 1,
        InputEvent::SpeedDown => 2,
    }
}

/// One-line text status, newest history entry last.
pub fn status_line(state: &DriveState) -> String {
    format!(
        "CMD: {:<11} | Speed: {}/{} | Status: {} | Packets: {} | Last: {}",
        state.command.name(),
        state.speed.value(),
        state.speed.bounds().max,
        state.status,
        state.packets,
        state.history.latest().unwrap_or("-"),
    )
}

/// Raw-mode terminal front end. Restores the terminal on drop.
pub struct Terminal {
    out: Stdout,
    enhanced: bool,
    keyboard: Keyboard,
}

impl Terminal {
    pub fn open(hold: Duration) -> Result<Self> {
        terminal::enable_raw_mode().context("enable raw mode")?;
        let mut term = Terminal {
            out: io::stdout(),
            enhanced: false,
            keyboard: Keyboard::new(hold, false),
        };
        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                term.out,
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                )
            )
            .context("enable key release reporting")?;
            term.enhanced = true;
            term.keyboard.releases = true;
        } else {
            info!("no key release events; keys stay held {hold:?} after the last repeat");
        }
        Ok(term)
    }
}

impl Frontend for Terminal {
    fn poll(&mut self) -> Result<Vec<InputEvent>> {
        while event::poll(Duration::ZERO).context("poll terminal events")? {
            if let Event::Key(key) = event::read().context("read terminal event")? {
                self.keyboard.handle(&key, Instant::now());
            }
        }
        Ok(self.keyboard.take_events())
    }

    fn snapshot(&self) -> KeyState {
        self.keyboard.snapshot(Instant::now())
    }

    fn present(&mut self, state: &DriveState) -> Result<()> {
        let cols = terminal::size().map(|(c, _)| c as usize).unwrap_or(80);
        let line: String = status_line(state).chars().take(cols.saturating_sub(1)).collect();
        queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line)
        )?;
        self.out.flush()?;
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.enhanced {
            let _ = execute!(self.out, PopKeyboardEnhancementFlags);
        }
        let _ = terminal::disable_raw_mode();
        let _ = execute!(self.out, Print("\r\n"));
    }
}
