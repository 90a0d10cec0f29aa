use anyhow::Result;
use clap::Parser;
use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use std::io::{self, IsTerminal, Write};

mod cli;
mod dispatch;
mod drive;
mod input;
mod link;
mod listen;
mod pacing;
mod proto;
mod speed;
mod state;
mod stats;
mod term;

fn init_logging() {
    let tty = io::stderr().is_terminal();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(move |buf, record| {
            // wipe the status line first; CR before LF for raw mode
            if tty {
                queue!(buf, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
            }
            writeln!(buf, "[{:<5}] {}\r", record.level(), record.args())
        })
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let args = cli::Cli::parse();
    match args.cmd {
        cli::Cmd::Drive(opts) => drive::run(opts),
        cli::Cmd::Listen(opts) => listen::run(opts),
    }
}
