//! Interactive counter driven by the engine.
//!
//! Reads one command per line from stdin and prints every published state.
//! Deferred commands run on a local executor that is polled after each line,
//! so `later` and `fail` show up as a separate state after the immediate one.
//!
//! # Usage
//!
//! ```text
//! elmloop [config.toml]
//! ```
//!
//! # Commands
//!
//! - `inc` / `dec`: Change the counter by one
//! - `twice`: Increment twice through a batch command
//! - `set N`: Set the counter
//! - `later N`: Set the counter once a deferred command resolves
//! - `fail`: Start a deferred command that fails
//! - `quit`: Stop the engine and exit

#![allow(clippy::multiple_crate_versions)]

use elmloop::observability::init_tracing;
use elmloop::{Config, Engine, PendingMessage, StreamStatus, UpdateLogic, UpdateResult};
use futures::executor::LocalPool;
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, Default)]
struct Counter {
    value: i64,
    last_error: Option<String>,
}

#[derive(Debug)]
enum Msg {
    Inc,
    Dec,
    Twice,
    Set(i64),
    Later(i64),
    Fail,
    Failed(String),
}

fn update(counter: &Counter, msg: Msg) -> UpdateResult<Counter, Msg> {
    match msg {
        Msg::Inc => Counter {
            value: counter.value + 1,
            ..counter.clone()
        }
        .into(),
        Msg::Dec => Counter {
            value: counter.value - 1,
            ..counter.clone()
        }
        .into(),
        Msg::Twice => UpdateResult::with_messages(counter.clone(), [Msg::Inc, Msg::Inc]),
        Msg::Set(value) => Counter {
            value,
            last_error: None,
        }
        .into(),
        Msg::Later(value) => UpdateResult::with_pending(
            counter.clone(),
            PendingMessage::new(async move { Msg::Set(value) }),
        ),
        Msg::Fail => UpdateResult::with_pending(
            counter.clone(),
            PendingMessage::failed("requested failure"),
        ),
        Msg::Failed(reason) => Counter {
            last_error: Some(reason),
            ..counter.clone()
        }
        .into(),
    }
}

fn parse(line: &str) -> Option<Msg> {
    let mut words = line.split_whitespace();
    let command = words.next()?;
    let number: Option<i64> = words.next().and_then(|n| n.parse().ok());
    match command {
        "inc" => Some(Msg::Inc),
        "dec" => Some(Msg::Dec),
        "twice" => Some(Msg::Twice),
        "set" => number.map(Msg::Set),
        "later" => number.map(Msg::Later),
        "fail" => Some(Msg::Fail),
        _ => None,
    }
}

fn main() -> elmloop::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    init_tracing(&config);

    let mut pool = LocalPool::new();
    let engine: Engine<Counter, Msg> = Engine::builder(Counter::default(), UpdateLogic::from_fn(update))
        .configure(&config)
        .spawner(pool.spawner())
        .on_pending_error(|err| Some(Msg::Failed(err.reason().to_string())))
        .begin();

    let _subscription = engine.states().subscribe(|counter: &Counter| match &counter.last_error {
        Some(reason) => println!("value = {} (last error: {reason})", counter.value),
        None => println!("value = {}", counter.value),
    });

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line == "quit" {
            break;
        }
        match parse(line) {
            Some(msg) => engine.send(msg),
            None if line.is_empty() => {}
            None => {
                eprintln!("unknown command: {line}");
                io::stderr().flush()?;
            }
        }
        pool.run_until_stalled();
        if engine.states().status() != StreamStatus::Active {
            break;
        }
    }

    engine.stop();
    tracing::info!(turns = engine.turns(), "engine stopped");
    Ok(())
}
