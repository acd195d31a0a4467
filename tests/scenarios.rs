//! End-to-end engine scenarios through the public API.

use elmloop::{
    Engine, EngineError, EngineStatus, MessageTag, Observer, PatternTable, PendingMessage,
    StateStream, StreamStatus, UpdateLogic, UpdateResult,
};
use futures::channel::oneshot;
use futures::executor::LocalPool;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Default, PartialEq)]
struct Model {
    a: i64,
    b: String,
    c: bool,
}

fn model(a: i64, b: &str, c: bool) -> Model {
    Model {
        a,
        b: b.to_string(),
        c,
    }
}

#[derive(Debug)]
enum Msg {
    SetA(i64),
    SetB(String),
    SetC(bool),
    Broken(String),
    Unhandled,
}

impl MessageTag for Msg {
    fn tag(&self) -> &'static str {
        match self {
            Self::SetA(_) => "SetA",
            Self::SetB(_) => "SetB",
            Self::SetC(_) => "SetC",
            Self::Broken(_) => "Broken",
            Self::Unhandled => "Unhandled",
        }
    }
}

#[derive(Debug, Default)]
struct Log {
    states: Vec<Model>,
    completed: bool,
    completions: usize,
    error: Option<String>,
}

struct Recorder(Rc<RefCell<Log>>);

impl Observer<Model> for Recorder {
    fn next(&mut self, state: &Model) {
        self.0.borrow_mut().states.push(state.clone());
    }

    fn complete(&mut self) {
        let mut log = self.0.borrow_mut();
        log.completed = true;
        log.completions += 1;
    }

    fn error(&mut self, error: &EngineError) {
        self.0.borrow_mut().error = Some(error.to_string());
    }
}

fn record(stream: &StateStream<Model>) -> Rc<RefCell<Log>> {
    let log = Rc::new(RefCell::new(Log::default()));
    stream.subscribe(Recorder(Rc::clone(&log)));
    log
}

type Gate = Rc<RefCell<Option<oneshot::Receiver<()>>>>;

/// `SetC` waits on `gate` (when armed) before producing `SetB("promise")`.
fn update(gate: Gate) -> impl FnMut(&Model, Msg) -> UpdateResult<Model, Msg> {
    move |model: &Model, msg| match msg {
        Msg::SetA(a) => Model { a, ..model.clone() }.into(),
        Msg::SetB(b) => match b.parse() {
            Ok(n) => UpdateResult::with_message(Model { b, ..model.clone() }, Msg::SetA(n)),
            Err(_) => Model { b, ..model.clone() }.into(),
        },
        Msg::SetC(c) => {
            let next = Model { c, ..model.clone() };
            let pending = match gate.borrow_mut().take() {
                Some(rx) => PendingMessage::fallible(async move {
                    rx.await.map(|()| Msg::SetB("promise".to_string()))
                }),
                None => PendingMessage::ready(Msg::SetB("promise".to_string())),
            };
            UpdateResult::with_pending(next, pending)
        }
        Msg::Broken(reason) => UpdateResult::with_pending(model.clone(), PendingMessage::failed(reason)),
        Msg::Unhandled => model.clone().into(),
    }
}

fn engine_with_pool(gate: Gate) -> (Engine<Model, Msg>, LocalPool) {
    let pool = LocalPool::new();
    let engine = Engine::builder(Model::default(), UpdateLogic::from_fn(update(gate)))
        .spawner(pool.spawner())
        .begin();
    (engine, pool)
}

#[test]
fn plain_update_publishes_new_state() {
    let engine = Engine::begin(Model::default(), UpdateLogic::from_fn(update(Gate::default())), false);
    let log = record(&engine.states());

    engine.send(Msg::SetA(5));

    assert_eq!(log.borrow().states, vec![model(0, "", false), model(5, "", false)]);
}

#[test]
fn sync_command_runs_right_after_its_state() {
    let engine = Engine::begin(Model::default(), UpdateLogic::from_fn(update(Gate::default())), false);
    let log = record(&engine.states());

    engine.send(Msg::SetB("7".to_string()));

    assert_eq!(
        log.borrow().states,
        vec![model(0, "", false), model(0, "7", false), model(7, "7", false)]
    );
    assert_eq!(engine.turns(), 2);
}

#[test]
fn deferred_command_publishes_after_resolution() {
    let (tx, rx) = oneshot::channel();
    let gate: Gate = Rc::new(RefCell::new(Some(rx)));
    let (engine, mut pool) = engine_with_pool(gate);
    let log = record(&engine.states());

    engine.send(Msg::SetC(true));
    assert_eq!(log.borrow().states, vec![model(0, "", false), model(0, "", true)]);

    pool.run_until_stalled();
    assert_eq!(log.borrow().states.len(), 2);

    tx.send(()).unwrap();
    pool.run_until_stalled();
    assert_eq!(
        log.borrow().states,
        vec![model(0, "", false), model(0, "", true), model(0, "promise", true)]
    );
}

#[test]
fn unmatched_pattern_fails_engine() {
    let table = PatternTable::<Model, Msg>::new()
        .case_tag("SetA", |model, msg| match msg {
            Msg::SetA(a) => Model { a, ..model.clone() }.into(),
            _ => model.clone().into(),
        })
        .case_of(
            |msg| match msg {
                Msg::SetB(b) => Ok(b),
                other => Err(other),
            },
            |model, b| Model { b, ..model.clone() }.into(),
        );
    let engine = Engine::begin(Model::default(), table, false);
    let log = record(&engine.states());

    engine.send(Msg::SetA(1));
    engine.send(Msg::Unhandled);
    engine.send(Msg::SetA(2));

    let log = log.borrow();
    assert_eq!(log.states, vec![model(0, "", false), model(1, "", false)]);
    assert!(log.error.as_deref().is_some_and(|e| e.contains("Unhandled")));
    assert!(!log.completed);
    assert_eq!(engine.status(), EngineStatus::Failed);
    assert_eq!(engine.states().status(), StreamStatus::Errored);
    assert!(matches!(
        engine.states().failure().as_deref(),
        Some(EngineError::UnmatchedMessage { .. })
    ));
}

#[test]
fn published_states_follow_left_fold() {
    let messages = || {
        vec![
            Msg::SetA(3),
            Msg::SetB("x".to_string()),
            Msg::SetA(-1),
            Msg::SetB("y".to_string()),
        ]
    };
    let engine = Engine::begin(Model::default(), UpdateLogic::from_fn(update(Gate::default())), false);
    let log = record(&engine.states());
    for msg in messages() {
        engine.send(msg);
    }

    let mut reducer = update(Gate::default());
    let mut expected = vec![Model::default()];
    for msg in messages() {
        let (state, _) = reducer(expected.last().unwrap(), msg).into_parts();
        expected.push(state);
    }
    assert_eq!(log.borrow().states, expected);
}

#[test]
fn late_subscriber_gets_latest_state() {
    let engine = Engine::begin(Model::default(), UpdateLogic::from_fn(update(Gate::default())), false);
    engine.send(Msg::SetA(4));
    engine.send(Msg::SetB("late".to_string()));

    let log = record(&engine.states());

    assert_eq!(log.borrow().states, vec![model(4, "late", false)]);
}

#[test]
fn stop_silences_sends_and_pending_results() {
    let (tx, rx) = oneshot::channel();
    let gate: Gate = Rc::new(RefCell::new(Some(rx)));
    let (engine, mut pool) = engine_with_pool(gate);
    let log = record(&engine.states());

    engine.send(Msg::SetC(true));
    engine.stop();
    engine.send(Msg::SetA(9));
    tx.send(()).unwrap();
    pool.run_until_stalled();

    let log = log.borrow();
    assert_eq!(log.states, vec![model(0, "", false), model(0, "", true)]);
    assert!(log.completed);
    assert_eq!(engine.status(), EngineStatus::Stopped);
    assert_eq!(*engine.model(), model(0, "", true));
}

#[test]
fn subscribe_after_stop_only_completes() {
    let engine = Engine::begin(Model::default(), UpdateLogic::from_fn(update(Gate::default())), false);
    engine.stop();

    let log = Rc::new(RefCell::new(Log::default()));
    let subscription = engine.states().subscribe(Recorder(Rc::clone(&log)));

    assert!(log.borrow().states.is_empty());
    assert!(log.borrow().completed);
    assert!(!subscription.is_active());
}

#[test]
fn failed_pending_is_dropped_by_default() {
    let (engine, mut pool) = engine_with_pool(Gate::default());
    let log = record(&engine.states());

    engine.send(Msg::Broken("offline".to_string()));
    pool.run_until_stalled();
    engine.send(Msg::SetA(1));

    assert_eq!(engine.status(), EngineStatus::Running);
    assert_eq!(
        log.borrow().states,
        vec![model(0, "", false), model(0, "", false), model(1, "", false)]
    );
}

#[test]
fn failed_pending_maps_through_handler() {
    let mut pool = LocalPool::new();
    let engine = Engine::builder(Model::default(), UpdateLogic::from_fn(update(Gate::default())))
        .spawner(pool.spawner())
        .on_pending_error(|err| Some(Msg::SetB(format!("error: {}", err.reason()))))
        .begin();

    engine.send(Msg::Broken("offline".to_string()));
    assert_eq!(engine.model().b, "");

    pool.run_until_stalled();
    assert_eq!(engine.model().b, "error: offline");
}

#[test]
fn unsubscribed_observer_stops_receiving() {
    let engine = Engine::begin(Model::default(), UpdateLogic::from_fn(update(Gate::default())), false);
    let log = Rc::new(RefCell::new(Log::default()));
    let subscription = engine.states().subscribe(Recorder(Rc::clone(&log)));

    engine.send(Msg::SetA(1));
    assert!(subscription.unsubscribe());
    engine.send(Msg::SetA(2));

    assert_eq!(log.borrow().states, vec![model(0, "", false), model(1, "", false)]);
    assert_eq!(engine.model().a, 2);
}

#[test]
fn reducer_error_fails_engine() {
    let logic = UpdateLogic::try_from_fn(|model: &Model, msg: Msg| match msg {
        Msg::SetA(a) if a < 0 => Err(EngineError::reducer(format!("negative a: {a}"))),
        Msg::SetA(a) => Ok(Model { a, ..model.clone() }.into()),
        _ => Ok(model.clone().into()),
    });
    let engine = Engine::begin(Model::default(), logic, false);
    let log = record(&engine.states());

    engine.send(Msg::SetA(2));
    engine.send(Msg::SetA(-1));
    engine.send(Msg::SetA(3));

    let log = log.borrow();
    assert_eq!(log.states, vec![model(0, "", false), model(2, "", false)]);
    assert_eq!(log.error.as_deref(), Some("Reducer error: negative a: -1"));
    assert!(!log.completed);
    assert_eq!(engine.status(), EngineStatus::Failed);
    assert!(matches!(
        engine.states().failure().as_deref(),
        Some(EngineError::Reducer(_))
    ));
    assert_eq!(*engine.model(), model(2, "", false));
}

#[test]
fn stop_twice_completes_once() {
    let engine = Engine::begin(Model::default(), UpdateLogic::from_fn(update(Gate::default())), false);
    let log = record(&engine.states());

    engine.send(Msg::SetA(1));
    engine.stop();
    engine.stop();

    let log = log.borrow();
    assert_eq!(log.completions, 1);
    assert!(log.error.is_none());
    assert_eq!(log.states, vec![model(0, "", false), model(1, "", false)]);
    assert_eq!(engine.status(), EngineStatus::Stopped);
    assert_eq!(engine.states().status(), StreamStatus::Completed);
}

#[test]
fn send_during_replay_keeps_command_order() {
    let engine = Engine::begin(Model::default(), UpdateLogic::from_fn(update(Gate::default())), false);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let watched = engine.clone();
    engine
        .states()
        .subscribe(move |state: &Model| sink.borrow_mut().push((state.a, watched.model().a)));

    let handle = engine.clone();
    let mut fired = false;
    engine.states().subscribe(move |_: &Model| {
        if !std::mem::replace(&mut fired, true) {
            handle.send(Msg::SetB("7".to_string()));
        }
    });

    assert_eq!(*seen.borrow(), vec![(0, 0), (0, 0), (7, 7)]);
    assert_eq!(*engine.model(), model(7, "7", false));
}
