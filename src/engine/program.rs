//! Engine lifecycle and command dispatch.
//!
//! [`Engine`] owns one message channel, one accumulator and one publisher.
//! Every injected message runs a processing turn:
//!
//! 1. The inspector (debug mode) sees the message
//! 2. The accumulator folds it over the current state
//! 3. The inspector sees the [`UpdateResult`](crate::UpdateResult)
//! 4. The state component is published to every observer
//! 5. The command component is dispatched
//!
//! Synchronous commands go to the front of the inbox and run as the very next
//! turn. Deferred commands are spawned on the configured local executor and
//! come back through [`Engine::send`] as a fresh turn, unless the engine
//! stopped in the meantime.
//!
//! # Failure
//!
//! An unmatched message, a reducer error or a spawn failure is fatal: the
//! inbox is discarded, observers receive the error signal, and every later
//! `send` is a logged no-op. Nothing is retried.

use super::channel::MessageChannel;
use super::dispatch::{Accumulator, UpdateLogic};
use super::inspect::{Inspector, TracingInspector};
use super::pending::PendingMessage;
use super::publisher::{StatePublisher, StateStream, StreamStatus};
use super::update::Command;
use crate::domain::{EngineError, PendingError};
use crate::Config;
use futures_util::task::{LocalFutureObj, LocalSpawn};
use futures_util::FutureExt;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

type PendingErrorHandler<M> = Box<dyn Fn(&PendingError) -> Option<M>>;

/// Lifecycle of an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// Accepting and processing messages.
    Running,
    /// [`Engine::stop`] was called.
    Stopped,
    /// A fatal error ended processing.
    Failed,
}

/// Configures and starts an [`Engine`].
///
/// # Example
///
/// ```rust
/// use elmloop::{EngineBuilder, UpdateLogic, UpdateResult};
/// use futures::executor::LocalPool;
///
/// #[derive(Debug)]
/// enum Msg { Add(i32) }
///
/// let mut pool = LocalPool::new();
/// let engine = EngineBuilder::new(0, UpdateLogic::from_fn(|s: &i32, Msg::Add(n)| (s + n).into()))
///     .spawner(pool.spawner())
///     .on_pending_error(|_| None)
///     .begin();
///
/// engine.send(Msg::Add(2));
/// pool.run_until_stalled();
/// assert_eq!(*engine.model(), 2);
/// ```
pub struct EngineBuilder<S, M> {
    /// State published before any message is processed.
    initial: S,
    /// Update logic handed to the accumulator.
    logic: UpdateLogic<S, M>,
    /// Custom inspector; takes precedence over debug mode.
    inspector: Option<Box<dyn Inspector<S, M>>>,
    /// Installs [`TracingInspector`] when no custom inspector is set.
    debug: bool,
    /// Executor for deferred commands.
    spawner: Option<Rc<dyn LocalSpawn>>,
    /// Maps failed deferred commands to messages.
    on_pending_error: Option<PendingErrorHandler<M>>,
}

impl<S: fmt::Debug + 'static, M: fmt::Debug + 'static> EngineBuilder<S, M> {
    /// Starts a builder from the initial state and the update logic.
    pub fn new(initial: S, logic: impl Into<UpdateLogic<S, M>>) -> Self {
        Self {
            initial,
            logic: logic.into(),
            inspector: None,
            debug: false,
            spawner: None,
            on_pending_error: None,
        }
    }

    /// Enables or disables debug mode.
    ///
    /// Debug mode reports through [`TracingInspector`] unless a custom
    /// inspector is installed; it never removes one.
    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Installs a custom inspector, regardless of debug mode.
    #[must_use]
    pub fn inspector(mut self, inspector: impl Inspector<S, M> + 'static) -> Self {
        self.inspector = Some(Box::new(inspector));
        self
    }

    /// Sets the executor that drives deferred commands.
    ///
    /// Without a spawner, the first deferred command fails the engine with
    /// [`EngineError::Spawn`].
    #[must_use]
    pub fn spawner(mut self, spawner: impl LocalSpawn + 'static) -> Self {
        self.spawner = Some(Rc::new(spawner));
        self
    }

    /// Maps a failed deferred command to a message.
    ///
    /// Without a handler, failures are logged at warn level and dropped. A
    /// handler returning `None` drops the failure as well.
    #[must_use]
    pub fn on_pending_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&PendingError) -> Option<M> + 'static,
    {
        self.on_pending_error = Some(Box::new(handler));
        self
    }

    /// Applies the engine-related parts of a [`Config`].
    ///
    /// Only `debug` is engine-related; see [`EngineBuilder::debug`].
    #[must_use]
    pub fn configure(self, config: &Config) -> Self {
        self.debug(config.debug)
    }

    /// Wires the components, seeds the publisher and starts the engine.
    #[must_use]
    pub fn begin(self) -> Engine<S, M> {
        let initial = Rc::new(self.initial);
        let publisher = Rc::new(StatePublisher::new(Rc::clone(&initial)));
        let debug_enabled = self.debug;
        let inspector = self.inspector.or_else(|| {
            debug_enabled.then(|| Box::new(TracingInspector) as Box<dyn Inspector<S, M>>)
        });
        tracing::debug!(
            debug = debug_enabled,
            inspected = inspector.is_some(),
            deferred = self.spawner.is_some(),
            "engine started"
        );
        let inner = Rc::new(Inner {
            channel: MessageChannel::new(),
            accumulator: RefCell::new(Accumulator::new(initial, self.logic)),
            publisher,
            inspector,
            spawner: self.spawner,
            on_pending_error: self.on_pending_error,
            status: Cell::new(EngineStatus::Running),
            turns: Cell::new(0),
        });

        let engine = Rc::downgrade(&inner);
        inner.publisher.on_idle(move || {
            if let Some(inner) = engine.upgrade() {
                inner.drain();
            }
        });
        Engine { inner }
    }
}

/// A running state engine.
///
/// Cloning an engine clones the handle, not the engine: every clone sends
/// into the same channel and observes the same state.
///
/// # Example
///
/// ```rust
/// use elmloop::{Engine, UpdateLogic, UpdateResult};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// #[derive(Debug)]
/// enum Msg { Set(i32), Double }
///
/// let engine = Engine::begin(
///     1,
///     UpdateLogic::from_fn(|s: &i32, msg: Msg| match msg {
///         Msg::Set(n) => UpdateResult::with_message(n, Msg::Double),
///         Msg::Double => (s * 2).into(),
///     }),
///     false,
/// );
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&seen);
/// engine.states().subscribe(move |s: &i32| sink.borrow_mut().push(*s));
///
/// engine.send(Msg::Set(5));
/// assert_eq!(*seen.borrow(), vec![1, 5, 10]);
/// ```
pub struct Engine<S, M> {
    inner: Rc<Inner<S, M>>,
}

struct Inner<S, M> {
    /// Inbox shared by `send` and synchronous commands.
    channel: MessageChannel<M>,
    /// Latest state plus the update logic.
    accumulator: RefCell<Accumulator<S, M>>,
    /// Broadcasts every accepted state.
    publisher: Rc<StatePublisher<S>>,
    inspector: Option<Box<dyn Inspector<S, M>>>,
    spawner: Option<Rc<dyn LocalSpawn>>,
    on_pending_error: Option<PendingErrorHandler<M>>,
    status: Cell<EngineStatus>,
    /// Processing turns run so far.
    turns: Cell<u64>,
}

impl<S: fmt::Debug + 'static, M: fmt::Debug + 'static> Engine<S, M> {
    /// Starts an engine with no deferred-command executor.
    ///
    /// Use [`EngineBuilder`] when the update logic returns
    /// [`UpdateResult::WithPending`](crate::UpdateResult::WithPending).
    pub fn begin(initial: S, logic: impl Into<UpdateLogic<S, M>>, debug: bool) -> Self {
        EngineBuilder::new(initial, logic).debug(debug).begin()
    }

    /// Shorthand for [`EngineBuilder::new`].
    pub fn builder(initial: S, logic: impl Into<UpdateLogic<S, M>>) -> EngineBuilder<S, M> {
        EngineBuilder::new(initial, logic)
    }

    /// Injects a message.
    ///
    /// Processing happens before this returns unless a turn is already
    /// running, in which case the message is queued behind it. After `stop`
    /// or a fatal error this is a no-op.
    pub fn send(&self, message: M) {
        self.inner.send(message);
    }

    /// Stops the engine. Calling it again has no effect.
    ///
    /// Queued messages are discarded, observers are completed, and deferred
    /// commands still in flight resolve into nothing.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Observable handle over the state.
    #[must_use]
    pub fn states(&self) -> StateStream<S> {
        StateStream::new(Rc::clone(&self.inner.publisher))
    }

    /// The latest published state.
    #[must_use]
    pub fn model(&self) -> Rc<S> {
        self.inner.publisher.value()
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        self.inner.status.get()
    }

    /// Number of processing turns run so far.
    #[must_use]
    pub fn turns(&self) -> u64 {
        self.inner.turns.get()
    }
}

impl<S, M> Clone for Engine<S, M> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: fmt::Debug + 'static, M> fmt::Debug for Engine<S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("status", &self.inner.status.get())
            .field("model", &self.inner.publisher.value())
            .field("queued", &self.inner.channel.len())
            .finish_non_exhaustive()
    }
}

impl<S: fmt::Debug + 'static, M: fmt::Debug + 'static> Inner<S, M> {
    fn is_running(&self) -> bool {
        self.status.get() == EngineStatus::Running
    }

    fn send(self: &Rc<Self>, message: M) {
        if !self.is_running() {
            tracing::warn!(status = ?self.status.get(), message = ?message, "engine not running, message dropped");
            return;
        }
        if !self.channel.push_back(message) {
            return;
        }
        if self.publisher.is_delivering() {
            tracing::debug!("observers still being notified, message queued");
            return;
        }
        self.drain();
    }

    fn drain(self: &Rc<Self>) {
        let Some(_draining) = self.channel.begin_drain() else {
            return;
        };
        while let Some(message) = self.channel.pop() {
            self.turn(message);
        }
    }

    fn turn(self: &Rc<Self>, message: M) {
        let turn = self.turns.get() + 1;
        self.turns.set(turn);
        let _span = tracing::debug_span!("turn", turn, message = ?message).entered();

        if let Some(inspector) = &self.inspector {
            inspector.message(&message);
        }

        let folded = self.accumulator.borrow_mut().fold(message);
        let result = match folded {
            Ok(result) => result,
            Err(err) => {
                self.fail(err);
                return;
            }
        };

        if let Some(inspector) = &self.inspector {
            inspector.result(&result);
        }

        let kind = result.kind();
        let (state, command) = result.into_parts();
        let state = self.accumulator.borrow_mut().advance(state);
        if !self.publisher.next(state) {
            tracing::debug!("publisher closed during turn, command skipped");
            return;
        }
        tracing::debug!(?kind, "state published");

        if self.is_running() {
            self.dispatch(command);
        }
    }

    fn dispatch(self: &Rc<Self>, command: Command<M>) {
        match command {
            Command::None => {}
            Command::Immediate(message) => self.channel.push_front(vec![message]),
            Command::Batch(messages) => self.channel.push_front(messages),
            Command::Deferred(pending) => self.defer(pending),
        }
    }

    fn defer(self: &Rc<Self>, pending: PendingMessage<M>) {
        let Some(spawner) = &self.spawner else {
            self.fail(EngineError::Spawn(
                "no spawner configured for deferred commands".to_string(),
            ));
            return;
        };

        let engine = Rc::downgrade(self);
        let continuation = async move {
            let outcome = pending.into_future().await;
            match engine.upgrade() {
                Some(inner) => inner.resolve(outcome),
                None => tracing::debug!("engine dropped before deferred command resolved"),
            }
        };

        if let Err(err) = spawner.spawn_local_obj(LocalFutureObj::new(continuation.boxed_local())) {
            self.fail(EngineError::Spawn(err.to_string()));
        } else {
            tracing::debug!("deferred command spawned");
        }
    }

    fn resolve(self: &Rc<Self>, outcome: Result<M, PendingError>) {
        if !self.is_running() || self.publisher.status() != StreamStatus::Active {
            tracing::debug!("engine not running, deferred command discarded");
            return;
        }
        match outcome {
            Ok(message) => self.send(message),
            Err(err) => {
                let recovered = self
                    .on_pending_error
                    .as_ref()
                    .and_then(|handler| handler(&err));
                match recovered {
                    Some(message) => {
                        tracing::debug!(error = %err, "deferred command failed, mapped to message");
                        self.send(message);
                    }
                    None => {
                        tracing::warn!(error = %err, "deferred command failed, no message injected");
                    }
                }
            }
        }
    }

    fn stop(&self) {
        if !self.is_running() {
            tracing::debug!(status = ?self.status.get(), "engine already stopped");
            return;
        }
        self.status.set(EngineStatus::Stopped);
        let discarded = self.channel.close();
        self.publisher.complete();
        tracing::debug!(discarded, turns = self.turns.get(), "engine stopped");
    }

    fn fail(&self, err: EngineError) {
        tracing::error!(error = %err, "engine failed");
        self.status.set(EngineStatus::Failed);
        let discarded = self.channel.close();
        if discarded > 0 {
            tracing::debug!(discarded, "queued messages discarded");
        }
        self.publisher.fail(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::update::{ResultKind, UpdateResult};

    #[derive(Debug, Clone, PartialEq)]
    enum Msg {
        Add(i32),
        Chain(i32, i32),
        Burst(Vec<i32>),
        Halt,
    }

    fn logic() -> UpdateLogic<i32, Msg> {
        UpdateLogic::from_fn(|s: &i32, msg: Msg| match msg {
            Msg::Add(n) => (s + n).into(),
            Msg::Chain(n, then) => UpdateResult::with_message(s + n, Msg::Add(then)),
            Msg::Burst(ns) => UpdateResult::with_messages(*s, ns.into_iter().map(Msg::Add)),
            Msg::Halt => (*s).into(),
        })
    }

    fn record(engine: &Engine<i32, Msg>) -> Rc<RefCell<Vec<i32>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        engine
            .states()
            .subscribe(move |s: &i32| sink.borrow_mut().push(*s));
        seen
    }

    #[test]
    fn batch_runs_in_order_before_later_sends() {
        let engine = Engine::begin(0, logic(), false);
        let seen = record(&engine);
        engine.send(Msg::Burst(vec![1, 10, 100]));
        engine.send(Msg::Add(1000));
        assert_eq!(*seen.borrow(), vec![0, 0, 1, 11, 111, 1111]);
        assert_eq!(engine.turns(), 5);
    }

    #[test]
    fn observer_send_waits_for_command() {
        let engine = Engine::begin(0, logic(), false);
        let seen = record(&engine);
        let handle = engine.clone();
        let fired = Cell::new(false);
        engine.states().subscribe(move |s: &i32| {
            if *s == 5 && !fired.replace(true) {
                handle.send(Msg::Add(100));
            }
        });
        engine.send(Msg::Chain(5, 1));
        assert_eq!(*seen.borrow(), vec![0, 5, 6, 106]);
    }

    #[test]
    fn stop_from_observer_skips_command() {
        let engine = Engine::begin(0, logic(), false);
        let seen = record(&engine);
        let handle = engine.clone();
        engine.states().subscribe(move |s: &i32| {
            if *s == 5 {
                handle.stop();
            }
        });
        engine.send(Msg::Chain(5, 1));
        assert_eq!(*seen.borrow(), vec![0, 5]);
        assert_eq!(engine.status(), EngineStatus::Stopped);
    }

    #[test]
    fn missing_spawner_is_fatal() {
        let engine = Engine::begin(
            0,
            UpdateLogic::from_fn(|s: &i32, _msg: Msg| {
                UpdateResult::with_pending(*s + 1, PendingMessage::ready(Msg::Halt))
            }),
            false,
        );
        engine.send(Msg::Halt);
        assert_eq!(engine.status(), EngineStatus::Failed);
        assert_eq!(*engine.model(), 1);
        assert!(matches!(
            engine.states().failure().as_deref(),
            Some(EngineError::Spawn(_))
        ));
    }

    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl Inspector<i32, Msg> for Recorder {
        fn message(&self, message: &Msg) {
            self.0.borrow_mut().push(format!("msg {message:?}"));
        }

        fn result(&self, result: &UpdateResult<i32, Msg>) {
            let kind = result.kind();
            let tag = if kind == ResultKind::Bare { "bare" } else { "cmd" };
            self.0
                .borrow_mut()
                .push(format!("{tag} {}", result.state_ref()));
        }
    }

    #[test]
    fn inspector_sees_messages_and_results() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let engine = Engine::builder(0, logic())
            .inspector(Recorder(Rc::clone(&log)))
            .begin();
        engine.send(Msg::Chain(2, 3));
        assert_eq!(
            *log.borrow(),
            vec!["msg Chain(2, 3)", "cmd 2", "msg Add(3)", "bare 5"]
        );
    }

    #[test]
    fn debug_off_keeps_custom_inspector() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let engine = Engine::builder(0, logic())
            .inspector(Recorder(Rc::clone(&log)))
            .configure(&Config::default())
            .begin();
        engine.send(Msg::Add(1));
        assert_eq!(*log.borrow(), vec!["msg Add(1)", "bare 1"]);
        assert_eq!(*engine.model(), 1);
    }

    #[test]
    fn replay_send_reaches_other_observers_before_its_command() {
        let engine = Engine::begin(
            1,
            UpdateLogic::from_fn(|s: &i32, msg: Msg| match msg {
                Msg::Chain(n, _) => UpdateResult::with_message(n, Msg::Halt),
                Msg::Halt => (s * 2).into(),
                _ => (*s).into(),
            }),
            false,
        );
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let watched = engine.clone();
        engine
            .states()
            .subscribe(move |s: &i32| sink.borrow_mut().push((*s, *watched.model())));

        let handle = engine.clone();
        let fired = Cell::new(false);
        engine.states().subscribe(move |_: &i32| {
            if !fired.replace(true) {
                handle.send(Msg::Chain(5, 0));
            }
        });

        assert_eq!(*seen.borrow(), vec![(1, 1), (5, 5), (10, 10)]);
        assert_eq!(*engine.model(), 10);
    }
}
