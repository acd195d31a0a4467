//! Host-framework adapter.
//!
//! UI hosts usually want an object exposing the current model as a plain
//! getter plus `send` and a teardown hook. [`Service`] is that object: the
//! concrete application only supplies the initial state and the update logic
//! through [`Application`].

use crate::engine::{Engine, EngineBuilder, StateStream, UpdateLogic};
use futures_util::task::LocalSpawn;
use std::fmt;
use std::rc::Rc;

/// Hooks a concrete application provides to a [`Service`].
///
/// # Example
///
/// ```rust
/// use elmloop::{Application, Service, UpdateLogic};
///
/// #[derive(Debug)]
/// enum Msg { Inc }
///
/// struct Counter;
///
/// impl Application for Counter {
///     type State = u32;
///     type Msg = Msg;
///
///     fn initial_state(&self) -> u32 {
///         0
///     }
///
///     fn update(&self) -> UpdateLogic<u32, Msg> {
///         UpdateLogic::from_fn(|n: &u32, Msg::Inc| (n + 1).into())
///     }
/// }
///
/// let service = Service::new(&Counter, false);
/// service.send(Msg::Inc);
/// assert_eq!(*service.model(), 1);
/// service.destroy();
/// ```
pub trait Application {
    /// The application's state.
    type State: fmt::Debug + 'static;
    /// The application's message enum.
    type Msg: fmt::Debug + 'static;

    /// State the engine starts from.
    fn initial_state(&self) -> Self::State;

    /// Update logic driving the engine.
    fn update(&self) -> UpdateLogic<Self::State, Self::Msg>;
}

/// An engine started from an [`Application`].
pub struct Service<A: Application> {
    engine: Engine<A::State, A::Msg>,
}

impl<A: Application> Service<A> {
    /// Starts the service without a deferred-command executor.
    pub fn new(app: &A, debug: bool) -> Self {
        Self::from_builder(EngineBuilder::new(app.initial_state(), app.update()).debug(debug))
    }

    /// Starts the service with an executor for deferred commands.
    pub fn with_spawner(app: &A, spawner: impl LocalSpawn + 'static, debug: bool) -> Self {
        Self::from_builder(
            EngineBuilder::new(app.initial_state(), app.update())
                .debug(debug)
                .spawner(spawner),
        )
    }

    fn from_builder(builder: EngineBuilder<A::State, A::Msg>) -> Self {
        Self {
            engine: builder.begin(),
        }
    }

    /// The current model.
    #[must_use]
    pub fn model(&self) -> Rc<A::State> {
        self.engine.model()
    }

    /// Observable handle over the model.
    #[must_use]
    pub fn states(&self) -> StateStream<A::State> {
        self.engine.states()
    }

    /// Injects a message.
    pub fn send(&self, message: A::Msg) {
        self.engine.send(message);
    }

    /// Stops the underlying engine.
    pub fn destroy(&self) {
        self.engine.stop();
    }

    /// The underlying engine handle.
    #[must_use]
    pub const fn engine(&self) -> &Engine<A::State, A::Msg> {
        &self.engine
    }
}

impl<A: Application> fmt::Debug for Service<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("engine", &self.engine)
            .finish()
    }
}
