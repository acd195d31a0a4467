//! Update logic and the accumulator that folds messages over state.
//!
//! Two dispatch strategies are supported:
//!
//! - A single function, usually an exhaustive `match` over a message enum.
//!   This is the preferred form because the compiler checks every variant.
//! - A [`PatternTable`]: an ordered list of cases checked first to last. It is
//!   not exhaustive; a message no case accepts is a fatal
//!   [`EngineError::UnmatchedMessage`].
//!
//! For disjoint variant sets both strategies behave identically.

use super::update::UpdateResult;
use crate::domain::{EngineError, MessageTag, Result};
use std::fmt;
use std::rc::Rc;

type UpdateFn<S, M> = Box<dyn FnMut(&S, M) -> Result<UpdateResult<S, M>>>;
type CaseFn<S, M> = Box<dyn FnMut(&S, M) -> CaseOutcome<S, M>>;

enum CaseOutcome<S, M> {
    Handled(Result<UpdateResult<S, M>>),
    Declined(M),
}

/// An ordered list of `(variant, reducer)` cases, first match wins.
///
/// # Examples
///
/// ```
/// use elmloop::{PatternTable, UpdateLogic};
///
/// #[derive(Debug)]
/// enum Msg { SetA(i64), Clear }
///
/// let table = PatternTable::<i64, Msg>::new()
///     .case_of(
///         |msg| match msg { Msg::SetA(n) => Ok(n), other => Err(other) },
///         |_, n| n.into(),
///     )
///     .case_of(
///         |msg| match msg { Msg::Clear => Ok(()), other => Err(other) },
///         |_, ()| 0.into(),
///     );
/// let logic = UpdateLogic::from(table);
/// # let _ = logic;
/// ```
pub struct PatternTable<S, M> {
    cases: Vec<(&'static str, CaseFn<S, M>)>,
}

impl<S: 'static, M: 'static> PatternTable<S, M> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self { cases: Vec::new() }
    }

    /// Adds a case selected by an extractor.
    ///
    /// `extract` returns `Ok(payload)` when the message belongs to this case
    /// and hands the message back with `Err(message)` otherwise.
    #[must_use]
    pub fn case_of<T, E, R>(self, extract: E, mut reducer: R) -> Self
    where
        E: Fn(M) -> std::result::Result<T, M> + 'static,
        R: FnMut(&S, T) -> UpdateResult<S, M> + 'static,
    {
        self.try_case_of(extract, move |state, payload| Ok(reducer(state, payload)))
    }

    /// Adds a case selected by an extractor whose reducer may fail.
    #[must_use]
    pub fn try_case_of<T, E, R>(mut self, extract: E, mut reducer: R) -> Self
    where
        E: Fn(M) -> std::result::Result<T, M> + 'static,
        R: FnMut(&S, T) -> Result<UpdateResult<S, M>> + 'static,
    {
        let case: CaseFn<S, M> = Box::new(move |state, message| match extract(message) {
            Ok(payload) => CaseOutcome::Handled(reducer(state, payload)),
            Err(message) => CaseOutcome::Declined(message),
        });
        self.cases.push((std::any::type_name::<T>(), case));
        self
    }

    /// Adds a case selected by the message's [`MessageTag`].
    #[must_use]
    pub fn case_tag<R>(mut self, tag: &'static str, mut reducer: R) -> Self
    where
        M: MessageTag,
        R: FnMut(&S, M) -> UpdateResult<S, M> + 'static,
    {
        let case: CaseFn<S, M> = Box::new(move |state, message: M| {
            if message.is(tag) {
                CaseOutcome::Handled(Ok(reducer(state, message)))
            } else {
                CaseOutcome::Declined(message)
            }
        });
        self.cases.push((tag, case));
        self
    }

    /// Number of registered cases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Returns `true` if no case has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    fn dispatch(&mut self, state: &S, message: M) -> Result<UpdateResult<S, M>>
    where
        M: fmt::Debug,
    {
        let mut message = message;
        for (_, case) in &mut self.cases {
            match case(state, message) {
                CaseOutcome::Handled(result) => return result,
                CaseOutcome::Declined(declined) => message = declined,
            }
        }
        Err(EngineError::UnmatchedMessage {
            message: format!("{message:?}"),
        })
    }
}

impl<S: 'static, M: 'static> Default for PatternTable<S, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, M> fmt::Debug for PatternTable<S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.cases.iter().map(|(name, _)| name))
            .finish()
    }
}

/// The update logic handed to the engine at `begin`.
pub enum UpdateLogic<S, M> {
    /// A single update function.
    Function(UpdateFn<S, M>),
    /// An ordered pattern table.
    Patterns(PatternTable<S, M>),
}

impl<S: 'static, M: 'static> UpdateLogic<S, M> {
    /// Update logic from an infallible function.
    pub fn from_fn<F>(mut update: F) -> Self
    where
        F: FnMut(&S, M) -> UpdateResult<S, M> + 'static,
    {
        Self::Function(Box::new(move |state, message| Ok(update(state, message))))
    }

    /// Update logic from a function that may fail.
    ///
    /// Any error is fatal for the engine instance.
    pub fn try_from_fn<F>(update: F) -> Self
    where
        F: FnMut(&S, M) -> Result<UpdateResult<S, M>> + 'static,
    {
        Self::Function(Box::new(update))
    }

    /// Update logic from a pattern table.
    #[must_use]
    pub const fn patterns(table: PatternTable<S, M>) -> Self {
        Self::Patterns(table)
    }

    fn apply(&mut self, state: &S, message: M) -> Result<UpdateResult<S, M>>
    where
        M: fmt::Debug,
    {
        match self {
            Self::Function(update) => update(state, message),
            Self::Patterns(table) => table.dispatch(state, message),
        }
    }
}

impl<S: 'static, M: 'static> From<PatternTable<S, M>> for UpdateLogic<S, M> {
    fn from(table: PatternTable<S, M>) -> Self {
        Self::Patterns(table)
    }
}

impl<S, M> fmt::Debug for UpdateLogic<S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => f.write_str("UpdateLogic::Function"),
            Self::Patterns(table) => f.debug_tuple("UpdateLogic::Patterns").field(table).finish(),
        }
    }
}

/// Folds messages over the latest state.
///
/// Holds nothing but the last bare state and the update logic. Whatever
/// shape the previous result had, only its state is carried into the next
/// step.
pub(crate) struct Accumulator<S, M> {
    state: Rc<S>,
    logic: UpdateLogic<S, M>,
}

impl<S: 'static, M: fmt::Debug + 'static> Accumulator<S, M> {
    pub(crate) fn new(initial: Rc<S>, logic: UpdateLogic<S, M>) -> Self {
        Self {
            state: initial,
            logic,
        }
    }

    /// Runs the update logic against the current state.
    pub(crate) fn fold(&mut self, message: M) -> Result<UpdateResult<S, M>> {
        self.logic.apply(&self.state, message)
    }

    /// Records the state extracted from the last result.
    pub(crate) fn advance(&mut self, state: S) -> Rc<S> {
        self.state = Rc::new(state);
        Rc::clone(&self.state)
    }
}
