//! Discriminant access for application messages.
//!
//! Messages are ordinary Rust enums. Implementing [`MessageTag`] gives each
//! variant a stable string name, which lets pattern tables match by tag and
//! keeps debug output short.

/// A message that can name its own variant.
///
/// # Examples
///
/// ```
/// use elmloop::MessageTag;
///
/// #[derive(Debug)]
/// enum Msg {
///     SetA(i64),
///     Reset,
/// }
///
/// impl MessageTag for Msg {
///     fn tag(&self) -> &'static str {
///         match self {
///             Self::SetA(_) => "SetA",
///             Self::Reset => "Reset",
///         }
///     }
/// }
///
/// assert_eq!(Msg::SetA(1).tag(), "SetA");
/// assert!(Msg::Reset.is("Reset"));
/// ```
pub trait MessageTag {
    /// Name of the variant this message belongs to.
    fn tag(&self) -> &'static str;

    /// Returns `true` when the message carries the given tag.
    fn is(&self, tag: &str) -> bool {
        self.tag() == tag
    }
}
