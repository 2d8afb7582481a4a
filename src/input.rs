//! Input side of a pipeline component.
//!
//! Transformers and consumers implement [`Input`] to declare the item type
//! they accept and the stream shape it arrives in. A transformer's input
//! type must match the [`crate::output::Output`] of whatever feeds it; the
//! [`crate::pipeline::Pipeline`] builder checks this at compile time.

use futures::Stream;

/// Declares the items a component consumes.
pub trait Input
where
  Self::Input: Send + 'static,
{
  /// Item type.
  type Input;
  /// Stream yielding [`Input::Input`] items.
  type InputStream: Stream<Item = Self::Input> + Send + 'static;
}
