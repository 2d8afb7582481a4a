//! Output side of a pipeline component.
//!
//! Producers and transformers implement [`Output`] to declare the item type
//! they emit and the stream shape it leaves in.

use futures::Stream;

/// Declares the items a component emits.
pub trait Output
where
  Self::Output: Send + 'static,
{
  /// Item type.
  type Output;
  /// Stream yielding [`Output::Output`] items.
  type OutputStream: Stream<Item = Self::Output> + Send + 'static;
}
