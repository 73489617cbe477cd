//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod dispose_bag;

pub(crate) use circular::{catch_resolution, with_circular_guard};
pub(crate) use dispose_bag::{DisposeBag, WeakDisposer};
