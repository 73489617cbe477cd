//! Core traits for the container.

mod dispose;

pub use dispose::Dispose;
