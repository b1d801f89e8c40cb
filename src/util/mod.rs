pub mod subscribe;

pub use subscribe::{CompleteFn, NextFn, PartialObserver, Unsubscribe};
