#![doc = include_str!("RUSTDOC.md")]

pub mod logger;
pub mod platform;
pub mod umami;
pub mod util;

#[cfg(test)]
pub mod test_support;
