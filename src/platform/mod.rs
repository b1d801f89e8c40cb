pub mod environment;

pub use environment::{default_config_json, is_browser};
