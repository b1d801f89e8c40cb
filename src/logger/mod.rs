//! Leveled logger shared by the tracker services.
//!
//! Loggers are registered weakly so that [`set_log_level`] reaches every live instance. A
//! callback installed with [`set_user_log_handler`] applies to all loggers, including ones
//! created later. The default output prefixes each line with the logger name in brackets,
//! e.g. `[ngx-umami] Tracking is disabled`.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError, RwLock, Weak};

static GLOBAL_LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static LIVE_LOGGERS: LazyLock<Mutex<Vec<Weak<LoggerState>>>> =
    LazyLock::new(|| Mutex::new(Vec::new()));
static USER_CALLBACK: RwLock<Option<UserCallback>> = RwLock::new(None);

/// Receives every record of a logger, before level filtering.
pub type LogHandler = Arc<dyn Fn(&Logger, LogLevel, &[LogArgument]) + Send + Sync + 'static>;

/// Host callback installed with [`set_user_log_handler`].
pub type LogCallback = Arc<dyn Fn(LogCallbackParams) + Send + Sync + 'static>;

#[derive(Clone)]
struct UserCallback {
    callback: LogCallback,
    threshold: Option<LogLevel>,
}

#[derive(Clone)]
pub struct Logger {
    state: Arc<LoggerState>,
}

struct LoggerState {
    name: String,
    level: AtomicU8,
    output: RwLock<LogHandler>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.state.name)
            .field("level", &self.log_level())
            .finish()
    }
}

impl Logger {
    /// Creates a logger at the current global level and registers it for [`set_log_level`].
    pub fn new(name: impl Into<String>) -> Self {
        let state = Arc::new(LoggerState {
            name: name.into(),
            level: AtomicU8::new(GLOBAL_LOG_LEVEL.load(Ordering::SeqCst)),
            output: RwLock::new(console_handler()),
        });
        register(&state);
        Self { state }
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_u8(self.state.level.load(Ordering::SeqCst))
    }

    pub fn set_log_level(&self, level: impl IntoLogLevel) -> Result<(), LogError> {
        let level = level.into_log_level()?;
        self.state.level.store(level as u8, Ordering::SeqCst);
        Ok(())
    }

    /// Replaces the output of this logger. The handler sees every record and does its own
    /// level filtering.
    pub fn set_log_handler<F>(&self, handler: F)
    where
        F: Fn(&Logger, LogLevel, &[LogArgument]) + Send + Sync + 'static,
    {
        *self.state.output.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(handler);
    }

    /// Restores console output.
    pub fn reset_log_handler(&self) {
        *self.state.output.write().unwrap_or_else(PoisonError::into_inner) = console_handler();
    }

    pub fn debug(&self, arg: impl IntoLogArgument) {
        self.emit(LogLevel::Debug, arg);
    }

    pub fn log(&self, arg: impl IntoLogArgument) {
        self.emit(LogLevel::Verbose, arg);
    }

    pub fn info(&self, arg: impl IntoLogArgument) {
        self.emit(LogLevel::Info, arg);
    }

    pub fn warn(&self, arg: impl IntoLogArgument) {
        self.emit(LogLevel::Warn, arg);
    }

    pub fn error(&self, arg: impl IntoLogArgument) {
        self.emit(LogLevel::Error, arg);
    }

    /// Emits at a level chosen at runtime.
    pub fn emit(&self, level: LogLevel, arg: impl IntoLogArgument) {
        let args = [arg.into_log_argument()];

        // Neither lock is held while handlers run.
        let user = USER_CALLBACK
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(user) = user {
            user.deliver(self, level, &args);
        }

        let output = self
            .state
            .output
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        output(self, level, &args);
    }
}

impl UserCallback {
    fn deliver(&self, logger: &Logger, level: LogLevel, args: &[LogArgument]) {
        let threshold = self.threshold.unwrap_or_else(|| logger.log_level());
        if level < threshold || level == LogLevel::Silent {
            return;
        }
        (self.callback)(LogCallbackParams {
            level,
            message: join_fragments(args),
            args: args.iter().map(LogArgument::to_value).collect(),
            logger: logger.name().to_owned(),
        });
    }
}

fn live_loggers() -> MutexGuard<'static, Vec<Weak<LoggerState>>> {
    LIVE_LOGGERS.lock().unwrap_or_else(PoisonError::into_inner)
}

fn register(state: &Arc<LoggerState>) {
    let mut loggers = live_loggers();
    loggers.retain(|logger| logger.strong_count() > 0);
    loggers.push(Arc::downgrade(state));
}

fn console_handler() -> LogHandler {
    Arc::new(|logger: &Logger, level: LogLevel, args: &[LogArgument]| {
        if level < logger.log_level() || level == LogLevel::Silent {
            return;
        }
        let message = join_fragments(args);
        if message.is_empty() {
            write_line(level, &format!("[{}]", logger.name()));
        } else {
            write_line(level, &format!("[{}] {message}", logger.name()));
        }
    })
}

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
fn write_line(level: LogLevel, line: &str) {
    let value = wasm_bindgen::JsValue::from_str(line);
    match level {
        LogLevel::Debug => web_sys::console::debug_1(&value),
        LogLevel::Warn => web_sys::console::warn_1(&value),
        LogLevel::Error => web_sys::console::error_1(&value),
        _ => web_sys::console::log_1(&value),
    }
}

#[cfg(not(all(feature = "wasm-web", target_arch = "wasm32")))]
fn write_line(level: LogLevel, line: &str) {
    if level >= LogLevel::Warn {
        eprintln!("{line}");
    } else {
        println!("{line}");
    }
}

fn join_fragments(args: &[LogArgument]) -> String {
    args.iter()
        .filter_map(LogArgument::to_message_fragment)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Verbose = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Silent = 5,
}

const LEVEL_NAMES: [(LogLevel, &str); 6] = [
    (LogLevel::Debug, "debug"),
    (LogLevel::Verbose, "verbose"),
    (LogLevel::Info, "info"),
    (LogLevel::Warn, "warn"),
    (LogLevel::Error, "error"),
    (LogLevel::Silent, "silent"),
];

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        LEVEL_NAMES[self as usize].1
    }

    fn from_u8(value: u8) -> Self {
        LEVEL_NAMES
            .get(usize::from(value))
            .map_or(LogLevel::Silent, |(level, _)| *level)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let name = if lowered == "warning" { "warn" } else { lowered.as_str() };
        LEVEL_NAMES
            .iter()
            .find(|(_, label)| *label == name)
            .map(|(level, _)| *level)
            .ok_or(LogError::InvalidLogLevel(lowered))
    }
}

/// Accepts either a [`LogLevel`] or its name.
pub trait IntoLogLevel {
    fn into_log_level(self) -> Result<LogLevel, LogError>;
}

impl IntoLogLevel for LogLevel {
    fn into_log_level(self) -> Result<LogLevel, LogError> {
        Ok(self)
    }
}

impl IntoLogLevel for &str {
    fn into_log_level(self) -> Result<LogLevel, LogError> {
        self.parse()
    }
}

/// What a [`LogCallback`] receives for each record at or above its threshold.
#[derive(Debug, Clone)]
pub struct LogCallbackParams {
    pub level: LogLevel,
    /// Arguments joined with spaces.
    pub message: String,
    pub args: Vec<Value>,
    /// Name of the emitting logger.
    pub logger: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogArgument {
    Text(String),
    Value(Value),
}

impl LogArgument {
    /// Text used in the formatted line; `None` for JSON null.
    pub fn to_message_fragment(&self) -> Option<String> {
        match self {
            LogArgument::Text(text) | LogArgument::Value(Value::String(text)) => Some(text.clone()),
            LogArgument::Value(Value::Null) => None,
            LogArgument::Value(other) => Some(other.to_string()),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            LogArgument::Text(text) => Value::String(text.clone()),
            LogArgument::Value(value) => value.clone(),
        }
    }
}

pub trait IntoLogArgument {
    fn into_log_argument(self) -> LogArgument;
}

impl IntoLogArgument for LogArgument {
    fn into_log_argument(self) -> LogArgument {
        self
    }
}

impl IntoLogArgument for &str {
    fn into_log_argument(self) -> LogArgument {
        LogArgument::Text(self.to_owned())
    }
}

impl IntoLogArgument for String {
    fn into_log_argument(self) -> LogArgument {
        LogArgument::Text(self)
    }
}

impl IntoLogArgument for Value {
    fn into_log_argument(self) -> LogArgument {
        LogArgument::Value(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    InvalidLogLevel(String),
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogError::InvalidLogLevel(level) => {
                write!(f, "Invalid value \"{level}\" assigned to `logLevel`")
            }
        }
    }
}

impl std::error::Error for LogError {}

/// Sets the level of every live logger and of loggers created afterwards.
pub fn set_log_level(level: impl IntoLogLevel) -> Result<(), LogError> {
    let level = level.into_log_level()?;
    GLOBAL_LOG_LEVEL.store(level as u8, Ordering::SeqCst);

    let live: Vec<Arc<LoggerState>> = {
        let mut loggers = live_loggers();
        loggers.retain(|logger| logger.strong_count() > 0);
        loggers.iter().filter_map(Weak::upgrade).collect()
    };
    for state in live {
        state.level.store(level as u8, Ordering::SeqCst);
    }
    Ok(())
}

/// Installs `callback` for every logger, or removes it with `None`.
///
/// Records below `threshold` are skipped; without one each logger's own level applies.
pub fn set_user_log_handler(callback: Option<LogCallback>, threshold: Option<LogLevel>) {
    *USER_CALLBACK.write().unwrap_or_else(PoisonError::into_inner) =
        callback.map(|callback| UserCallback {
            callback,
            threshold,
        });
}

/// [`set_user_log_handler`] for a plain closure.
pub fn set_user_log_handler_fn<F>(callback: F, threshold: Option<LogLevel>)
where
    F: Fn(LogCallbackParams) + Send + Sync + 'static,
{
    set_user_log_handler(Some(Arc::new(callback)), threshold);
}

#[cfg(test)]
mod tests {
    use super::*;

    static TEST_GUARD: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    fn lock_globals() -> MutexGuard<'static, ()> {
        let guard = TEST_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
        set_log_level(LogLevel::Info).unwrap();
        set_user_log_handler(None, None);
        guard
    }

    fn filtered_records(logger: &Logger) -> Arc<Mutex<Vec<(LogLevel, String)>>> {
        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&records);
        logger.set_log_handler(move |instance, level, args| {
            if level >= instance.log_level() {
                sink.lock().unwrap().push((level, join_fragments(args)));
            }
        });
        records
    }

    fn levels(records: &Mutex<Vec<(LogLevel, String)>>) -> Vec<LogLevel> {
        records.lock().unwrap().iter().map(|(level, _)| *level).collect()
    }

    #[test]
    fn global_level_reaches_existing_loggers() {
        let _guard = lock_globals();
        let logger = Logger::new("levels");
        let records = filtered_records(&logger);

        logger.debug("hidden");
        set_log_level(LogLevel::Debug).unwrap();
        logger.debug("debug message");
        logger.log("verbose message");
        logger.info("info message");
        logger.warn("warn message");
        logger.error("error message");

        assert_eq!(
            levels(&records),
            [
                LogLevel::Debug,
                LogLevel::Verbose,
                LogLevel::Info,
                LogLevel::Warn,
                LogLevel::Error,
            ]
        );
        assert_eq!(records.lock().unwrap()[0].1, "debug message");
        assert_eq!(Logger::new("created-later").log_level(), LogLevel::Debug);
        set_log_level(LogLevel::Info).unwrap();
    }

    #[test]
    fn per_logger_level_accepts_names() {
        let logger = Logger::new("named-level");
        logger.set_log_level("Warning").unwrap();
        let records = filtered_records(&logger);

        logger.info("info message");
        logger.warn("warn message");
        logger.emit(LogLevel::Error, "error message");

        assert_eq!(levels(&records), [LogLevel::Warn, LogLevel::Error]);
        assert_eq!("silent".parse::<LogLevel>(), Ok(LogLevel::Silent));
        assert_eq!(LogLevel::Verbose.to_string(), "VERBOSE");
    }

    #[test]
    fn invalid_level_is_rejected() {
        let logger = Logger::new("invalid-level");
        let err = logger.set_log_level("loud").unwrap_err();
        assert_eq!(err.to_string(), "Invalid value \"loud\" assigned to `logLevel`");
        assert_eq!(err, LogError::InvalidLogLevel("loud".into()));
    }

    #[test]
    fn user_callback_reaches_loggers_created_later() {
        let _guard = lock_globals();
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);
        set_user_log_handler_fn(
            move |params: LogCallbackParams| {
                if params.logger == "user-callback" {
                    sink.lock().unwrap().push(params);
                }
            },
            Some(LogLevel::Debug),
        );

        let logger = Logger::new("user-callback");
        logger.set_log_handler(|_, _, _| {});
        logger.debug(serde_json::json!(["example.com"]));
        logger.info("Tracking is disabled");

        let records = captured.lock().unwrap().clone();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].level, LogLevel::Debug);
        assert_eq!(records[0].message, "[\"example.com\"]");
        assert_eq!(records[0].args, vec![serde_json::json!(["example.com"])]);
        assert_eq!(records[1].args, vec![Value::from("Tracking is disabled")]);

        set_user_log_handler(None, None);
        logger.error("after removal");
        assert_eq!(captured.lock().unwrap().len(), 2);
    }

    #[test]
    fn user_callback_defaults_to_logger_level() {
        let _guard = lock_globals();
        let count = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&count);
        set_user_log_handler_fn(
            move |params: LogCallbackParams| {
                if params.logger == "user-threshold" {
                    *sink.lock().unwrap() += 1;
                }
            },
            None,
        );

        let logger = Logger::new("user-threshold");
        logger.set_log_handler(|_, _, _| {});
        logger.debug("below info");
        logger.warn("at warn");

        assert_eq!(*count.lock().unwrap(), 1);
        set_user_log_handler(None, None);
    }

    #[test]
    fn handler_may_log_through_another_logger() {
        let _guard = lock_globals();
        let inner = Logger::new("inner");
        let inner_records = filtered_records(&inner);
        let outer = Logger::new("outer");
        let relay = inner.clone();
        outer.set_log_handler(move |_, level, args| {
            relay.emit(level, join_fragments(args));
        });

        outer.warn("relayed");
        assert_eq!(
            *inner_records.lock().unwrap(),
            vec![(LogLevel::Warn, "relayed".to_string())]
        );
    }

    #[test]
    fn dropped_loggers_leave_the_registry() {
        let _guard = lock_globals();
        let dropped = Logger::new("short-lived");
        let weak = Arc::downgrade(&dropped.state);
        drop(dropped);

        let _next = Logger::new("replacement");
        assert!(!live_loggers()
            .iter()
            .any(|entry| Weak::ptr_eq(entry, &weak)));
    }
}
