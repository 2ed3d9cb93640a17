use std::{
    collections::HashSet,
    sync::{LockResult, Mutex, MutexGuard},
};

pub struct LogSet {
    inner: Mutex<HashSet<String>>,
}

impl LogSet {
    fn new() -> Self {
        Self {
            inner: Mutex::new(HashSet::new()),
        }
    }

    pub fn lock(&self) -> LockResult<MutexGuard<'_, HashSet<String>>> {
        self.inner.lock()
    }
}

lazy_static::lazy_static! {
    pub static ref __SET: LogSet = LogSet::new();
}

/// Emit a log record the first time a given message is seen, then stay quiet.
#[macro_export]
macro_rules! log_once {
    ($lvl:expr, $($arg:tt)+) => {{
        let message = format!($($arg)+);
        if log::log_enabled!($lvl) {
            let event = format!("[{}::{}] {}", module_path!(), $lvl, message);
            if $crate::utils::log_once::__SET.lock().unwrap().insert(event) {
                log::log!($lvl, "{}", message);
            }
        }
    }};
}

#[macro_export]
macro_rules! warn_once {
    ($($arg:tt)+) => ($crate::log_once!(log::Level::Warn, $($arg)+));
}

#[macro_export]
macro_rules! error_once {
    ($($arg:tt)+) => ($crate::log_once!(log::Level::Error, $($arg)+));
}

pub use {error_once, log_once, warn_once};
