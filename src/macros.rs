// src/macros.rs

//! Crate-internal logging macros.
//!
//! With the `logging` feature every level forwards to `tracing`. Without it
//! the arguments are still type-checked through `format_args!` but nothing is
//! emitted, except `log_error!` which writes to stderr.

#![allow(unused_macros)]

#[cfg(feature = "logging")]
mod backend {
    // ---
    macro_rules! log_error {
        ($($arg:tt)*) => { tracing::error!($($arg)*) };
    }
    macro_rules! log_warn {
        ($($arg:tt)*) => { tracing::warn!($($arg)*) };
    }
    macro_rules! log_info {
        ($($arg:tt)*) => { tracing::info!($($arg)*) };
    }
    macro_rules! log_debug {
        ($($arg:tt)*) => { tracing::debug!($($arg)*) };
    }

    pub(crate) use {log_debug, log_error, log_info, log_warn};
}

#[cfg(not(feature = "logging"))]
mod backend {
    // ---
    macro_rules! log_error {
        ($($arg:tt)*) => { eprintln!($($arg)*) };
    }
    macro_rules! log_warn {
        ($($arg:tt)*) => {{ let _ = format_args!($($arg)*); }};
    }
    macro_rules! log_info {
        ($($arg:tt)*) => {{ let _ = format_args!($($arg)*); }};
    }
    macro_rules! log_debug {
        ($($arg:tt)*) => {{ let _ = format_args!($($arg)*); }};
    }

    pub(crate) use {log_debug, log_error, log_info, log_warn};
}

pub(crate) use backend::{log_debug, log_error, log_info, log_warn};
