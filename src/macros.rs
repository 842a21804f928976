//! Per-chunk logging macros
//!
//! Streaming logs one line per body chunk or fragment. These macros log in debug
//! builds and compile to no-ops in release builds.

/// Chunk debug logging - only active in debug builds
#[cfg(debug_assertions)]
#[macro_export]
macro_rules! chunk_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

/// Chunk debug logging - no-op in release builds
#[cfg(not(debug_assertions))]
#[macro_export]
macro_rules! chunk_debug {
    ($($arg:tt)*) => {};
}

/// Chunk trace logging - only active in debug builds
#[cfg(debug_assertions)]
#[macro_export]
macro_rules! chunk_trace {
    ($($arg:tt)*) => { log::trace!($($arg)*) };
}

/// Chunk trace logging - no-op in release builds
#[cfg(not(debug_assertions))]
#[macro_export]
macro_rules! chunk_trace {
    ($($arg:tt)*) => {};
}
