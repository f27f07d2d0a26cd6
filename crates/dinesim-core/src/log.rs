//! Logging facilities.
//!
//! Messages are written through the [`log`] facade as `[time LEVEL name] message`,
//! where `name` is the name of the process, resource or queue which emitted the message.
//! Any value with `time()` and `name()` methods can be passed as the context.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};
use log::error;
use serde_json::json;

use crate::error::SimError;

/// Applies the color to the string if stderr (log) goes to console.
pub fn get_colored(s: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        s.color(color)
    } else {
        s.normal()
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_with_ctx {
    ($level:ident, $label:expr, $color:ident, $ctx:expr, $msg:expr) => (
        $crate::__log::$level!(
            target: $ctx.name(),
            "[{:.3} {} {}] {}",
            $ctx.time(), $crate::log::get_colored($label, $crate::colored::Color::$color), $ctx.name(), $msg
        )
    );
    ($level:ident, $label:expr, $color:ident, $ctx:expr, $format:expr, $($arg:tt)+) => (
        $crate::__log::$level!(
            target: $ctx.name(),
            concat!("[{:.3} {} {}] ", $format),
            $ctx.time(), $crate::log::get_colored($label, $crate::colored::Color::$color), $ctx.name(), $($arg)+
        )
    );
}

/// Logs a message at the info level.
///
/// # Examples
///
/// ```rust
/// use std::io::Write;
/// use env_logger::Builder;
/// use dinesim_core::{log_info, Simulation};
///
/// Builder::from_default_env()
///     .format(|buf, record| writeln!(buf, "{}", record.args()))
///     .init();
///
/// let mut sim = Simulation::new(123);
/// sim.spawn_process("greeter", |ctx| async move {
///     log_info!(ctx, "started");
///     ctx.hold(1.).await?;
///     log_info!(ctx, "done after {}", ctx.time());
///     Ok(())
/// });
/// sim.step_until_no_events();
/// ```
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_with_ctx!(info, " INFO", Green, $ctx, $($arg)+));
}

/// Logs a message at the debug level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_with_ctx!(debug, "DEBUG", Blue, $ctx, $($arg)+));
}

/// Logs a message at the trace level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_with_ctx!(trace, "TRACE", Cyan, $ctx, $($arg)+));
}

/// Logs a message at the warn level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_with_ctx!(warn, " WARN", Yellow, $ctx, $($arg)+));
}

/// Logs a message at the error level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_with_ctx!(error, "ERROR", Red, $ctx, $($arg)+));
}

/// Logs a process which aborted the run loop.
pub(crate) fn log_process_failure(time: f64, name: &str, reason: &SimError) {
    error!(
        target: "simulation",
        "[{:.3} {} simulation] Process failed: {}",
        time,
        get_colored("ERROR", Color::Red),
        json!({"process": name, "reason": reason.to_string()})
    );
}
