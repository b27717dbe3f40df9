//! Global logging for the MXL engine.
//!
//! Thread-safe global logging with coded events and a clean macro interface.
//! Parsing itself never requires the logger; everything degrades to a no-op
//! when uninitialized.

pub mod codes;
pub mod events;
#[macro_use]
pub mod macros;
pub mod service;

use std::sync::{Arc, OnceLock};

// Re-export main types
pub use codes::Code;
pub use events::{LogEvent, LogLevel};
pub use service::{ConsoleLogger, Logger, LoggingService, MemoryLogger, StructuredLogger};

static GLOBAL_LOGGER: OnceLock<Arc<LoggingService>> = OnceLock::new();

/// Initialize global logging from the environment.
pub fn init_global_logging() -> Result<(), String> {
    let logging_service = Arc::new(LoggingService::from_env());

    GLOBAL_LOGGER
        .set(logging_service.clone())
        .map_err(|_| "Global logger already initialized".to_string())?;

    let event = events::LogEvent::success(
        codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Global logging system initialized",
    );
    logging_service.log_event(event);

    Ok(())
}

/// Initialize with custom service (primarily for testing)
pub fn init_global_logging_with_service(service: Arc<LoggingService>) -> Result<(), String> {
    GLOBAL_LOGGER
        .set(service)
        .map_err(|_| "Global logger already initialized".to_string())
}

/// Check if global logging is initialized
pub fn is_initialized() -> bool {
    GLOBAL_LOGGER.get().is_some()
}

/// Safe access to global logger
pub fn try_get_global_logger() -> Option<&'static LoggingService> {
    GLOBAL_LOGGER.get().map(|service| service.as_ref())
}

/// Log error with context (used by log_error! macro)
pub fn log_error_with_context(
    code: Code,
    message: &str,
    offset: Option<usize>,
    context: Vec<(&str, &str)>,
) {
    let mut event = LogEvent::error(code, message);

    if let Some(o) = offset {
        event = event.with_offset(o);
    }

    for (key, value) in context {
        event = event.with_context(key, value);
    }

    if let Some(logger) = try_get_global_logger() {
        logger.log_event(event);
    }
}

/// Log success with context (used by log_success! macro)
pub fn log_success_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    let mut event = LogEvent::success(code, message);

    for (key, value) in context {
        event = event.with_context(key, value);
    }

    if let Some(logger) = try_get_global_logger() {
        logger.log_event(event);
    }
}

/// Log info with context (used by log_info! macro)
pub fn log_info_with_context(message: &str, context: Vec<(&str, &str)>) {
    let mut event = LogEvent::info(message);

    for (key, value) in context {
        event = event.with_context(key, value);
    }

    if let Some(logger) = try_get_global_logger() {
        logger.log_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_logging_is_noop() {
        // Must not panic regardless of initialization order across tests.
        log_error_with_context(codes::scan::INVALID_NUMBER, "bad number", Some(3), vec![]);
        log_info_with_context("spin", vec![("k", "v")]);
    }

    #[test]
    fn test_init_with_memory_service() {
        let memory = Arc::new(MemoryLogger::new());
        let service = Arc::new(LoggingService::new(memory.clone(), LogLevel::Debug));

        // A prior test may already have installed a logger; either way the
        // global accessors must stay usable.
        let _ = init_global_logging_with_service(service);
        assert!(is_initialized());
        assert!(try_get_global_logger().is_some());
    }

    #[test]
    fn test_macros_resolve_unqualified() {
        // These must resolve without a `use` of the macros module.
        log_debug!("scan step", "position" => 4);
        log_warning!("slow scan");
        log_error!(codes::expression::UNPARSED_CONTENT, "tail", offset = 7);
        log_success!(codes::success::PARSE_COMPLETE, "done", "tokens" => 1);
    }
}
