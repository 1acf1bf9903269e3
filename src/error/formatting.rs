//! Error formatting utilities
//!
//! Renders errors with their full cause chain, and as structured payloads
//! for log records.

use crate::Error;
use std::error::Error as StdError;

/// Format error for display, including nested causes
pub fn format_error(error: &Error) -> String {
    let formatted = match error {
        Error::Connectivity {
            url,
            attempts,
            reason,
            timed_out,
        } => {
            let kind = if *timed_out { "timed out" } else { "unreachable" };
            format!(
                "Server {} after {} attempts ({}): {}",
                kind, attempts, reason, url
            )
        }

        Error::Decode {
            status,
            body,
            url,
            message,
        } => {
            format!(
                "Unexpected response from {} (HTTP {}): {} [body: {}]",
                url, status, message, body
            )
        }

        Error::Config { field, message } => {
            format!("Configuration error in {}: {}", field, message)
        }

        _ => error.to_string(),
    };

    let mut result = formatted;
    let mut source = error.source();

    while let Some(cause) = source {
        if !result.contains(&cause.to_string()) {
            result = format!("{} (caused by {})", result, cause);
        }
        source = cause.source();
    }

    result
}

/// Format error for logging with structured data
pub fn format_error_for_logging(error: &Error) -> serde_json::Value {
    let mut log_data = serde_json::json!({
        "message": format_error(error),
        "category": error.category(),
        "retryable": error.is_retryable(),
    });

    match error {
        Error::Connectivity {
            attempts,
            timed_out,
            url,
            ..
        } => {
            log_data["attempts"] = serde_json::Value::Number((*attempts).into());
            log_data["timed_out"] = serde_json::Value::Bool(*timed_out);
            log_data["url"] = serde_json::Value::String(url.clone());
        }
        Error::Decode { status, url, .. } => {
            log_data["status"] = serde_json::Value::Number((*status).into());
            log_data["url"] = serde_json::Value::String(url.clone());
        }
        _ => {}
    }

    log_data
}
