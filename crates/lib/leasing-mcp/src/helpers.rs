use leasing_core::control::ControlError;
use rmcp::model::{CallToolResult, Content};
use tracing::warn;

/// Converts a control-plane outcome into a tool result.
///
/// Failures are reported as error results carrying the message text so the
/// client can show them, rather than as protocol errors.
#[must_use]
pub fn control_result(result: Result<String, ControlError>) -> CallToolResult {
    match result {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(err) => {
            warn!(error = %err, "tool call failed");
            CallToolResult::error(vec![Content::text(err.to_string())])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_become_error_results() {
        let result = control_result(Err(ControlError::TableAbsent("guest_cards".to_string())));
        assert_eq!(result.is_error, Some(true));

        let result = control_result(Ok("ok".to_string()));
        assert_eq!(result.is_error, Some(false));
    }
}
