//! Status code helpers shared by the response factories and the error boundary.

use http::StatusCode;

/// Returns the canonical reason phrase of `status`, or `"Unknown"` for unregistered codes.
pub fn reason_phrase(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

/// The text an error response carries when its message is not exposed, e.g. `"500 Internal Server Error"`.
pub fn status_text(status: StatusCode) -> String {
    format!("{} {}", status.as_u16(), reason_phrase(status))
}

/// Whether a response with `status` must not carry a body.
pub fn is_body_forbidden(status: StatusCode) -> bool {
    status.is_informational()
        || matches!(status, StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT | StatusCode::NOT_MODIFIED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_phrases() {
        assert_eq!(reason_phrase(StatusCode::NOT_FOUND), "Not Found");
        assert_eq!(reason_phrase(StatusCode::from_u16(599).unwrap()), "Unknown");
        assert_eq!(status_text(StatusCode::INTERNAL_SERVER_ERROR), "500 Internal Server Error");
    }

    #[test]
    fn body_forbidden_statuses() {
        assert!(is_body_forbidden(StatusCode::CONTINUE));
        assert!(is_body_forbidden(StatusCode::NO_CONTENT));
        assert!(is_body_forbidden(StatusCode::RESET_CONTENT));
        assert!(is_body_forbidden(StatusCode::NOT_MODIFIED));
        assert!(!is_body_forbidden(StatusCode::OK));
        assert!(!is_body_forbidden(StatusCode::NOT_FOUND));
    }
}
