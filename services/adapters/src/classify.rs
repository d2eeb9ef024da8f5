//! HTTP status and error-body classification for provider responses

use crate::error::ScrapeError;
use serde_json::Value;

const INVALID_REQUEST_MESSAGE: &str = "gds.flight.error.invalidrequest";
const PAST_DATE: &str = "shopping.search.legs.past-date";
const FORMAT_DATE: &str = "shopping.search.legs.format-date";
const DATE_PATTERN: &str = "shopping.search.legs.pattern";
const UNAUTHORIZED: &str = "unauthorized";
const ACCESS_DENIED: &str = "core.gateway.access-denied";

/// Longest body excerpt carried inside an `Unknown` error
const BODY_EXCERPT: usize = 512;

/// Lower-cased `description` and `errorMessage` fields of an error body
fn error_fields(body: &str) -> (String, String) {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
        return (String::new(), String::new());
    };
    let field = |key: &str| {
        map.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase()
    };
    (field("description"), field("errorMessage"))
}

/// Map a provider response to `Ok(())` (200) or its typed failure
///
/// `context` describes the request (task or probe) for error messages.
pub fn classify_response(status: u16, body: &str, context: &str) -> Result<(), ScrapeError> {
    if status == 200 {
        return Ok(());
    }

    let (description, message) = error_fields(body);
    let context = context.to_string();
    let unknown = |context: String| ScrapeError::Unknown {
        status,
        body: body.chars().take(BODY_EXCERPT).collect(),
        context,
    };

    let error = match status {
        400 => {
            if description.is_empty() && message.contains(INVALID_REQUEST_MESSAGE) {
                ScrapeError::InvalidRequest { context }
            } else {
                match description.as_str() {
                    PAST_DATE => ScrapeError::InvalidPastDate { context },
                    FORMAT_DATE | DATE_PATTERN => ScrapeError::InvalidDateFormat { context },
                    _ => unknown(context),
                }
            }
        }
        401 => match message.as_str() {
            UNAUTHORIZED => ScrapeError::UnauthorizedToken,
            ACCESS_DENIED => ScrapeError::ExpiredToken { context },
            _ => unknown(context),
        },
        403 | 429 => ScrapeError::RequestsBlocked { status, context },
        500 => ScrapeError::UpstreamError { context },
        502 => ScrapeError::ServiceDown { context },
        _ => unknown(context),
    };
    Err(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(status: u16, body: &str) -> ScrapeError {
        classify_response(status, body, "AEP->COR on 2025-07-16").unwrap_err()
    }

    #[test]
    fn test_success() {
        assert!(classify_response(200, "{}", "").is_ok());
    }

    #[test]
    fn test_access_denied_is_expired_not_unauthorized() {
        let err = classify(401, r#"{"errorMessage": "core.gateway.access-denied"}"#);
        assert!(matches!(err, ScrapeError::ExpiredToken { .. }));

        let err = classify(401, r#"{"errorMessage": "Unauthorized"}"#);
        assert_eq!(err, ScrapeError::UnauthorizedToken);

        let err = classify(401, r#"{"errorMessage": "something else"}"#);
        assert!(matches!(err, ScrapeError::Unknown { status: 401, .. }));
    }

    #[test]
    fn test_bad_request_variants() {
        let err = classify(400, r#"{"errorMessage": "GDS.FLIGHT.ERROR.INVALIDREQUEST: no service"}"#);
        assert!(matches!(err, ScrapeError::InvalidRequest { .. }));

        let err = classify(400, r#"{"description": "shopping.search.legs.past-date"}"#);
        assert!(matches!(err, ScrapeError::InvalidPastDate { .. }));

        let err = classify(400, r#"{"description": "shopping.search.legs.format-date"}"#);
        assert!(matches!(err, ScrapeError::InvalidDateFormat { .. }));
        let err = classify(400, r#"{"description": "shopping.search.legs.pattern"}"#);
        assert!(matches!(err, ScrapeError::InvalidDateFormat { .. }));

        // A description takes precedence over the invalid-request message
        let err = classify(
            400,
            r#"{"description": "other", "errorMessage": "gds.flight.error.invalidrequest"}"#,
        );
        assert!(matches!(err, ScrapeError::Unknown { status: 400, .. }));
    }

    #[test]
    fn test_status_only_classes() {
        assert!(matches!(classify(403, ""), ScrapeError::RequestsBlocked { status: 403, .. }));
        assert!(matches!(classify(429, "<html>"), ScrapeError::RequestsBlocked { status: 429, .. }));
        assert!(matches!(classify(500, ""), ScrapeError::UpstreamError { .. }));
        assert!(matches!(classify(502, ""), ScrapeError::ServiceDown { .. }));
        assert!(matches!(classify(503, ""), ScrapeError::Unknown { status: 503, .. }));
    }

    #[test]
    fn test_non_json_body_is_unknown_for_body_dependent_statuses() {
        assert!(matches!(classify(400, "<html>bad</html>"), ScrapeError::Unknown { .. }));
        assert!(matches!(classify(401, "denied"), ScrapeError::Unknown { .. }));
    }
}
