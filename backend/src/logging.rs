//! Middleware for logging requests and responses.

use axum::{
    extract::Request,
    http::{HeaderMap, header::CONTENT_TYPE},
    middleware::Next,
    response::Response,
};
use serde_json::Value;

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is truncated
/// and the full body is logged at the `debug` level. Password fields in JSON
/// request bodies are redacted before logging.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body_text) = extract_parts_and_body_text_from_request(request).await;

    if is_json_content_type(&parts.headers) {
        log_request(&parts, &redact_passwords(&body_text));
    } else {
        log_request(&parts, &body_text);
    }

    let request = Request::from_parts(parts, body_text.into());
    let response = next.run(request).await;

    let (parts, body_text) = extract_parts_and_body_text_from_response(response).await;
    log_response(&parts, &body_text);

    Response::from_parts(parts, body_text.into())
}

/// The JSON keys whose values are replaced before logging.
const REDACTED_FIELDS: [&str; 3] = ["password", "oldPassword", "newPassword"];

/// Whether the content type declares a JSON body, ignoring parameters such as
/// `charset=utf-8`.
fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim_start().starts_with("application/json"))
}

fn redact_passwords(body_text: &str) -> String {
    let Ok(mut body) = serde_json::from_str::<Value>(body_text) else {
        return body_text.to_string();
    };

    if let Some(object) = body.as_object_mut() {
        for field in REDACTED_FIELDS {
            if let Some(value) = object.get_mut(field) {
                *value = Value::String("********".to_string());
            }
        }
    }

    body.to_string()
}

async fn extract_parts_and_body_text_from_request(
    request: Request,
) -> (axum::http::request::Parts, String) {
    let (parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    (parts, String::from_utf8_lossy(&body_bytes).to_string())
}

async fn extract_parts_and_body_text_from_response(
    response: Response,
) -> (axum::http::response::Parts, String) {
    let (parts, body) = response.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    (parts, String::from_utf8_lossy(&body_bytes).to_string())
}

/// How many bytes of a body are logged at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Take up to [LOG_BODY_LENGTH_LIMIT] bytes of `body`, backing off to the
/// nearest char boundary so that multibyte text does not split mid-character.
fn truncated(body: &str) -> &str {
    let mut end = LOG_BODY_LENGTH_LIMIT;

    while !body.is_char_boundary(end) {
        end -= 1;
    }

    &body[..end]
}

fn log_request(parts: &axum::http::request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!("Received request: {parts:#?}\nbody: {:}...", truncated(body));
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Received request: {parts:#?}\nbody: {body:?}");
    }
}

fn log_response(parts: &axum::http::response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!("Sending response: {parts:#?}\nbody: {:}...", truncated(body));
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {parts:#?}\nbody: {body:?}");
    }
}

#[cfg(test)]
mod logging_tests {
    use axum::{
        Router,
        http::{HeaderMap, header::CONTENT_TYPE},
        middleware,
        routing::post,
    };
    use axum_test::TestServer;

    use super::{
        LOG_BODY_LENGTH_LIMIT, is_json_content_type, logging_middleware, redact_passwords,
        truncated,
    };

    #[test]
    fn redacts_password_fields_in_json() {
        let body = r#"{"email":"foo@bar.baz","password":"hunter22"}"#;

        let redacted = redact_passwords(body);

        assert!(!redacted.contains("hunter22"));
        assert!(redacted.contains("foo@bar.baz"));
        assert!(redacted.contains("********"));
    }

    #[test]
    fn redacts_password_change_fields() {
        let body = r#"{"oldPassword":"hunter22","newPassword":"hunter23"}"#;

        let redacted = redact_passwords(body);

        assert!(!redacted.contains("hunter22"));
        assert!(!redacted.contains("hunter23"));
    }

    #[test]
    fn leaves_non_json_bodies_untouched() {
        assert_eq!(redact_passwords("not json"), "not json");
    }

    #[test]
    fn recognizes_json_content_type_with_charset_parameter() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json; charset=utf-8".parse().unwrap());

        assert!(is_json_content_type(&headers));

        headers.insert(CONTENT_TYPE, "text/plain".parse().unwrap());

        assert!(!is_json_content_type(&headers));
    }

    #[test]
    fn truncation_backs_off_to_char_boundary() {
        // The 'é' straddles the length limit: bytes 63 and 64.
        let body = format!("{}é and then some", "a".repeat(LOG_BODY_LENGTH_LIMIT - 1));

        let prefix = truncated(&body);

        assert_eq!(prefix, "a".repeat(LOG_BODY_LENGTH_LIMIT - 1));
    }

    #[tokio::test]
    async fn multibyte_bodies_are_logged_without_panicking() {
        let _ = tracing_subscriber::fmt().try_init();

        let app = Router::new()
            .route("/echo", post(|body: String| async move { body }))
            .layer(middleware::from_fn(logging_middleware));
        let server = TestServer::new(app);

        let body = format!("{}é", "a".repeat(LOG_BODY_LENGTH_LIMIT - 1));
        let response = server.post("/echo").text(body.clone()).await;

        response.assert_status_ok();
        response.assert_text(body);
    }
}
