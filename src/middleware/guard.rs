//! Query-parameter key guard.
//!
//! API keys are header-only. A key smuggled through a query parameter is
//! rejected with a 400 regardless of its validity, so secrets never land in
//! access logs or browser history. Applied outermost, before any auth runs.

use axum::{extract::Request, middleware::Next, response::Response};

use crate::error::AppError;

const FORBIDDEN_PARAMS: [&str; 3] = ["api_key", "apikey", "x-api-key"];

pub async fn block_query_api_keys(request: Request, next: Next) -> Result<Response, AppError> {
    if let Some(query) = request.uri().query() {
        if has_forbidden_param(query) {
            tracing::warn!("API key passed via query params (blocked)");
            return Err(AppError::Validation(
                "API keys must be sent via headers only".to_string(),
            ));
        }
    }

    Ok(next.run(request).await)
}

fn has_forbidden_param(query: &str) -> bool {
    url::form_urlencoded::parse(query.as_bytes())
        .any(|(name, _)| FORBIDDEN_PARAMS.contains(&name.to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_names_detected_case_insensitively() {
        assert!(has_forbidden_param("api_key=orbynt-abc"));
        assert!(has_forbidden_param("APIKEY=x"));
        assert!(has_forbidden_param("foo=1&X-Api-Key=x"));
    }

    #[test]
    fn ordinary_queries_pass() {
        assert!(!has_forbidden_param("key=memory-key"));
        assert!(!has_forbidden_param("node_a=a&node_b=b"));
        assert!(!has_forbidden_param(""));
    }
}
