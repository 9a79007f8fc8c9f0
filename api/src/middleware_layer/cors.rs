use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Origins allowed to call the API from a browser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CorsPolicy {
    Any,
    List(Vec<String>),
}

impl CorsPolicy {
    /// Parses `ALLOWED_ORIGINS`: `*` or a comma-separated origin list.
    pub fn parse(raw: &str) -> Self {
        let list: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if list.is_empty() || list.iter().any(|s| s == "*") {
            CorsPolicy::Any
        } else {
            CorsPolicy::List(list)
        }
    }

    pub fn from_env() -> Self {
        Self::parse(&std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "*".into()))
    }

    fn allow(&self, origin: &str) -> bool {
        match self {
            CorsPolicy::Any => true,
            CorsPolicy::List(list) => list.iter().any(|o| o == origin),
        }
    }
}

fn decorate(headers: &mut HeaderMap, origin: &HeaderValue) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.append(header::VARY, HeaderValue::from_static("origin"));
}

/// Answers preflight requests and stamps allowed origins on responses.
pub async fn cors(
    State(policy): State<Arc<CorsPolicy>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .filter(|o| o.to_str().is_ok_and(|s| policy.allow(s)))
        .cloned();

    let preflight = req.method() == Method::OPTIONS
        && req
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);

    if preflight {
        let mut res = StatusCode::NO_CONTENT.into_response();
        if let Some(origin) = &origin {
            let h = res.headers_mut();
            decorate(h, origin);
            h.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET, POST, OPTIONS"),
            );
            let requested = req
                .headers()
                .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
                .cloned()
                .unwrap_or_else(|| HeaderValue::from_static("content-type"));
            h.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested);
            h.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("600"));
        }
        return res;
    }

    let mut res = next.run(req).await;
    if let Some(origin) = &origin {
        decorate(res.headers_mut(), origin);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_origin_lists() {
        assert_eq!(CorsPolicy::parse("*"), CorsPolicy::Any);
        assert_eq!(CorsPolicy::parse(""), CorsPolicy::Any);
        let p = CorsPolicy::parse("http://a.test/, http://b.test");
        assert!(p.allow("http://a.test"));
        assert!(!p.allow("http://c.test"));
    }
}
