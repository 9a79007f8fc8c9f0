use axum::body::Bytes;
use query_orchestrator::QueryRequest;

use crate::error_handler::AppResult;

/// Merges the JSON body (if any) over query-string parameters.
///
/// Body fields win; parameters fill the gaps, so
/// `POST /query?question=...&top_k=3` works without a body.
pub fn merge_request(params: QueryRequest, body: &Bytes) -> AppResult<QueryRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(params);
    }
    let body: QueryRequest = serde_json::from_slice(body)?;
    Ok(body.or(params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_overrides_params() {
        let params = QueryRequest {
            question: "from params".into(),
            top_k: Some(2),
            ..QueryRequest::default()
        };
        let merged =
            merge_request(params.clone(), &Bytes::from_static(br#"{"question":"from body"}"#))
                .unwrap();
        assert_eq!(merged.question, "from body");
        assert_eq!(merged.top_k, Some(2));

        let only = merge_request(params, &Bytes::new()).unwrap();
        assert_eq!(only.question, "from params");

        assert!(merge_request(QueryRequest::default(), &Bytes::from_static(b"{oops")).is_err());
    }
}
