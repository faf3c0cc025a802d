//! HTTP parameter pollution guard.
//!
//! A query parameter repeated in the URL keeps only its last value. The
//! discarded values are exposed to handlers through [`PollutedQuery`].

use std::collections::HashMap;

use axum::extract::Request;
use axum::http::uri::PathAndQuery;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, warn};
use url::form_urlencoded;

/// Parameters that appeared more than once, with every value seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollutedQuery(pub HashMap<String, Vec<String>>);

/// Collapse repeated query parameters before routing.
pub async fn hpp_guard(mut request: Request, next: Next) -> Response {
    let query = request.uri().query().map(str::to_owned);

    if let Some((cleaned, polluted)) = query.as_deref().and_then(dedupe_query) {
        debug!(params = ?polluted.0.keys().collect::<Vec<_>>(), "collapsed repeated query parameters");

        let path_and_query = format!("{}?{}", request.uri().path(), cleaned);
        match path_and_query.parse::<PathAndQuery>() {
            Ok(path_and_query) => {
                let mut parts = request.uri().clone().into_parts();
                parts.path_and_query = Some(path_and_query);
                match axum::http::Uri::from_parts(parts) {
                    Ok(uri) => *request.uri_mut() = uri,
                    Err(e) => warn!(error = %e, "could not rebuild request uri"),
                }
            }
            Err(e) => warn!(error = %e, "could not rebuild request query"),
        }

        request.extensions_mut().insert(polluted);
    }

    next.run(request).await
}

/// Returns the cleaned query and the polluted parameters, or `None` when no
/// parameter repeats.
pub fn dedupe_query(query: &str) -> Option<(String, PollutedQuery)> {
    let mut order: Vec<String> = Vec::new();
    let mut seen: HashMap<String, Vec<String>> = HashMap::new();

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let values = seen.entry(key.to_string()).or_insert_with(|| {
            order.push(key.to_string());
            Vec::new()
        });
        values.push(value.into_owned());
    }

    if seen.values().all(|values| values.len() == 1) {
        return None;
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for key in &order {
        if let Some(last) = seen.get(key).and_then(|values| values.last()) {
            serializer.append_pair(key, last);
        }
    }

    seen.retain(|_, values| values.len() > 1);
    Some((serializer.finish(), PollutedQuery(seen)))
}
