use std::{convert::Infallible, sync::Arc};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use warp::{http::StatusCode, Filter, Rejection, Reply};

use crate::catalog::DishRecord;
use crate::engine;
use crate::interpreter::QueryInterpreter;
use crate::query::{FilterId, StructuredFilter};

#[derive(Debug, Deserialize)]
pub struct InterpretRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Active UI filter identifiers. Unrecognized identifiers are ignored.
    #[serde(default)]
    pub filters: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total: usize,
    pub results: Vec<DishRecord>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Builds the full route tree: the menu, the raw interpreter contract and
/// the search pipeline. CORS is open; the consumer is a browser front end.
pub fn routes(
    catalog: Arc<Vec<DishRecord>>,
    interpreter: Arc<QueryInterpreter>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let menu = warp::path!("api" / "menu")
        .and(warp::get())
        .and(with(catalog.clone()))
        .map(|catalog: Arc<Vec<DishRecord>>| warp::reply::json(catalog.as_ref()));

    let interpret = warp::path!("api" / "interpret")
        .and(warp::post())
        .and(warp::body::json())
        .and(with(interpreter.clone()))
        .and_then(handle_interpret);

    let search = warp::path!("api" / "search")
        .and(warp::post())
        .and(warp::body::json())
        .and(with(catalog))
        .and(with(interpreter))
        .and_then(handle_search);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST"]);

    menu.or(interpret).or(search).with(cors)
}

fn with<T: Clone + Send>(
    value: T,
) -> impl Filter<Extract = (T,), Error = Infallible> + Clone {
    warp::any().map(move || value.clone())
}

/// `POST /api/interpret`: the raw extraction contract, `{"query"}` in,
/// a structured filter out. Consumers treat any non-200 as "no filter".
async fn handle_interpret(
    request: InterpretRequest,
    interpreter: Arc<QueryInterpreter>,
) -> Result<impl Reply, Infallible> {
    let query = request.query.trim();
    if query.is_empty() {
        return Ok(warp::reply::with_status(
            warp::reply::json(&ErrorBody {
                error: "query must not be empty".to_string(),
            }),
            StatusCode::BAD_REQUEST,
        ));
    }

    match interpreter.interpret(query).await {
        Ok(filter) => Ok(warp::reply::with_status(
            warp::reply::json(&filter),
            StatusCode::OK,
        )),
        Err(error) => {
            warn!("query interpretation failed: {error:#}");
            Ok(warp::reply::with_status(
                warp::reply::json(&ErrorBody {
                    error: "failed to interpret query".to_string(),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}

/// `POST /api/search`: the full pipeline. A blank query skips the
/// interpreter entirely; an interpreter failure degrades to an empty
/// filter so search still answers with name matches or the filtered
/// catalog.
async fn handle_search(
    request: SearchRequest,
    catalog: Arc<Vec<DishRecord>>,
    interpreter: Arc<QueryInterpreter>,
) -> Result<impl Reply, Infallible> {
    let query = request.query.trim();
    let active_filters = parse_filter_ids(&request.filters);

    let structured = if query.is_empty() {
        StructuredFilter::default()
    } else {
        match interpreter.interpret(query).await {
            Ok(filter) => filter,
            Err(error) => {
                warn!("query interpretation failed, degrading to name match: {error:#}");
                StructuredFilter::default()
            }
        }
    };

    let results = engine::search(&catalog, query, &structured, &active_filters);
    info!("search {query:?} returned {} dishes", results.len());

    Ok(warp::reply::json(&SearchResponse {
        query: query.to_string(),
        total: results.len(),
        results,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

fn parse_filter_ids(raw: &[String]) -> Vec<FilterId> {
    raw.iter().filter_map(|id| FilterId::parse(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog, settings};

    /// Routes backed by the embedded menu and an interpreter pointing at a
    /// closed port, so every model call fails fast and exercises the
    /// degradation path.
    fn test_routes() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
        let dishes = Arc::new(catalog::load(None).unwrap());
        let interpreter = Arc::new(
            QueryInterpreter::new(&settings::Interpreter {
                ollama_url: "http://127.0.0.1:9".to_string(),
                model: "test".to_string(),
                timeout_secs: 1,
            })
            .unwrap(),
        );
        routes(dishes, interpreter)
    }

    #[tokio::test]
    async fn menu_returns_the_full_catalog() {
        let response = warp::test::request()
            .method("GET")
            .path("/api/menu")
            .reply(&test_routes())
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let dishes: Vec<DishRecord> = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(dishes.len(), catalog::load(None).unwrap().len());
    }

    #[tokio::test]
    async fn interpret_rejects_a_blank_query() {
        let response = warp::test::request()
            .method("POST")
            .path("/api/interpret")
            .json(&serde_json::json!({ "query": "   " }))
            .reply(&test_routes())
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn interpret_reports_extraction_failure_as_500() {
        let response = warp::test::request()
            .method("POST")
            .path("/api/interpret")
            .json(&serde_json::json!({ "query": "vegan spicy food" }))
            .reply(&test_routes())
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn blank_query_applies_active_filters_to_the_catalog() {
        let response = warp::test::request()
            .method("POST")
            .path("/api/search")
            .json(&serde_json::json!({ "query": "  ", "filters": ["popular"] }))
            .reply(&test_routes())
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: SearchResponseProbe = serde_json::from_slice(response.body()).unwrap();
        assert!(!body.results.is_empty());
        assert!(body.results.iter().all(|d| d.is_popular));
        assert_eq!(body.total, body.results.len());
    }

    #[tokio::test]
    async fn search_degrades_to_name_match_when_interpreter_is_unreachable() {
        let response = warp::test::request()
            .method("POST")
            .path("/api/search")
            .json(&serde_json::json!({ "query": "chicken tikka masala" }))
            .reply(&test_routes())
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: SearchResponseProbe = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.results.len(), 1);
        assert_eq!(body.results[0].name, "Chicken Tikka Masala");
    }

    #[tokio::test]
    async fn unknown_filter_ids_are_ignored() {
        let response = warp::test::request()
            .method("POST")
            .path("/api/search")
            .json(&serde_json::json!({ "query": "", "filters": ["keto", "popular"] }))
            .reply(&test_routes())
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: SearchResponseProbe = serde_json::from_slice(response.body()).unwrap();
        assert!(body.results.iter().all(|d| d.is_popular));
    }

    /// Deserialization target for responses in tests; `SearchResponse`
    /// itself is serialize-only.
    #[derive(Deserialize)]
    struct SearchResponseProbe {
        total: usize,
        results: Vec<DishRecord>,
    }
}
