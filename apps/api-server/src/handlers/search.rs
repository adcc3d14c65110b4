//! Search handler.

use actix_web::{HttpResponse, web};

use inkwell_core::search::search_posts;
use inkwell_shared::dto::{SearchParams, SearchResponse};

use super::views;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/search?q=
pub async fn search(
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> AppResult<HttpResponse> {
    let query = params.into_inner().q.unwrap_or_default();
    if query.trim().is_empty() {
        return Ok(HttpResponse::Ok().json(SearchResponse {
            query,
            results: Vec::new(),
        }));
    }

    let posts = state.content.list_published_posts().await?;
    let results = search_posts(&posts, &query)
        .into_iter()
        .cloned()
        .map(views::post)
        .collect();
    tracing::debug!(query = %query, "Search served");

    Ok(HttpResponse::Ok().json(SearchResponse { query, results }))
}
