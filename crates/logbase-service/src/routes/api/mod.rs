use axum::Router;

use crate::AppState;

mod blog;
mod collect;
mod keywords;
mod leads;
mod newsletter;

pub fn create_api_router<S: AppState>() -> Router<S> {
    Router::new()
        .merge(collect::router())
        .merge(keywords::router())
        .merge(blog::router())
        .merge(newsletter::router())
        .merge(leads::router())
}
