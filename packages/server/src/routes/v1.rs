use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/wiki", wiki_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
}

fn wiki_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::wiki::list_articles,
            handlers::wiki::create_article
        ))
        .routes(routes!(handlers::wiki::random_article))
        .routes(routes!(handlers::wiki::pick_version))
        .routes(routes!(handlers::wiki::rollback))
        .routes(routes!(handlers::wiki::get_article))
}
