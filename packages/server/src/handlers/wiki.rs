use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use rand::Rng;
use sea_orm::*;
use tracing::{info, instrument, warn};

use crate::cooldown::CooldownRule;
use crate::entity::{statistic, user, wiki_article};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::client_ip::ClientIp;
use crate::extractors::json::AppJson;
use crate::models::wiki::*;
use crate::state::AppState;

/// Find an article revision by ID or return 404.
async fn find_article<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<wiki_article::Model, AppError> {
    wiki_article::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Article not found".into()))
}

/// The latest revision (highest id) of the family rooted at `root_id`.
async fn find_newest_revision<C: ConnectionTrait>(
    db: &C,
    root_id: i32,
) -> Result<Option<wiki_article::Model>, DbErr> {
    wiki_article::Entity::find()
        .filter(wiki_article::Column::RootId.eq(root_id))
        .order_by_desc(wiki_article::Column::Id)
        .one(db)
        .await
}

/// Validate the form, derive version fields and write the row.
///
/// Runs in one transaction so a first revision is never visible without its `root_id`.
async fn insert_article(
    state: &AppState,
    user_id: i32,
    payload: CreateArticleRequest,
) -> Result<wiki_article::Model, AppError> {
    validate_create_article(&payload, &state.config.wiki)?;

    // A zero root id starts a new family, same as an absent one.
    let root_id = payload.root_id.filter(|&id| id != 0);

    let txn = state.db.begin().await?;

    let version = match root_id {
        Some(root_id) => {
            // No lock: two concurrent revisions of one family can read the same
            // newest row and both take its minor_ver + 1.
            let newest = find_newest_revision(&txn, root_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Root article not found".into()))?;
            ArticleVersion::after(&newest)
        }
        None => ArticleVersion::first(),
    };

    let model = wiki_article::ActiveModel {
        root_id: Set(root_id),
        user_id: Set(user_id),
        title: Set(payload.title.trim().to_string()),
        content: Set(payload.content),
        time: Set(chrono::Utc::now().timestamp()),
        major_ver: Set(version.major_ver),
        minor_ver: Set(version.minor_ver),
        is_current: Set(version.is_current),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    // The id of a new family's first row is its root_id, known only after insert.
    let model = if model.minor_ver == 0 {
        let id = model.id;
        let mut active: wiki_article::ActiveModel = model.into();
        active.root_id = Set(Some(id));
        active.update(&txn).await?
    } else {
        model
    };

    txn.commit().await?;
    Ok(model)
}

/// Create the statistics row for a new article. Failures are logged, not returned.
async fn record_statistic(db: &DatabaseConnection, article_id: i32) {
    let stat = statistic::ActiveModel {
        post_type: Set(statistic::POST_TYPE_WIKI.to_string()),
        post_id: Set(article_id),
        viewed_count: Set(0),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    if let Err(e) = stat.insert(db).await {
        warn!(article_id, "Failed to record statistic: {}", e);
    }
}

/// View count from the article's statistics row, 0 if the row is missing.
async fn find_viewed_count(db: &DatabaseConnection, article_id: i32) -> Result<i64, DbErr> {
    let count = statistic::Entity::find()
        .select_only()
        .column(statistic::Column::ViewedCount)
        .filter(statistic::Column::PostType.eq(statistic::POST_TYPE_WIKI))
        .filter(statistic::Column::PostId.eq(article_id))
        .order_by_asc(statistic::Column::Id)
        .into_tuple::<i64>()
        .one(db)
        .await?;
    Ok(count.unwrap_or(0))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Wiki",
    operation_id = "createArticle",
    summary = "Create an article or a new revision",
    description = "Without `root_id`, starts a new family (version 1.0). With `root_id`, appends a revision after the newest row of that family, keeping its major version and incrementing the minor one. Requires `wiki:create` permission. Rate-limited per client IP and per account; a failed attempt starts a penalty window.",
    request_body = CreateArticleRequest,
    responses(
        (status = 201, description = "Article created", body = ArticleResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Root article not found (NOT_FOUND)", body = ErrorBody),
        (status = 429, description = "Cooldown active (RATE_LIMITED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, root_id = ?payload.root_id))]
pub async fn create_article(
    auth_user: AuthUser,
    ClientIp(ip): ClientIp,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateArticleRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("wiki:create")?;

    let cd = &state.config.cooldown;
    let rules = [
        CooldownRule::new(
            format!("wiki_new:ip:{ip}"),
            cd.new_article_by_ip_secs,
            cd.failed_attempt_secs,
        ),
        CooldownRule::new(
            format!("wiki_new:account:{}", auth_user.user_id),
            cd.new_article_by_account_secs,
            cd.failed_attempt_secs,
        ),
    ];
    state.cooldown.check(&rules).await?;

    let result = insert_article(&state, auth_user.user_id, payload).await;
    state.cooldown.record(&rules, result.is_ok()).await;
    let article = result?;

    record_statistic(&state.db, article.id).await;

    info!(
        id = article.id,
        root_id = ?article.root_id,
        version = %format!("{}.{}", article.major_ver, article.minor_ver),
        "Wiki article created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ArticleResponse::new(article, Some(auth_user.username), 0)),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Wiki",
    operation_id = "listArticles",
    summary = "List article revisions",
    description = "Returns a paginated list of revisions ordered by id. Filter by `root_id` to list one family. Content is omitted from list results.",
    params(ArticleListQuery),
    responses(
        (status = 200, description = "List of revisions", body = ArticleListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ArticleListQuery>,
) -> Result<Json<ArticleListResponse>, AppError> {
    let page = Ord::max(query.page.unwrap_or(1), 1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let sort_order = match query.sort_order.as_deref() {
        None | Some("desc") => Order::Desc,
        Some("asc") => Order::Asc,
        Some(_) => {
            return Err(AppError::Validation(
                "sort_order must be one of: asc, desc".into(),
            ));
        }
    };

    let mut select = wiki_article::Entity::find();
    if let Some(root_id) = query.root_id {
        select = select.filter(wiki_article::Column::RootId.eq(root_id));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let offset = page.saturating_sub(1).saturating_mul(per_page);

    // Pages past the end are empty.
    let data = if offset >= total {
        Vec::new()
    } else {
        select
            .order_by(wiki_article::Column::Id, sort_order)
            .select_only()
            .column(wiki_article::Column::Id)
            .column(wiki_article::Column::RootId)
            .column(wiki_article::Column::UserId)
            .column(wiki_article::Column::Title)
            .column(wiki_article::Column::Time)
            .column(wiki_article::Column::MajorVer)
            .column(wiki_article::Column::MinorVer)
            .column(wiki_article::Column::IsCurrent)
            .offset(Some(offset))
            .limit(Some(per_page))
            .into_model::<ArticleListItem>()
            .all(&state.db)
            .await?
    };

    Ok(Json(ArticleListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Wiki",
    operation_id = "getArticle",
    summary = "Get an article revision by ID",
    description = "Includes the author's username and the view count from the article's statistics row. `author` is null if the account no longer exists.",
    params(("id" = i32, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Article revision", body = ArticleResponse),
        (status = 404, description = "Article not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ArticleResponse>, AppError> {
    let model = find_article(&state.db, id).await?;

    let author = user::Entity::find_by_id(model.user_id)
        .select_only()
        .column(user::Column::Username)
        .into_tuple::<String>()
        .one(&state.db)
        .await?;
    let viewed_count = find_viewed_count(&state.db, model.id).await?;

    Ok(Json(ArticleResponse::new(model, author, viewed_count)))
}

#[utoipa::path(
    get,
    path = "/random",
    tag = "Wiki",
    operation_id = "randomArticle",
    summary = "Pick a random article",
    description = "Returns the id of a uniformly chosen article revision.",
    responses(
        (status = 200, description = "Random article id", body = RandomArticleResponse),
        (status = 404, description = "No articles exist (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn random_article(
    State(state): State<AppState>,
) -> Result<Json<RandomArticleResponse>, AppError> {
    let total = wiki_article::Entity::find().count(&state.db).await?;
    if total == 0 {
        return Err(AppError::NotFound("No articles found".into()));
    }

    let offset = rand::rng().random_range(0..total);

    let id = wiki_article::Entity::find()
        .select_only()
        .column(wiki_article::Column::Id)
        .order_by_asc(wiki_article::Column::Id)
        .offset(Some(offset))
        .limit(Some(1))
        .into_tuple::<i32>()
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("No articles found".into()))?;

    Ok(Json(RandomArticleResponse { id }))
}

#[utoipa::path(
    post,
    path = "/pick_version",
    tag = "Wiki",
    operation_id = "pickArticleVersion",
    summary = "Select the current version of a family (not implemented)",
    description = "Accepted and ignored. Reserved for choosing which revision of a family is current.",
    responses((status = 204, description = "Accepted, no effect")),
)]
pub async fn pick_version() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[utoipa::path(
    post,
    path = "/rollback",
    tag = "Wiki",
    operation_id = "rollbackArticle",
    summary = "Roll a family back to an earlier revision (not implemented)",
    description = "Accepted and ignored. Reserved for restoring an earlier revision.",
    responses((status = 204, description = "Accepted, no effect")),
)]
pub async fn rollback() -> StatusCode {
    StatusCode::NO_CONTENT
}
