use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use crate::config::WikiConfig;
use crate::entity::wiki_article;
use crate::error::{AppError, FieldErrors};

pub use super::shared::Pagination;

/// Request body for creating an article or a new revision of one.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateArticleRequest {
    /// Article title. Surrounding whitespace is trimmed before length checks.
    #[serde(default)]
    #[schema(example = "Borrow checker")]
    pub title: String,
    /// Article body in Markdown.
    #[serde(default)]
    #[schema(example = "The borrow checker enforces ownership rules at compile time.")]
    pub content: String,
    /// Family to append a revision to. Omit, or pass 0, to start a new family.
    #[schema(example = 12)]
    pub root_id: Option<i32>,
}

/// Validate the title/content form, collecting every failing field.
pub fn validate_create_article(
    payload: &CreateArticleRequest,
    limits: &WikiConfig,
) -> Result<(), AppError> {
    let mut errors = FieldErrors::new();

    let title = payload.title.trim();
    if title.is_empty() {
        errors
            .entry("title".into())
            .or_default()
            .push("This field is required.".into());
    } else {
        let len = title.chars().count();
        if len < limits.title_min_length || len > limits.title_max_length {
            errors.entry("title".into()).or_default().push(format!(
                "Title must be {}-{} characters",
                limits.title_min_length, limits.title_max_length
            ));
        }
    }

    if payload.content.trim().is_empty() {
        errors
            .entry("content".into())
            .or_default()
            .push("This field is required.".into());
    } else if payload.content.chars().count() > limits.content_max_length {
        errors.entry("content".into()).or_default().push(format!(
            "Content must be 1-{} characters",
            limits.content_max_length
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::InvalidForm(errors))
    }
}

/// Version fields stamped onto a row before it is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArticleVersion {
    pub major_ver: i32,
    pub minor_ver: i32,
    pub is_current: bool,
}

impl ArticleVersion {
    /// Version of the first revision of a new family.
    pub fn first() -> Self {
        Self {
            major_ver: 1,
            minor_ver: 0,
            is_current: true,
        }
    }

    /// Version of a revision appended after `newest`, the latest row of its family.
    pub fn after(newest: &wiki_article::Model) -> Self {
        Self {
            major_ver: newest.major_ver,
            minor_ver: newest.minor_ver + 1,
            is_current: false,
        }
    }
}

/// Full article revision.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ArticleResponse {
    #[schema(example = 12)]
    pub id: i32,
    /// Id of the first revision in this family.
    #[schema(example = 12)]
    pub root_id: Option<i32>,
    #[schema(example = 3)]
    pub user_id: i32,
    #[schema(example = "Borrow checker")]
    pub title: String,
    pub content: String,
    /// Creation time in epoch seconds.
    #[schema(example = 1760000000)]
    pub time: i64,
    #[schema(example = 1)]
    pub major_ver: i32,
    #[schema(example = 0)]
    pub minor_ver: i32,
    pub is_current: bool,
    /// Username of the author, if the account still exists.
    #[schema(example = "alice")]
    pub author: Option<String>,
    #[schema(example = 0)]
    pub viewed_count: i64,
}

impl ArticleResponse {
    pub fn new(m: wiki_article::Model, author: Option<String>, viewed_count: i64) -> Self {
        Self {
            id: m.id,
            root_id: m.root_id,
            user_id: m.user_id,
            title: m.title,
            content: m.content,
            time: m.time,
            major_ver: m.major_ver,
            minor_ver: m.minor_ver,
            is_current: m.is_current,
            author,
            viewed_count,
        }
    }
}

/// Article revision without its content, as returned by listings.
#[derive(Serialize, FromQueryResult, utoipa::ToSchema)]
pub struct ArticleListItem {
    pub id: i32,
    pub root_id: Option<i32>,
    pub user_id: i32,
    pub title: String,
    pub time: i64,
    pub major_ver: i32,
    pub minor_ver: i32,
    pub is_current: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ArticleListResponse {
    pub data: Vec<ArticleListItem>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ArticleListQuery {
    /// Page number (1-based, default 1).
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    pub per_page: Option<u64>,
    /// Only list revisions of this family.
    pub root_id: Option<i32>,
    /// `asc` or `desc` (default) by id.
    pub sort_order: Option<String>,
}

/// Id of a randomly chosen article.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RandomArticleResponse {
    #[schema(example = 12)]
    pub id: i32,
}
