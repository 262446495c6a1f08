use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `post_type` tag for wiki articles.
pub const POST_TYPE_WIKI: &str = "wiki";

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "statistic")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub post_type: String,
    pub post_id: i32,
    pub viewed_count: i64,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
