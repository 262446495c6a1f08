use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One revision of a wiki entry. Rows sharing a `root_id` form a revision family.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wiki_article")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Id of the first revision in the family. NULL only between the insert of
    /// a first revision and the backfill that follows it.
    pub root_id: Option<i32>,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String, // in Markdown
    pub time: i64, // epoch seconds

    pub major_ver: i32,
    pub minor_ver: i32,
    /// Set on the first revision of a family only.
    pub is_current: bool,
}

impl ActiveModelBehavior for ActiveModel {}
