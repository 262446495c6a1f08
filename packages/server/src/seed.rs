use sea_orm::sea_query::{Index, OnConflict, PostgresQueryBuilder, SqliteQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::entity::{role, role_permission, wiki_article};

/// Default roles seeded on startup.
const DEFAULT_ROLES: &[&str] = &["admin", "user", "banned"];

/// Default role-permission mappings seeded on startup. `banned` holds none.
const DEFAULT_MAPPINGS: &[(&str, &str)] = &[("admin", "wiki:create"), ("user", "wiki:create")];

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut roles_inserted = 0u32;
    for &name in DEFAULT_ROLES {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(OnConflict::column(role::Column::Name).do_nothing().to_owned())
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => roles_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if roles_inserted > 0 {
        info!("Seeded {} new roles", roles_inserted);
    }

    let mut perms_inserted = 0u32;
    for &(role, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role.to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => perms_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Newest revision of a family:
    // SELECT ... FROM wiki_article WHERE root_id = ? ORDER BY id DESC LIMIT 1
    let index = Index::create()
        .if_not_exists()
        .name("idx_wiki_article_root_id")
        .table(wiki_article::Entity)
        .col(wiki_article::Column::RootId)
        .col(wiki_article::Column::Id)
        .to_owned();

    let stmt = match db.get_database_backend() {
        DbBackend::Sqlite => index.to_string(SqliteQueryBuilder),
        _ => index.to_string(PostgresQueryBuilder),
    };

    match db.execute_unprepared(&stmt).await {
        Ok(_) => {
            info!("Ensured index idx_wiki_article_root_id exists");
        }
        Err(e) => {
            tracing::warn!("Failed to create index idx_wiki_article_root_id: {}", e);
        }
    }

    Ok(())
}
