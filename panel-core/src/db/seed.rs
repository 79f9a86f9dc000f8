//! Seeding
//!
//! Brings the permission table in line with the catalog and makes sure the
//! built-in roles exist, are protected and carry their default permissions.
//! Safe to run on every start.

use sqlx::SqlitePool;

use super::{permissions, roles};
use crate::config::GranularConfig;
use crate::error::RbacResult;
use crate::rbac::catalog::{BUILTIN_ROLES, default_permissions};
use crate::rbac::mutation::{ROLE_PERMISSIONS, replace_items};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub permissions: usize,
    pub stale_permissions: u64,
    pub roles_created: usize,
}

pub async fn run(pool: &SqlitePool, config: &GranularConfig) -> RbacResult<SeedReport> {
    let mut tx = super::begin_write(pool).await?;
    let mut report = SeedReport::default();

    let (upserted, removed) = permissions::sync_catalog(&mut tx, config).await?;
    report.permissions = upserted;
    report.stale_permissions = removed;

    for builtin in BUILTIN_ROLES {
        let role_id = match roles::find_by_name(&mut *tx, builtin.name).await? {
            Some(role) => {
                sqlx::query("UPDATE role SET protected = 1, deleted = 0 WHERE id = ?")
                    .bind(role.id)
                    .execute(&mut *tx)
                    .await?;
                role.id
            }
            None => {
                report.roles_created += 1;
                roles::insert(&mut *tx, builtin.name, Some(builtin.description), true).await?
            }
        };

        let names: Vec<String> = default_permissions(builtin.name)
            .into_iter()
            .map(|p| config.normalize(p.slug()))
            .collect();
        replace_items(&mut tx, ROLE_PERMISSIONS, role_id, &names).await?;
    }

    tx.commit().await?;

    tracing::info!(
        target: "audit",
        permissions = report.permissions,
        stale = report.stale_permissions,
        roles_created = report.roles_created,
        "Permission catalog seeded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::rbac::catalog::{ADMINISTRATOR_ROLE, ALL_PERMISSIONS, MODERATOR_ROLE, USER_ROLE};
    use crate::rbac::graph::Fidelity;
    use crate::rbac::query;

    async fn permission_count(db: &DbService, role: &str) -> usize {
        let id = roles::find_by_name(&db.pool, role).await.unwrap().unwrap().id;
        let mut conn = db.pool.acquire().await.unwrap();
        query::role(&mut conn, id, Fidelity::Full)
            .await
            .unwrap()
            .unwrap()
            .node
            .permissions
            .len()
    }

    #[tokio::test]
    async fn seeds_catalog_and_builtin_roles() {
        let db = DbService::in_memory().await.unwrap();
        let config = GranularConfig::default();

        let report = run(&db.pool, &config).await.unwrap();
        assert_eq!(report.permissions, ALL_PERMISSIONS.len());
        assert_eq!(report.roles_created, 3);

        for name in [ADMINISTRATOR_ROLE, MODERATOR_ROLE, USER_ROLE] {
            let role = roles::find_by_name(&db.pool, name).await.unwrap().unwrap();
            assert!(role.protected, "{name} should be protected");
        }

        assert_eq!(permission_count(&db, ADMINISTRATOR_ROLE).await, ALL_PERMISSIONS.len());
        assert_eq!(
            permission_count(&db, MODERATOR_ROLE).await,
            default_permissions(MODERATOR_ROLE).len()
        );
        assert_eq!(permission_count(&db, USER_ROLE).await, 4);
    }

    #[tokio::test]
    async fn reseeding_is_stable() {
        let db = DbService::in_memory().await.unwrap();
        let config = GranularConfig::default();
        run(&db.pool, &config).await.unwrap();

        let again = run(&db.pool, &config).await.unwrap();
        assert_eq!(again.roles_created, 0);
        assert_eq!(again.stale_permissions, 0);
        assert_eq!(roles::find_all(&db.pool).await.unwrap().len(), 3);
        assert_eq!(permission_count(&db, USER_ROLE).await, 4);
    }

    #[tokio::test]
    async fn custom_prefix_is_applied() {
        let db = DbService::in_memory().await.unwrap();
        let config = GranularConfig::new(true, "acme");
        run(&db.pool, &config).await.unwrap();

        let all = permissions::find_all(&db.pool).await.unwrap();
        assert!(all.iter().all(|p| p.name.starts_with("acme.")));
    }
}
