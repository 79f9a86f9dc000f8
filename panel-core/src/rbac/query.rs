//! Query layer
//!
//! Hydrates users, roles and groups with their relational closure at a given
//! [`Fidelity`]. Each call issues a fixed number of statements regardless of
//! how many entities it returns: rows are fetched per relation for the whole
//! scope, then assembled into graphs (which is where soft-deleted
//! roles/groups/members are dropped).
//!
//! Not found is `Ok(None)`; the caller decides whether that is an error.

use std::collections::HashMap;

use shared::models::{
    FullUser, Group, Listing, MinUser, Permission, Role, RoleGroup, User, UserConfig,
};
use sqlx::SqliteConnection;

use super::graph::{Edges, Fidelity, GroupGraph, RoleGraph, UserNode};
use super::transform;
use crate::db;
use crate::error::RbacResult;

#[derive(sqlx::FromRow)]
struct Owned<T> {
    owner_id: i64,
    #[sqlx(flatten)]
    item: T,
}

type OwnedRows<T> = Vec<Owned<T>>;

fn group_by_owner<T>(rows: OwnedRows<T>) -> HashMap<i64, Vec<T>> {
    let mut map: HashMap<i64, Vec<T>> = HashMap::new();
    for row in rows {
        map.entry(row.owner_id).or_default().push(row.item);
    }
    map
}

/// Scope: `?1` = only this id, `?2` = every id except this one
const USER_SCOPE: &str = "(?1 IS NULL OR u.id = ?1) AND (?2 IS NULL OR u.id <> ?2)";

async fn fetch_owned<T>(
    conn: &mut SqliteConnection,
    sql: &str,
    scope: &[Option<i64>],
) -> RbacResult<OwnedRows<T>>
where
    T: Send + Unpin,
    for<'r> Owned<T>: sqlx::FromRow<'r, sqlx::sqlite::SqliteRow>,
{
    let mut query = sqlx::query_as::<_, Owned<T>>(sql);
    for id in scope {
        query = query.bind(*id);
    }
    Ok(query.fetch_all(&mut *conn).await?)
}

// ========== Users ==========

async fn load_users(
    conn: &mut SqliteConnection,
    only: Option<i64>,
    except: Option<i64>,
    fidelity: Fidelity,
) -> RbacResult<Vec<UserNode>> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT u.id, u.email, u.verified, u.deleted, u.root, u.created_at FROM auth_user u WHERE {USER_SCOPE} ORDER BY u.created_at, u.id"
    ))
    .bind(only)
    .bind(except)
    .fetch_all(&mut *conn)
    .await?;

    if users.is_empty() {
        return Ok(Vec::new());
    }

    let mut configs: HashMap<i64, UserConfig> = sqlx::query_as::<_, UserConfig>(&format!(
        "SELECT c.id, c.user_id, c.displayname, c.firstname, c.lastname, c.mobile FROM user_config c JOIN auth_user u ON u.id = c.user_id WHERE {USER_SCOPE}"
    ))
    .bind(only)
    .bind(except)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|c| (c.user_id, c))
    .collect();

    if fidelity == Fidelity::Min {
        return Ok(users
            .into_iter()
            .map(|u| {
                let config = configs.remove(&u.id);
                UserNode::bare(u, config)
            })
            .collect());
    }

    let mut user_roles = group_by_owner(
        fetch_owned::<Role>(
            conn,
            &format!(
                "SELECT ur.user_id AS owner_id, r.id, r.name, r.description, r.deleted, r.protected \
                 FROM users_to_roles ur JOIN role r ON r.id = ur.role_id JOIN auth_user u ON u.id = ur.user_id \
                 WHERE {USER_SCOPE} ORDER BY r.name"
            ),
            &[only, except],
        )
        .await?,
    );

    let mut user_groups = group_by_owner(
        fetch_owned::<Group>(
            conn,
            &format!(
                "SELECT ug.user_id AS owner_id, g.id, g.name, g.description, g.deleted \
                 FROM users_to_groups ug JOIN user_group g ON g.id = ug.group_id JOIN auth_user u ON u.id = ug.user_id \
                 WHERE {USER_SCOPE} ORDER BY g.name"
            ),
            &[only, except],
        )
        .await?,
    );

    let scoped_groups = format!(
        "SELECT ug.group_id FROM users_to_groups ug JOIN auth_user u ON u.id = ug.user_id WHERE {USER_SCOPE}"
    );

    let mut edges = Edges::default();
    for row in fetch_owned::<Role>(
        conn,
        &format!(
            "SELECT gr.group_id AS owner_id, r.id, r.name, r.description, r.deleted, r.protected \
             FROM groups_to_roles gr JOIN role r ON r.id = gr.role_id \
             WHERE gr.group_id IN ({scoped_groups}) ORDER BY r.name"
        ),
        &[only, except],
    )
    .await?
    {
        edges.add_group_role(row.owner_id, row.item);
    }

    let mut user_permissions = HashMap::new();
    if fidelity == Fidelity::Full {
        user_permissions = group_by_owner(
            fetch_owned::<Permission>(
                conn,
                &format!(
                    "SELECT up.user_id AS owner_id, p.name, p.description \
                     FROM users_to_permissions up JOIN permission p ON p.name = up.permission_name JOIN auth_user u ON u.id = up.user_id \
                     WHERE {USER_SCOPE} ORDER BY p.name"
                ),
                &[only, except],
            )
            .await?,
        );

        for row in fetch_owned::<Permission>(
            conn,
            &format!(
                "SELECT gp.group_id AS owner_id, p.name, p.description \
                 FROM groups_to_permissions gp JOIN permission p ON p.name = gp.permission_name \
                 WHERE gp.group_id IN ({scoped_groups}) ORDER BY p.name"
            ),
            &[only, except],
        )
        .await?
        {
            edges.add_group_permission(row.owner_id, row.item);
        }

        for row in fetch_owned::<Permission>(
            conn,
            &format!(
                "SELECT pr.role_id AS owner_id, p.name, p.description \
                 FROM permissions_to_roles pr JOIN permission p ON p.name = pr.permission_name \
                 WHERE pr.role_id IN ( \
                     SELECT ur.role_id FROM users_to_roles ur JOIN auth_user u ON u.id = ur.user_id WHERE {USER_SCOPE} \
                     UNION \
                     SELECT gr.role_id FROM groups_to_roles gr WHERE gr.group_id IN ({scoped_groups}) \
                 ) ORDER BY p.name"
            ),
            &[only, except],
        )
        .await?
        {
            edges.add_role_permission(row.owner_id, row.item);
        }
    }

    Ok(users
        .into_iter()
        .map(|u| {
            let id = u.id;
            UserNode::assemble(
                fidelity,
                u,
                configs.remove(&id),
                user_permissions.remove(&id).unwrap_or_default(),
                user_roles.remove(&id).unwrap_or_default(),
                user_groups.remove(&id).unwrap_or_default(),
                &edges,
            )
        })
        .collect())
}

/// One user with its closure at `fidelity`
pub async fn user(
    conn: &mut SqliteConnection,
    id: i64,
    fidelity: Fidelity,
) -> RbacResult<Option<UserNode>> {
    Ok(load_users(conn, Some(id), None, fidelity)
        .await?
        .into_iter()
        .next())
}

/// Full view shortcut used by the mutation and access layers
pub async fn full_user(conn: &mut SqliteConnection, id: i64) -> RbacResult<Option<FullUser>> {
    Ok(user(conn, id, Fidelity::Full)
        .await?
        .map(|node| transform::to_full_user(&node)))
}

/// Every user (optionally excluding the caller), live and deleted apart
pub async fn users(
    conn: &mut SqliteConnection,
    fidelity: Fidelity,
    except: Option<i64>,
) -> RbacResult<Listing<UserNode>> {
    let nodes = load_users(conn, None, except, fidelity).await?;
    Ok(Listing::partition(nodes, |n| n.user.deleted))
}

// ========== Members ==========

/// Users joined through `junction.owner_column`, keyed by owner id, with configs
async fn members(
    conn: &mut SqliteConnection,
    junction: &str,
    owner_column: &str,
    owner: Option<i64>,
) -> RbacResult<HashMap<i64, Vec<MinUser>>> {
    let rows = fetch_owned::<User>(
        conn,
        &format!(
            "SELECT j.{owner_column} AS owner_id, u.id, u.email, u.verified, u.deleted, u.root, u.created_at \
             FROM {junction} j JOIN auth_user u ON u.id = j.user_id \
             WHERE (?1 IS NULL OR j.{owner_column} = ?1) ORDER BY u.created_at, u.id"
        ),
        &[owner],
    )
    .await?;

    let configs: HashMap<i64, UserConfig> = sqlx::query_as::<_, UserConfig>(&format!(
        "SELECT c.id, c.user_id, c.displayname, c.firstname, c.lastname, c.mobile FROM user_config c \
         WHERE c.user_id IN (SELECT j.user_id FROM {junction} j WHERE ?1 IS NULL OR j.{owner_column} = ?1)"
    ))
    .bind(owner)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|c| (c.user_id, c))
    .collect();

    let mut map: HashMap<i64, Vec<MinUser>> = HashMap::new();
    for row in rows {
        let config = configs.get(&row.item.id).cloned();
        map.entry(row.owner_id).or_default().push(MinUser {
            user: row.item,
            config,
        });
    }
    Ok(map)
}

// ========== Roles ==========

async fn load_roles(
    conn: &mut SqliteConnection,
    only: Option<i64>,
    fidelity: Fidelity,
) -> RbacResult<Vec<RoleGraph>> {
    let roles = sqlx::query_as::<_, Role>(
        "SELECT id, name, description, deleted, protected FROM role WHERE ?1 IS NULL OR id = ?1 ORDER BY name",
    )
    .bind(only)
    .fetch_all(&mut *conn)
    .await?;

    if roles.is_empty() {
        return Ok(Vec::new());
    }

    let mut permissions = HashMap::new();
    let mut group_permissions = HashMap::new();
    if fidelity == Fidelity::Full {
        permissions = group_by_owner(
            fetch_owned::<Permission>(
                conn,
                "SELECT pr.role_id AS owner_id, p.name, p.description \
                 FROM permissions_to_roles pr JOIN permission p ON p.name = pr.permission_name \
                 WHERE (?1 IS NULL OR pr.role_id = ?1) ORDER BY p.name",
                &[only],
            )
            .await?,
        );
        group_permissions = group_by_owner(
            fetch_owned::<Permission>(
                conn,
                "SELECT gp.group_id AS owner_id, p.name, p.description \
                 FROM groups_to_permissions gp JOIN permission p ON p.name = gp.permission_name \
                 WHERE gp.group_id IN (SELECT gr.group_id FROM groups_to_roles gr WHERE ?1 IS NULL OR gr.role_id = ?1) \
                 ORDER BY p.name",
                &[only],
            )
            .await?,
        );
    }

    let (mut users, mut groups) = if fidelity == Fidelity::Min {
        (HashMap::new(), HashMap::new())
    } else {
        let users = members(conn, "users_to_roles", "role_id", only).await?;
        let groups = group_by_owner(
            fetch_owned::<Group>(
                conn,
                "SELECT gr.role_id AS owner_id, g.id, g.name, g.description, g.deleted \
                 FROM groups_to_roles gr JOIN user_group g ON g.id = gr.group_id \
                 WHERE (?1 IS NULL OR gr.role_id = ?1) ORDER BY g.name",
                &[only],
            )
            .await?,
        );
        (users, groups)
    };

    Ok(roles
        .into_iter()
        .map(|role| {
            let id = role.id;
            RoleGraph::assemble(
                fidelity,
                role,
                permissions.remove(&id).unwrap_or_default(),
                users.remove(&id).unwrap_or_default(),
                groups
                    .remove(&id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|group| RoleGroup {
                        permissions: group_permissions.get(&group.id).cloned().unwrap_or_default(),
                        group,
                    })
                    .collect(),
            )
        })
        .collect())
}

pub async fn role(
    conn: &mut SqliteConnection,
    id: i64,
    fidelity: Fidelity,
) -> RbacResult<Option<RoleGraph>> {
    Ok(load_roles(conn, Some(id), fidelity).await?.into_iter().next())
}

/// Administrative role listing, by name
pub async fn roles_listing(
    conn: &mut SqliteConnection,
    fidelity: Fidelity,
) -> RbacResult<Listing<RoleGraph>> {
    let graphs = load_roles(conn, None, fidelity).await?;
    Ok(Listing::partition(graphs, |g| g.node.role.deleted))
}

/// Live roles for pickers, by name
pub async fn available_roles(conn: &mut SqliteConnection) -> RbacResult<Vec<Role>> {
    db::roles::find_available(&mut *conn).await
}

// ========== Groups ==========

async fn load_groups(
    conn: &mut SqliteConnection,
    only: Option<i64>,
    fidelity: Fidelity,
) -> RbacResult<Vec<GroupGraph>> {
    let groups = sqlx::query_as::<_, Group>(
        "SELECT id, name, description, deleted FROM user_group WHERE ?1 IS NULL OR id = ?1 ORDER BY name",
    )
    .bind(only)
    .fetch_all(&mut *conn)
    .await?;

    if groups.is_empty() {
        return Ok(Vec::new());
    }

    let mut edges = Edges::default();
    let mut users = HashMap::new();

    if fidelity != Fidelity::Min {
        for row in fetch_owned::<Role>(
            conn,
            "SELECT gr.group_id AS owner_id, r.id, r.name, r.description, r.deleted, r.protected \
             FROM groups_to_roles gr JOIN role r ON r.id = gr.role_id \
             WHERE (?1 IS NULL OR gr.group_id = ?1) ORDER BY r.name",
            &[only],
        )
        .await?
        {
            edges.add_group_role(row.owner_id, row.item);
        }
        users = members(conn, "users_to_groups", "group_id", only).await?;
    }

    if fidelity == Fidelity::Full {
        for row in fetch_owned::<Permission>(
            conn,
            "SELECT gp.group_id AS owner_id, p.name, p.description \
             FROM groups_to_permissions gp JOIN permission p ON p.name = gp.permission_name \
             WHERE (?1 IS NULL OR gp.group_id = ?1) ORDER BY p.name",
            &[only],
        )
        .await?
        {
            edges.add_group_permission(row.owner_id, row.item);
        }

        for row in fetch_owned::<Permission>(
            conn,
            "SELECT pr.role_id AS owner_id, p.name, p.description \
             FROM permissions_to_roles pr JOIN permission p ON p.name = pr.permission_name \
             WHERE pr.role_id IN (SELECT gr.role_id FROM groups_to_roles gr WHERE ?1 IS NULL OR gr.group_id = ?1) \
             ORDER BY p.name",
            &[only],
        )
        .await?
        {
            edges.add_role_permission(row.owner_id, row.item);
        }
    }

    Ok(groups
        .into_iter()
        .map(|group| {
            let id = group.id;
            GroupGraph::assemble(fidelity, group, users.remove(&id).unwrap_or_default(), &edges)
        })
        .collect())
}

pub async fn group(
    conn: &mut SqliteConnection,
    id: i64,
    fidelity: Fidelity,
) -> RbacResult<Option<GroupGraph>> {
    Ok(load_groups(conn, Some(id), fidelity).await?.into_iter().next())
}

/// Administrative group listing, by name
pub async fn groups_listing(
    conn: &mut SqliteConnection,
    fidelity: Fidelity,
) -> RbacResult<Listing<GroupGraph>> {
    let graphs = load_groups(conn, None, fidelity).await?;
    Ok(Listing::partition(graphs, |g| g.node.group.deleted))
}

pub async fn available_groups(conn: &mut SqliteConnection) -> RbacResult<Vec<Group>> {
    db::groups::find_available(&mut *conn).await
}

/// Every permission row, by name
pub async fn permissions(conn: &mut SqliteConnection) -> RbacResult<Vec<Permission>> {
    db::permissions::find_all(&mut *conn).await
}
