//! panel-admin - operator CLI for the permission store
//!
//! Migrates and seeds the database, inspects users and edits their grants.
//! Reads the same environment as the library (`DATABASE_URL`, `LOG_LEVEL`, ...).

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use shared::models::{UserConfigCreate, UserCreate};

use panel_core::rbac::{query, transform};
use panel_core::{Authorizer, Config, DbService, Fidelity, Mutations, db, load_principal};

#[derive(Parser)]
#[command(name = "panel-admin")]
#[command(about = "Granular permission store administration")]
#[command(version)]
struct Cli {
    /// Overrides DATABASE_URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum View {
    Full,
    Safe,
    Min,
}

impl From<View> for Fidelity {
    fn from(view: View) -> Self {
        match view {
            View::Full => Fidelity::Full,
            View::Safe => Fidelity::Safe,
            View::Min => Fidelity::Min,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations
    Migrate,
    /// Sync the permission catalog and built-in roles
    Seed,
    /// Register a user (the first one becomes root)
    CreateUser {
        email: String,
        #[arg(long)]
        unverified: bool,
    },
    /// Complete a user's profile
    Setup {
        user_id: i64,
        #[arg(long)]
        displayname: String,
        #[arg(long)]
        firstname: String,
        #[arg(long)]
        lastname: Option<String>,
        #[arg(long)]
        mobile: Option<String>,
    },
    /// Print a user's view as JSON
    Inspect {
        user_id: i64,
        #[arg(long, value_enum, default_value = "full")]
        view: View,
    },
    /// List users, roles and groups split into active and deleted
    List {
        #[arg(long, value_enum, default_value = "safe")]
        view: View,
    },
    /// Check whether a user holds all of the given permissions
    Check {
        user_id: i64,
        #[arg(required = true)]
        permissions: Vec<String>,
    },
    /// Grant direct permissions to a user
    Grant {
        user_id: i64,
        #[arg(required = true)]
        permissions: Vec<String>,
    },
    /// Revoke direct permissions from a user
    Revoke {
        user_id: i64,
        #[arg(required = true)]
        permissions: Vec<String>,
    },
    /// Attach roles to a user
    AssignRole {
        user_id: i64,
        #[arg(required = true)]
        role_ids: Vec<i64>,
    },
    /// Detach roles from a user
    RemoveRole {
        user_id: i64,
        #[arg(required = true)]
        role_ids: Vec<i64>,
    },
    /// Add a user to groups
    Join {
        user_id: i64,
        #[arg(required = true)]
        group_ids: Vec<i64>,
    },
    /// Remove a user from groups
    Leave {
        user_id: i64,
        #[arg(required = true)]
        group_ids: Vec<i64>,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    panel_core::init_logger(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    let store = DbService::new(&config)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;
    let mutations = Mutations::new(store.pool.clone(), config.granular.clone());

    match cli.command {
        Commands::Migrate => {
            tracing::info!("Database is up to date");
        }
        Commands::Seed => {
            let report = db::seed::run(&store.pool, &config.granular).await?;
            println!(
                "{} permissions ({} stale removed), {} roles created",
                report.permissions, report.stale_permissions, report.roles_created
            );
        }
        Commands::CreateUser { email, unverified } => {
            let user = db::users::create(
                &store.pool,
                UserCreate {
                    email,
                    verified: !unverified,
                },
            )
            .await?;
            print_json(&user)?;
        }
        Commands::Setup {
            user_id,
            displayname,
            firstname,
            lastname,
            mobile,
        } => {
            let profile = db::users::complete_setup(
                &store.pool,
                user_id,
                UserConfigCreate {
                    displayname,
                    firstname,
                    lastname,
                    mobile,
                },
            )
            .await?;
            print_json(&profile)?;
        }
        Commands::Inspect { user_id, view } => {
            let mut conn = store.pool.acquire().await?;
            let node = query::user(&mut conn, user_id, view.into())
                .await?
                .with_context(|| format!("user {user_id} not found"))?;
            print_json(&transform::user_view(&node))?;
        }
        Commands::List { view } => {
            let fidelity = Fidelity::from(view);
            let mut conn = store.pool.acquire().await?;

            let users = query::users(&mut conn, fidelity, None).await?;
            let roles = query::roles_listing(&mut conn, fidelity).await?;
            let groups = query::groups_listing(&mut conn, fidelity).await?;

            print_json(&serde_json::json!({
                "users": {
                    "active": users.active.iter().map(transform::user_view).collect::<Vec<_>>(),
                    "deleted": users.deleted.iter().map(transform::user_view).collect::<Vec<_>>(),
                },
                "roles": {
                    "active": roles.active.iter().map(transform::role_view).collect::<Vec<_>>(),
                    "deleted": roles.deleted.iter().map(transform::role_view).collect::<Vec<_>>(),
                },
                "groups": {
                    "active": groups.active.iter().map(transform::group_view).collect::<Vec<_>>(),
                    "deleted": groups.deleted.iter().map(transform::group_view).collect::<Vec<_>>(),
                },
            }))?;
        }
        Commands::Check {
            user_id,
            permissions,
        } => {
            let principal = load_principal(&store.pool, user_id).await?;
            let authorizer = Authorizer::new(config.granular.clone());
            let allowed = authorizer.can(&principal, permissions);
            println!("{}", if allowed { "allowed" } else { "denied" });
        }
        Commands::Grant {
            user_id,
            permissions,
        } => mutations.assign_permissions_to_user(user_id, &permissions).await?,
        Commands::Revoke {
            user_id,
            permissions,
        } => {
            mutations
                .remove_permissions_from_user(user_id, &permissions)
                .await?
        }
        Commands::AssignRole { user_id, role_ids } => {
            mutations.assign_roles_to_user(user_id, &role_ids).await?
        }
        Commands::RemoveRole { user_id, role_ids } => {
            mutations.remove_roles_from_user(user_id, &role_ids).await?
        }
        Commands::Join { user_id, group_ids } => {
            mutations.add_user_to_groups(user_id, &group_ids).await?
        }
        Commands::Leave { user_id, group_ids } => {
            mutations.remove_groups_from_user(user_id, &group_ids).await?
        }
    }

    Ok(())
}
