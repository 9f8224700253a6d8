use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use company_authz::authz::{AccessRequest, AuthzService, Scope};
use company_authz::cache::PermissionCache;

#[derive(Parser, Debug)]
#[command(author, version, about = "company-authz permission inspector", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate whether a user may perform an action on a resource
    Check {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        resource: String,
        #[arg(long)]
        action: String,
        /// Evaluate within this company instead of the global scope
        #[arg(long)]
        company: Option<Uuid>,
    },
    /// Print the resolved permission set of a role
    Effective {
        #[arg(long)]
        role: Uuid,
    },
    /// List the role names a user holds in a scope
    RolesForUser {
        #[arg(long)]
        user: Uuid,
        /// `*` or `company:<uuid>`
        #[arg(long, default_value = "*")]
        scope: String,
    },
    /// List the users holding a role in a scope
    UsersForRole {
        #[arg(long)]
        role: String,
        /// `*` or `company:<uuid>`
        #[arg(long, default_value = "*")]
        scope: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();
    let pool = get_pool().await?;
    // One-shot process: nothing to gain from caching.
    let (authz, _worker) = AuthzService::new(pool, PermissionCache::disabled(), 1);

    match cli.command {
        Commands::Check {
            user,
            resource,
            action,
            company,
        } => {
            let mut request = AccessRequest::new(user, resource, action);
            request.company_id = company;
            let decision = authz.check(&request).await?;
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
        Commands::Effective { role } => {
            let set = authz.effective_permissions(role).await?;
            println!("{}", serde_json::to_string_pretty(&set)?);
        }
        Commands::RolesForUser { user, scope } => {
            let scope: Scope = scope.parse()?;
            for name in authz.roles_for_user(user, scope).await? {
                println!("{}", name);
            }
        }
        Commands::UsersForRole { role, scope } => {
            let scope: Scope = scope.parse()?;
            for id in authz.users_for_role(&role, scope).await? {
                println!("{}", id);
            }
        }
    }

    Ok(())
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}
