//! Coachdesk CLI: operator tool for tenant paths, role rosters and tenants.
//!
//! Configuration comes from the environment (see `Config::from_env`). Set
//! STORE_BACKEND=local and LOCAL_STORE_PATH to work against a persistent store.

use anyhow::Context;
use clap::{Parser, Subcommand};
use coachdesk_cli::{init_tracing, role_tenant, session_tenant};
use coachdesk_core::models::{NewTenant, RoleScope};
use coachdesk_core::{resolve_collection, resolve_document, resolve_subcollection, Config};
use coachdesk_db::{AccessControl, RoleCache, TenantLocator, TenantRepository};
use coachdesk_store::create_store;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "coachdesk", about = "Coachdesk tenancy and roles CLI")]
struct Cli {
    /// Tenant to act in (defaults to TENANT_ID)
    #[arg(long, global = true)]
    tenant: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve tenant-scoped storage paths
    Path {
        #[command(subcommand)]
        sub: PathCommands,
    },
    /// Role roster operations
    Role {
        #[command(subcommand)]
        sub: RoleCommands,
    },
    /// Tenant operations
    Tenant {
        #[command(subcommand)]
        sub: TenantCommands,
    },
}

#[derive(Subcommand)]
enum PathCommands {
    /// tenants/{tenant}/{collection}
    Collection { collection: String },
    /// tenants/{tenant}/{collection}/{id}
    Document { collection: String, id: String },
    /// tenants/{tenant}/{collection}/{id}/{subcollection}
    Subcollection {
        collection: String,
        id: String,
        subcollection: String,
    },
}

#[derive(Subcommand)]
enum RoleCommands {
    /// Check whether a user holds a role
    Check {
        role: String,
        user: String,
        /// Use the platform roster instead of the tenant's
        #[arg(long)]
        platform: bool,
    },
    /// Add a user to a roster
    Grant {
        role: String,
        user: String,
        /// User performing the change
        #[arg(long)]
        actor: String,
        #[arg(long)]
        platform: bool,
    },
    /// Remove a user from a roster
    Revoke {
        role: String,
        user: String,
        #[arg(long)]
        actor: String,
        #[arg(long)]
        platform: bool,
    },
    /// List roster members
    List {
        role: String,
        #[arg(long)]
        platform: bool,
    },
    /// Resolve a user's highest role in the tenant
    Whoami { user: String },
}

#[derive(Subcommand)]
enum TenantCommands {
    /// Create a new tenant
    Create { id: String, name: String },
    /// Show a tenant
    Show { id: String },
    /// Archive a tenant
    Archive { id: String },
    /// List all tenants
    List,
    /// Find the tenant a user belongs to
    Detect {
        user: String,
        /// Previously selected tenant to validate first
        #[arg(long)]
        saved: Option<String>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let session = session_tenant(cli.tenant.as_deref(), &config)?;
    let tenant = session.current()?.map(|t| t.to_string());

    if let Commands::Path { sub } = &cli.command {
        let path = match sub {
            PathCommands::Collection { collection } => {
                resolve_collection(tenant.as_deref(), collection)?
            }
            PathCommands::Document { collection, id } => {
                resolve_document(tenant.as_deref(), collection, id)?
            }
            PathCommands::Subcollection {
                collection,
                id,
                subcollection,
            } => resolve_subcollection(tenant.as_deref(), collection, id, subcollection)?,
        };
        return print_json(&serde_json::json!({ "path": path }));
    }

    let store = create_store(&config)
        .await
        .context("Failed to initialize document store")?;

    let mut access = AccessControl::new(store.clone());
    if let Some(cache) = RoleCache::from_config(&config) {
        access = access.with_cache(cache);
    }

    match cli.command {
        Commands::Path { .. } => {}
        Commands::Role { sub } => match sub {
            RoleCommands::Check {
                role,
                user,
                platform,
            } => {
                let tenant = role_tenant(platform, &session)?;
                let has_role = access
                    .roles()
                    .has_role(tenant.as_deref(), &role, &user)
                    .await?;
                print_json(&serde_json::json!({
                    "tenant": tenant,
                    "role": role,
                    "user": user,
                    "hasRole": has_role,
                }))?;
            }
            RoleCommands::Grant {
                role,
                user,
                actor,
                platform,
            } => {
                let tenant = role_tenant(platform, &session)?;
                access
                    .grant_role(&actor, tenant.as_deref(), &role, &user)
                    .await?;
                print_json(&serde_json::json!({
                    "success": true,
                    "message": format!("Granted {} to {}", role, user),
                }))?;
            }
            RoleCommands::Revoke {
                role,
                user,
                actor,
                platform,
            } => {
                let tenant = role_tenant(platform, &session)?;
                access
                    .revoke_role(&actor, tenant.as_deref(), &role, &user)
                    .await?;
                print_json(&serde_json::json!({
                    "success": true,
                    "message": format!("Revoked {} from {}", role, user),
                }))?;
            }
            RoleCommands::List { role, platform } => {
                let tenant = role_tenant(platform, &session)?;
                let scope = RoleScope::from_tenant(tenant.as_deref())?;
                match access.roles().get_roster(&scope, &role).await? {
                    Some(roster) => print_json(&roster)?,
                    None => print_json(&serde_json::json!({ "role": role, "uids": [] }))?,
                }
            }
            RoleCommands::Whoami { user } => {
                let tenant = role_tenant(false, &session)?;
                let role = access
                    .resolve_user_role_cached(tenant.as_deref(), &user)
                    .await?;
                print_json(&role.summary())?;
            }
        },
        Commands::Tenant { sub } => {
            let tenants = TenantRepository::new(store.clone());
            match sub {
                TenantCommands::Create { id, name } => {
                    let tenant = tenants.create(NewTenant { id, name }).await?;
                    print_json(&tenant)?;
                }
                TenantCommands::Show { id } => {
                    let tenant = tenants
                        .get(&id)
                        .await?
                        .with_context(|| format!("Tenant {} not found", id))?;
                    print_json(&tenant)?;
                }
                TenantCommands::Archive { id } => {
                    let tenant = tenants.archive(&id).await?;
                    print_json(&tenant)?;
                }
                TenantCommands::List => {
                    print_json(&tenants.list().await?)?;
                }
                TenantCommands::Detect { user, saved } => {
                    let locator = TenantLocator::new(store.clone());
                    let found = locator.detect_tenant(&user, saved.as_deref()).await?;
                    print_json(&serde_json::json!({ "user": user, "tenant": found }))?;
                }
            }
        }
    }

    Ok(())
}
