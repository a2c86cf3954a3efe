//! Subcommand handlers.

use std::sync::Arc;

use serde_json::Value;
use tailpet_core::models::roles::ADMIN;
use tailpet_core::resources::{ListParams, Resource, UserAdmin};
use tailpet_core::storage::FileTokenStorage;
use tailpet_core::{Access, ClientConfig, Navigator, SessionStore, authorize};

use crate::cli::{Cli, Commands, UsersAction};
use crate::{Error, Result};

/// Tells the user how to get back in once the session is gone.
struct CliNavigator;

impl Navigator for CliNavigator {
    fn redirect_to_login(&self) {
        log::warn!("Session expired; run `tailpet login` to sign in again");
    }
}

pub async fn execute(args: &Cli) -> Result<()> {
    if let Commands::Version = args.command {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = load_config(args)?;
    let storage = Arc::new(FileTokenStorage::new(&config.token_file));
    let store = SessionStore::new(&config, storage, Arc::new(CliNavigator))?;
    log::debug!("api {} tokens {}", config.api_base_url, config.token_file.display());

    match &args.command {
        Commands::Login { username, password } => {
            let password = password.as_deref().ok_or_else(|| {
                Error::Custom("Password required: pass --password or set TAILPET_PASSWORD".into())
            })?;
            let user = store.login(username, password).await?;
            println!("Logged in as {} ({})", user.display_name(), user.role);
        }
        Commands::Logout => {
            store.logout().await;
            println!("Logged out.");
        }
        Commands::Whoami => match store.bootstrap().await.user() {
            Some(user) => println!("{} <{}> {}", user.display_name(), user.username, user.role),
            None => println!("Not logged in."),
        },
        Commands::Status => status(&store, &config).await,
        Commands::Get { path } => {
            require(&store, &[]).await?;
            let body: Value = store.gateway().get(path).await?;
            print_json(&body)?;
        }
        Commands::List {
            collection,
            page,
            page_size,
            filters,
        } => {
            require(&store, &[]).await?;
            let params = list_params(*page, *page_size, filters);
            let resource: Resource<Value> = Resource::new(store.gateway(), collection);
            let page = resource.list(&params).await?;
            print_json(&serde_json::to_value(page)?)?;
        }
        Commands::Users { action } => {
            require(&store, &[ADMIN]).await?;
            let admin = UserAdmin::new(store.gateway());
            let body = match action {
                UsersAction::List { page } => {
                    serde_json::to_value(admin.list(&list_params(*page, None, &[])).await?)?
                }
                UsersAction::Get { id } => serde_json::to_value(admin.get(*id).await?)?,
            };
            print_json(&body)?;
        }
        Commands::Roles => {
            require(&store, &[ADMIN]).await?;
            let roles = UserAdmin::new(store.gateway()).roles().await?;
            print_json(&serde_json::to_value(roles)?)?;
        }
        Commands::Version => {}
    }

    Ok(())
}

/// Environment, with command-line flags taking precedence.
fn load_config(args: &Cli) -> Result<ClientConfig> {
    let config = ClientConfig::from_lookup(|key| match key {
        "TAILPET_API_URL" if args.api_url.is_some() => args.api_url.clone(),
        "TAILPET_TOKEN_FILE" if args.token_file.is_some() => args.token_file.clone(),
        _ => std::env::var(key).ok(),
    })?;
    Ok(config)
}

/// Restore the session and check it against `roles` (empty: any user).
async fn require(store: &SessionStore, roles: &[&str]) -> Result<()> {
    let state = store.bootstrap().await;
    match authorize(&state, roles) {
        Access::Granted => Ok(()),
        Access::Pending | Access::RedirectToLogin => Err(Error::NotLoggedIn),
        Access::Forbidden => Err(Error::Forbidden {
            role: state.user().map(|u| u.role.clone()).unwrap_or_default(),
            required: roles.join(", "),
        }),
    }
}

async fn status(store: &SessionStore, config: &ClientConfig) {
    let state = store.bootstrap().await;
    println!("api:     {}", config.api_base_url);
    println!("session: {}", state.name());
    if let Some(user) = state.user() {
        println!("user:    {} ({})", user.username, user.role);
    }
    if let Some(tokens) = state.tokens() {
        match tokens.access_expires_at() {
            Some(at) => println!(
                "expires: {}",
                at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
            ),
            None => println!("expires: unknown"),
        }
    }
}

fn list_params(
    page: Option<u32>,
    page_size: Option<u32>,
    filters: &[(String, String)],
) -> ListParams {
    let mut params = ListParams::new();
    if let Some(page) = page {
        params = params.page(page);
    }
    if let Some(page_size) = page_size {
        params = params.page_size(page_size);
    }
    for (key, value) in filters {
        params = params.filter(key.clone(), value);
    }
    params
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
