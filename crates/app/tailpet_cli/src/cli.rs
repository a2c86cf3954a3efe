use clap::{Parser, Subcommand};

/// Tailpet clinic API client.
#[derive(Parser, Debug)]
#[command(name = "tailpet", about = "Tailpet clinic API client")]
pub struct Cli {
    /// API base URL (overrides TAILPET_API_URL).
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Token file (overrides TAILPET_TOKEN_FILE).
    #[arg(long, global = true)]
    pub token_file: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the token pair.
    Login {
        /// Username or email.
        #[arg(long, short = 'u')]
        username: String,
        /// Password.
        #[arg(long, env = "TAILPET_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Drop the stored session.
    Logout,

    /// Show the logged-in user.
    Whoami,

    /// Show session state and access-token expiry.
    Status,

    /// GET a path relative to the API base and print the JSON body.
    Get {
        /// e.g. `/mascotas/mascotas/3/`
        path: String,
    },

    /// List a collection.
    List {
        /// Collection, e.g. `clientes/clientes`.
        collection: String,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
        /// Filter as `key=value`; repeatable.
        #[arg(long = "filter", short = 'f', value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },

    /// User administration (ADMIN only).
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },

    /// List roles (ADMIN only).
    Roles,

    /// Show version.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum UsersAction {
    List {
        #[arg(long)]
        page: Option<u32>,
    },
    Get {
        id: i64,
    },
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}
