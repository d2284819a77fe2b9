//! GraphQL client keeping the user session between runs

use std::io::read_to_string;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use tracing::{debug, info};

use crate::config::{Config, LogFormat};
use crate::context::SessionStore;
use crate::model::AuthToken;
use crate::opt::{Command, Opt};
use crate::route::{Decision, auth_routes};
use crate::service::Operation;
use crate::storage::TokenStorage;

mod config;
pub mod context;
pub mod model;
mod opt;
pub mod route;
mod service;
pub mod storage;

/// Initializes tracing collection
fn setup_tracing(config: config::Logging) -> Result<()> {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let fmt_layer = match config.format {
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    let filter_layer =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let filter_layer = config
        .filters
        .into_iter()
        .fold(filter_layer, |layer, filter| layer.add_directive(filter));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init()?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let Opt { config, command } = Opt::parse();

    let (config, config_path) = match config {
        Some(mut config_file) => {
            let config = read_to_string(&mut config_file)?;
            let config: Config = toml::from_str(&config)?;
            (config, Some(config_file.path().path().to_owned()))
        }
        None => (Config::default(), None),
    };

    setup_tracing(config.logging.clone())?;
    color_eyre::install()?;

    info!(config = ?config_path, endpoint = %config.endpoint, "Tracing initialized");

    let storage: Arc<dyn TokenStorage> = Arc::new(config.storage.open(&config.endpoint)?);
    let session = SessionStore::initialize(storage.clone()).wrap_err("Cannot restore session")?;
    session.subscribe(|session| {
        info!(
            authenticated = session.is_authenticated(),
            sub = ?session.user().and_then(|user| user.subject()),
            "Session changed"
        )
    });

    match command {
        Command::Login { token } => {
            let token = AuthToken::new(token);
            let claims = token.validate()?;
            session.login(claims.clone(), token)?;
            println!("{}", serde_json::to_string_pretty(&claims)?);
        }
        Command::Logout => session.logout()?,
        Command::Whoami => match session.user() {
            Some(user) => println!("{}", serde_json::to_string_pretty(&user)?),
            None => println!("anonymous"),
        },
        Command::Visit { path } => {
            let route = auth_routes().into_iter().find(|route| route.matches(&path));
            match route.map(|route| route.resolve(&session, path.clone())) {
                Some(Decision::Render { component, props }) => {
                    println!("render {component} at {props}")
                }
                Some(Decision::Redirect { to }) => println!("redirect {to}"),
                None => println!("render {path}"),
            }
        }
        Command::Query {
            query,
            variables,
            operation_name,
        } => {
            let mut operation = Operation::new(query);
            if let Some(variables) = variables {
                let variables =
                    serde_json::from_str(&variables).wrap_err("Invalid operation variables")?;
                operation = operation.variables(variables);
            }
            if let Some(name) = operation_name {
                operation = operation.operation_name(name);
            }

            let client = service::bootstrap(config.endpoint, storage);
            let response = client.execute(&operation).await?;
            debug!(
                endpoint = %client.endpoint(),
                errors = response.errors.as_ref().map(Vec::len),
                "Operation executed"
            );
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
