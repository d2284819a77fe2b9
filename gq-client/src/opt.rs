use clap::{Parser, Subcommand};
use clio::Input;

#[derive(Debug, Parser)]
#[command(name = "gq-client", about = "GraphQL API client keeping the user session")]
pub struct Opt {
    /// Config file path
    #[arg(short, long, value_parser)]
    pub config: Option<Input>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Logs in with a token issued by the API
    Login {
        /// Token returned by the login or register mutation
        token: String,
    },
    /// Logs out, forgetting the stored token
    Logout,
    /// Shows the logged in user
    Whoami,
    /// Shows what navigating to the path would render
    Visit {
        /// Application path, eg. `/login`
        path: String,
    },
    /// Executes a GraphQL operation as the logged in user
    Query {
        /// GraphQL document
        query: String,
        /// Operation variables as a JSON object
        #[arg(long)]
        variables: Option<String>,
        /// Operation to execute if the document contains many
        #[arg(long = "operation")]
        operation_name: Option<String>,
    },
}
