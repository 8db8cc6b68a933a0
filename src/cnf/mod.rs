/// The publicly visible name of the server
pub const PKG_NAME: &str = "sqlgraph";

/// The version of the server
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The description shown by the command-line interface
pub const INFO: &str = "Serves a GraphQL API generated from the structure of a SQLite database";

/// The address the server listens on by default
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// The default log filter directives
pub const DEFAULT_LOG: &str = "info";

/// The path the GraphQL endpoint is served on
pub const GRAPHQL_PATH: &str = "/graphql";

/// The path the health endpoint is served on
pub const HEALTH_PATH: &str = "/health";
