//! CLI error type with miette diagnostics and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

/// Process exit codes, stable for scripting.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 5;
    pub const TIMEOUT: i32 = 6;
}

/// Everything that can go wrong between argument parsing and output.
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("no router configured")]
    #[diagnostic(
        code(miroute::no_config),
        help(
            "add a [[routers]] entry to {path} or pass --router with MIROUTE_PASSWORD set in the environment"
        )
    )]
    NoConfig { path: String },

    #[error("router '{name}' not found in configuration")]
    #[diagnostic(
        code(miroute::router_not_found),
        help("configured routers: {available}")
    )]
    RouterNotFound { name: String, available: String },

    #[error("no password configured for router '{router}'")]
    #[diagnostic(
        code(miroute::no_password),
        help("set `password` in the [[routers]] entry or export the variable named by `password_env`")
    )]
    NoPassword { router: String },

    #[error("invalid {field}: {reason}")]
    #[diagnostic(code(miroute::validation))]
    Validation { field: String, reason: String },

    #[error("polling '{router}' failed and no cached data is available")]
    #[diagnostic(
        code(miroute::cycle_failed),
        help("check the address and password; run with -v to see the failing requests")
    )]
    CycleFailed { router: String },

    #[error("config loading failed: {0}")]
    #[diagnostic(code(miroute::config))]
    Config(Box<figment::Error>),

    #[error("router request failed: {0}")]
    #[diagnostic(code(miroute::api))]
    Api(#[from] miroute_api::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(miroute::io))]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map the error to its process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoConfig { .. } | Self::NoPassword { .. } | Self::Validation { .. } => {
                exit_code::USAGE
            }
            Self::RouterNotFound { .. } => exit_code::NOT_FOUND,
            Self::Api(err) => api_exit_code(err),
            Self::CycleFailed { .. } => exit_code::CONNECTION,
            Self::Config(_) | Self::Io(_) => exit_code::GENERAL,
        }
    }
}

fn api_exit_code(err: &miroute_api::Error) -> i32 {
    use miroute_api::Error;
    match err {
        Error::Authentication { .. } | Error::TokenExpired | Error::NotAuthenticated => {
            exit_code::AUTH
        }
        Error::Transport(inner) if inner.is_timeout() => exit_code::TIMEOUT,
        Error::Transport(_) => exit_code::CONNECTION,
        Error::InvalidUrl(_) => exit_code::USAGE,
        Error::Api { .. } | Error::Deserialization { .. } => exit_code::GENERAL,
    }
}
