mod config;
mod sink;

use std::env;
use std::process::exit;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use token_vendor_oauth::oauth_core::config::validate;
use token_vendor_oauth::oauth_core::http_client::DEFAULT_MAX_BODY_SIZE;
use token_vendor_oauth::{ReqwestHttpClient, TokenVendor, TracingHttpClient, VendorError};
use config::{CliArgs, Command, USAGE};
use sink::FileTokenSink;

static VERSION: &str = env!("CARGO_PKG_VERSION");

/// Deadline applied to every request sent to the identity provider.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Installs the log subscriber. `RUST_LOG` overrides the default `info` level.
/// Logs go to stderr so stdout only carries the token.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Renders a flow failure the way the user expects to read it.
fn describe(err: &VendorError) -> String {
    match err.step() {
        Some(step) => format!("Error occurred when fetching the {}: {}", step, err),
        None => err.to_string(),
    }
}

/// Main entry point for the token vendor.
///
/// Reads flags (falling back to `CLIENT_ID`, `ISSUER` and `REDIRECT_URI` from the
/// environment), validates them, runs the flow and prints the access token.
///
/// # Example Usage
///
/// ```bash
/// token_vendor -user alice -pw secret -cid 0oa1 \
///     -iss https://dev-123.okta.com/oauth2/default \
///     -callback http://localhost:8080/login/callback -o token.txt
/// ```
fn main() {
    // Skip the program name.
    let args: Vec<String> = env::args().skip(1).collect();
    let cli = match CliArgs::parse(&args) {
        Ok(Command::Run(cli)) => cli,
        Ok(Command::Help) => {
            println!("{}", USAGE);
            exit(0);
        }
        Ok(Command::Version) => {
            println!("token_vendor version: {}", VERSION);
            exit(0);
        }
        Err(msg) => {
            eprintln!("{}", msg);
            eprintln!("{}", USAGE);
            exit(2);
        }
    };

    init_tracing();

    let registration = config::resolve_registration(&cli, |key| env::var(key).ok());
    let credentials = cli.credentials();
    if let Err(e) = validate(&credentials, &registration) {
        eprintln!("{}", e);
        exit(1);
    }
    println!("Configuration Accepted => Let's go get you a token.");

    let http_client = match ReqwestHttpClient::with_limits(DEFAULT_MAX_BODY_SIZE, Some(REQUEST_TIMEOUT)) {
        Ok(client) => TracingHttpClient::new(client),
        Err(e) => {
            eprintln!("Failed to build the HTTP client: {}", e);
            exit(1);
        }
    };
    let mut vendor = TokenVendor::new(http_client, registration);
    if let Some(path) = cli.output_path() {
        vendor = vendor.with_sink(Arc::new(FileTokenSink::new(path)));
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start the async runtime: {}", e);
            exit(1);
        }
    };

    match runtime.block_on(vendor.acquire(&credentials)) {
        Ok(token) => println!("{}", token),
        Err(e) => {
            eprintln!("{}", describe(&e));
            exit(1);
        }
    }
}
