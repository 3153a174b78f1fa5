//! Command-line flags and environment defaults.

use token_vendor_oauth::{ClientRegistration, Credentials};

/// Environment variables consulted for the client registration.
pub const ENV_CLIENT_ID: &str = "CLIENT_ID";
pub const ENV_ISSUER: &str = "ISSUER";
pub const ENV_REDIRECT_URI: &str = "REDIRECT_URI";

pub const USAGE: &str = r#"Usage: token_vendor -user <username> -pw <password> [options]
- `-user <username>`: The username associated with your application. 
- `-pw <password>`: The password associated with your application. 
- `-cid <client id>`: The client ID configured for your application (default: $CLIENT_ID). 
- `-iss <issuer>`: The ISSUER configured for your application (default: $ISSUER). 
- `-callback <uri>`: One of the REDIRECT URIs configured in your application (default: $REDIRECT_URI). 
- `-o <file>`: Write the access token to the provided file. 
- `-version`: Prints the version. 
"#;

/// Parsed command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub user: String,
    pub pw: String,
    pub cid: String,
    pub iss: String,
    pub callback: String,
    pub out: String,
}

/// What the command line asked for.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Run(CliArgs),
    Help,
    Version,
}

impl CliArgs {
    /// Parse flags in `-name value`, `-name=value` or `--name value` form.
    pub fn parse(args: &[String]) -> Result<Command, String> {
        let mut parsed = CliArgs::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let flag = arg.trim_start_matches('-');
            if flag.len() == arg.len() {
                return Err(format!("Unexpected argument: {}", arg));
            }
            let (name, inline) = match flag.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (flag, None),
            };
            match name {
                "h" | "help" => return Ok(Command::Help),
                "version" => return Ok(Command::Version),
                _ => {}
            }
            let slot = match name {
                "user" => &mut parsed.user,
                "pw" => &mut parsed.pw,
                "cid" => &mut parsed.cid,
                "iss" => &mut parsed.iss,
                "callback" => &mut parsed.callback,
                "o" => &mut parsed.out,
                _ => return Err(format!("Unknown flag: {}", arg)),
            };
            *slot = match inline {
                Some(value) => value,
                None => iter
                    .next()
                    .cloned()
                    .ok_or_else(|| format!("Flag needs a value: {}", arg))?,
            };
        }
        Ok(Command::Run(parsed))
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.user.clone(), self.pw.clone())
    }

    /// Registration given on the command line; blank where a flag was omitted.
    pub fn registration(&self) -> ClientRegistration {
        ClientRegistration::new(self.cid.clone(), self.iss.clone(), self.callback.clone())
    }

    /// Output path for the token, if one was given.
    pub fn output_path(&self) -> Option<&str> {
        let out = self.out.trim();
        if out.is_empty() { None } else { Some(out) }
    }
}

/// Registration defaults read through `lookup` (normally `std::env::var`).
pub fn registration_from_env<F>(lookup: F) -> ClientRegistration
where
    F: Fn(&str) -> Option<String>,
{
    ClientRegistration::new(
        lookup(ENV_CLIENT_ID).unwrap_or_default(),
        lookup(ENV_ISSUER).unwrap_or_default(),
        lookup(ENV_REDIRECT_URI).unwrap_or_default(),
    )
}

/// Environment first, non-blank flags on top.
pub fn resolve_registration<F>(args: &CliArgs, lookup: F) -> ClientRegistration
where
    F: Fn(&str) -> Option<String>,
{
    registration_from_env(lookup).merge(args.registration())
}
