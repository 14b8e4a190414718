//! Operator tool that mints access tokens for the VSS GraphQL gateway.
//!
//! ```text
//! vss-token -s "$SECRET_KEY" -u 7 -p vss.permission.VEHICLE_READ
//! vss-token -a RS256 -k private.pem -p Vehicle.Drivetrain.Transmission.Gear_READ
//! ```

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

use vss_graphql::authz::{AuthError, JwtAlgorithm, PermissionGroups, TokenClaims, TokenIssuer};

#[derive(Parser, Debug)]
#[command(
    name = "vss-token",
    version,
    about = "Issue signed access tokens for the VSS GraphQL gateway"
)]
struct Cli {
    /// Signing algorithm (HS256, RS256, ES256, PS256, none, ...)
    #[arg(short, long, default_value = "HS256")]
    algorithm: String,

    /// PEM private key for asymmetric algorithms
    #[arg(short = 'k', long = "private-key", env = "PRIVATE_KEY_FILE")]
    private_key: Option<PathBuf>,

    /// Shared HMAC secret
    #[arg(short, long, env = "SECRET_KEY", hide_env_values = true)]
    secret: Option<String>,

    /// User id embedded in the token
    #[arg(short, long, default_value_t = 0)]
    uid: i64,

    /// Comma separated permissions or permission group names
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_value = "vss.permission.VEHICLE_READ"
    )]
    permissions: Vec<String>,

    /// YAML file mapping group names to permission lists
    /// [default: scripts/permissions_groups.yaml, when present]
    #[arg(short = 'f', long = "permissions-file")]
    permissions_file: Option<PathBuf>,

    /// Token lifetime in seconds; tokens without it never expire
    #[arg(long)]
    expires_in: Option<u64>,
}

const DEFAULT_GROUPS_FILE: &str = "scripts/permissions_groups.yaml";

fn main() -> Result<()> {
    // stdout carries the token, so logs go to stderr
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let algorithm: JwtAlgorithm = cli.algorithm.parse()?;

    let permissions = permission_groups(&cli)?.expand(&requested_permissions(&cli));
    tracing::debug!(?permissions, "Expanded permissions");

    let key = signing_key(algorithm, &cli)?;
    let issuer = TokenIssuer::new(algorithm, &key)?;
    let claims = TokenClaims::new(cli.uid, permissions);
    let token = issuer.issue(&claims, cli.expires_in.map(Duration::from_secs))?;
    tracing::debug!(algorithm = %issuer.algorithm(), uid = cli.uid, "Issued token");

    println!("{token}");
    Ok(())
}

/// An explicit `--permissions-file` must load. Without one the bundled
/// groups file is used when it exists.
fn permission_groups(cli: &Cli) -> Result<PermissionGroups> {
    if let Some(path) = &cli.permissions_file {
        return Ok(PermissionGroups::load(path)?);
    }
    let default = Path::new(DEFAULT_GROUPS_FILE);
    if default.exists() {
        return Ok(PermissionGroups::load(default)?);
    }
    tracing::warn!(path = DEFAULT_GROUPS_FILE, "No permission groups file; names are used as given");
    Ok(PermissionGroups::new())
}

fn requested_permissions(cli: &Cli) -> Vec<String> {
    cli.permissions
        .iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn signing_key(algorithm: JwtAlgorithm, cli: &Cli) -> Result<Vec<u8>> {
    if algorithm == JwtAlgorithm::None {
        tracing::warn!("Issuing an unsigned token; the gateway will reject it");
        return Ok(Vec::new());
    }

    let private_key = cli
        .private_key
        .as_ref()
        .filter(|p| !p.as_os_str().is_empty());
    if let Some(path) = private_key {
        return std::fs::read(path).into_diagnostic();
    }
    if let Some(secret) = cli.secret.as_ref().filter(|s| !s.is_empty()) {
        if !algorithm.is_symmetric() {
            return Err(AuthError::InvalidKey(format!(
                "{algorithm} needs a PEM private key (--private-key)"
            ))
            .into());
        }
        return Ok(secret.as_bytes().to_vec());
    }
    Err(AuthError::MissingKey.into())
}
