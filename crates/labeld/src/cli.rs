use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// labeld — atproto content-labeler service.
///
/// Publishes signed moderation labels: append-only log, historical
/// queries, authenticated emission, and a live subscription stream.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// The labeler's DID (did:plc:… or did:web:…).
    #[arg(long, env = "LABELD_DID")]
    pub did: String,

    /// 32-byte secp256k1 signing key, hex or base64.
    #[arg(long, env = "LABELD_SIGNING_KEY", hide_env_values = true)]
    pub signing_key: String,

    /// SQLite database path for the label log.
    #[arg(long, env = "LABELD_DB", default_value = "labels.db")]
    pub db: PathBuf,

    /// Address to listen on.
    #[arg(long, env = "LABELD_BIND", default_value = "127.0.0.1:8787")]
    pub bind: SocketAddr,

    /// PLC directory endpoint for DID resolution.
    #[arg(long, env = "LABELD_PLC_URL", default_value = labeld_auth::DEFAULT_PLC_URL)]
    pub plc_url: String,

    /// Additional DIDs allowed to emit events (the labeler's own DID is
    /// always allowed).
    #[arg(long = "allow-did", env = "LABELD_ALLOW_DIDS", value_delimiter = ',')]
    pub allow_dids: Vec<String>,
}
