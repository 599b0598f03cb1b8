//! tdkg party CLI
//!
//! Command-line interface for local threshold key generation:
//! - Distributed Key Generation (DKG), one task per party over an in-memory relay
//! - Key share inspection and consistency checks
//! - Secret reconstruction from a threshold of key shares

use anyhow::{bail, ensure, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures_util::future::join_all;
use rand::rngs::OsRng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tdkg_core::curve::{point_to_bytes, Curve, Ed25519, Secp256k1};
use tdkg_core::identity::{AuthKey, Ed25519AuthKey};
use tdkg_core::mpc::{agree_on_random, MemoryRelay};
use tdkg_core::sharing::{feldman, Share};
use tdkg_core::{keygen, KeyShare, SessionConfig, SharingId};
use tracing::{info, Level};

/// Relay channel on which parties agree on a session id
const SESSION_CHANNEL: &[u8] = b"tdkg-party/session-id";

/// tdkg party - threshold DKG runner
#[derive(Parser)]
#[command(name = "tdkg-party")]
#[command(about = "Threshold distributed key generation")]
#[command(version)]
struct Cli {
    /// Data directory for key shares
    #[arg(short, long, env = "TDKG_DEST", default_value = "./data")]
    dest: PathBuf,

    /// Curve the group key lives on
    #[arg(short, long, env = "TDKG_CURVE", value_enum, default_value_t = CurveName::Secp256k1)]
    curve: CurveName,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CurveName {
    Secp256k1,
    Ed25519,
}

#[derive(Subcommand)]
enum Commands {
    /// Run distributed key generation among n local parties
    Keygen {
        /// Number of parties
        #[arg(short, long, default_value_t = tdkg_core::DEFAULT_PARTIES)]
        n: usize,

        /// Threshold (t-of-n)
        #[arg(short, long, default_value_t = tdkg_core::DEFAULT_THRESHOLD)]
        t: usize,

        /// Session id (hex). Agreed on by the parties when omitted.
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Show key share info
    Info {
        /// Sharing id of the key share
        #[arg(short, long)]
        id: SharingId,
    },

    /// Check every key share in the data directory against the others
    Verify,

    /// Reconstruct the group secret and check it against the public key
    Combine {
        /// Sharing ids to combine (comma-separated)
        #[arg(short, long)]
        ids: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    // Ensure data directory exists
    std::fs::create_dir_all(&cli.dest)?;

    match cli.curve {
        CurveName::Secp256k1 => dispatch::<Secp256k1>(&cli).await,
        CurveName::Ed25519 => dispatch::<Ed25519>(&cli).await,
    }
}

async fn dispatch<C: Curve>(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Keygen { n, t, session } => run_keygen::<C>(&cli.dest, *n, *t, session.as_deref()).await,
        Commands::Info { id } => show_info::<C>(&cli.dest, *id),
        Commands::Verify => verify_all::<C>(&cli.dest),
        Commands::Combine { ids } => combine::<C>(&cli.dest, ids),
    }
}

async fn run_keygen<C: Curve>(dest: &Path, n: usize, t: usize, session: Option<&str>) -> Result<()> {
    let session_id = session.map(hex::decode).transpose()?;

    info!(n_parties = n, threshold = t, curve = C::NAME, "Starting local DKG");

    let keys: Vec<Arc<Ed25519AuthKey>> = (0..n)
        .map(|_| Arc::new(Ed25519AuthKey::generate(&mut OsRng)))
        .collect();
    let identities: Vec<_> = keys.iter().map(|key| key.identity()).collect();
    if let Some(session_id) = &session_id {
        // Fail before spawning anything
        SessionConfig::new(session_id.clone(), t, identities.clone())?;
    }

    let relay = Arc::new(MemoryRelay::new());
    let handles: Vec<_> = keys
        .into_iter()
        .map(|key| {
            let relay = relay.clone();
            let identities = identities.clone();
            let session_id = session_id.clone();
            tokio::spawn(async move {
                let mut rng = ChaCha20Rng::from_rng(OsRng)
                    .map_err(|e| tdkg_core::Error::Crypto(e.to_string()))?;
                let session_id = match session_id {
                    Some(session_id) => session_id,
                    None => agree_on_random(
                        key.as_ref(),
                        &identities,
                        SESSION_CHANNEL,
                        &mut rng,
                        relay.as_ref(),
                    )
                    .await?
                    .to_vec(),
                };
                let config = SessionConfig::new(session_id, t, identities)?;
                keygen::run_dkg::<C, _, _, _>(key.as_ref(), config, rng, relay.as_ref()).await
            })
        })
        .collect();

    let mut public_key = None;
    for joined in join_all(handles).await {
        let key_share = joined??;

        let key_share_path = key_share_path(dest, key_share.sharing_id);
        std::fs::write(&key_share_path, key_share.to_json()?)?;
        info!(
            sharing_id = key_share.sharing_id,
            path = ?key_share_path,
            "Key share saved"
        );

        public_key.get_or_insert_with(|| key_share.public_key_hex());
    }

    if let Some(public_key) = public_key {
        println!("Public Key: {}", public_key);
    }

    Ok(())
}

fn show_info<C: Curve>(dest: &Path, id: SharingId) -> Result<()> {
    let key_share = load_key_share::<C>(dest, id)?;
    let public_key_share = key_share.signing_key_share.public_key_share();

    println!("Key Share Info:");
    println!("  Curve: {}", key_share.curve);
    println!("  Sharing ID: {}", key_share.sharing_id);
    println!("  N Parties: {}", key_share.n_parties);
    println!("  Threshold: {}", key_share.threshold);
    println!("  Public Key: {}", key_share.public_key_hex());
    println!("  Public Key Share: {}", hex::encode(point_to_bytes(&public_key_share)));

    Ok(())
}

fn verify_all<C: Curve>(dest: &Path) -> Result<()> {
    let key_shares = load_all::<C>(dest)?;
    let Some(first) = key_shares.first() else {
        bail!("No key shares in {}", dest.display());
    };

    first.public_key_shares.validate(first.threshold)?;
    for key_share in &key_shares {
        ensure!(
            key_share.signing_key_share.public_key == first.signing_key_share.public_key,
            "Key share {} has a different public key",
            key_share.sharing_id
        );
        ensure!(
            key_share.public_key_shares == first.public_key_shares,
            "Key share {} has different public key shares",
            key_share.sharing_id
        );
        ensure!(
            key_share.public_key_shares.share(key_share.sharing_id)
                == Some(&key_share.signing_key_share.public_key_share()),
            "Key share {} does not match its public key share",
            key_share.sharing_id
        );
    }

    info!(count = key_shares.len(), "Key shares verified");
    println!(
        "{} key shares consistent with public key {}",
        key_shares.len(),
        first.public_key_hex()
    );

    Ok(())
}

fn combine<C: Curve>(dest: &Path, ids: &str) -> Result<()> {
    let ids: Vec<SharingId> = ids
        .split(',')
        .map(|s| s.trim().parse())
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let key_shares = ids
        .iter()
        .map(|id| load_key_share::<C>(dest, *id))
        .collect::<Result<Vec<_>>>()?;
    let Some(first) = key_shares.first() else {
        bail!("No sharing ids given");
    };
    ensure!(
        key_shares.len() >= first.threshold,
        "Need {} key shares, got {}",
        first.threshold,
        key_shares.len()
    );

    let shares: Vec<Share<C>> = key_shares
        .iter()
        .map(|key_share| Share {
            id: key_share.sharing_id,
            value: key_share.signing_key_share.share,
        })
        .collect();
    let secret = feldman::combine(&shares)?;

    ensure!(
        C::scalar_base_mul(&secret) == first.signing_key_share.public_key,
        "Reconstructed secret does not match the public key"
    );

    info!(ids = ?ids, "Secret reconstructed");
    println!("Reconstructed secret matches public key {}", first.public_key_hex());

    Ok(())
}

fn key_share_path(dest: &Path, id: SharingId) -> PathBuf {
    dest.join(format!("keyshare.{}.json", id))
}

fn load_key_share<C: Curve>(dest: &Path, id: SharingId) -> Result<KeyShare<C>> {
    let json = std::fs::read_to_string(key_share_path(dest, id))?;
    Ok(KeyShare::from_json(&json)?)
}

fn load_all<C: Curve>(dest: &Path) -> Result<Vec<KeyShare<C>>> {
    let mut key_shares = Vec::new();
    for entry in std::fs::read_dir(dest)? {
        let path = entry?.path();
        let is_key_share = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("keyshare.") && name.ends_with(".json"));
        if is_key_share {
            let json = std::fs::read_to_string(&path)?;
            key_shares.push(KeyShare::<C>::from_json(&json)?);
        }
    }
    key_shares.sort_by_key(|key_share| key_share.sharing_id);
    Ok(key_shares)
}
