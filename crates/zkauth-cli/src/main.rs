use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use zkauth_backends::ChainBackend;
use zkauth_core::backend::{BackendTag, StorageBackend};
use zkauth_core::{session_token, twofactor, AuthCore, AuthCoreConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "zkauth: threshold-sharded, non-custodial authentication, demo CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Run register -> login -> session encrypt/decrypt against fresh
    /// in-memory backends, all within this one process.
    Demo {
        /// 64-char hex public key identifying the user.
        #[arg(long, default_value = "1111111111111111111111111111111111111111111111111111111111111111")]
        pk: String,
        #[arg(long, default_value_t = 2)]
        threshold: u8,
        #[arg(long, default_value_t = 3)]
        total_shares: u8,
    },
    /// TOTP operations.
    Totp {
        #[command(subcommand)]
        action: TotpAction,
    },
    /// One-shot backup-code generation.
    BackupCodes,
    /// Session-token operations. Each invocation mints its own signing key,
    /// so `verify` only makes sense piped straight from `create`.
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand, Debug)]
enum TotpAction {
    /// Generate a fresh base32 secret and an otpauth:// URI.
    Generate {
        #[arg(long, default_value = "demo@zkauth")]
        account: String,
        #[arg(long, default_value = "zkauth")]
        issuer: String,
    },
    /// Print the current 6-digit code for a secret.
    Code { secret: String },
    /// Verify a code against a secret (accepts +-1 step of drift).
    Verify { secret: String, code: String },
}

#[derive(Subcommand, Debug)]
enum SessionAction {
    Create {
        #[arg(long, default_value = "zk-demo")]
        zk_id: String,
        #[arg(long, default_value = "user@example.com")]
        email: String,
        #[arg(long, default_value = "g-demo")]
        google_user_id: String,
        #[arg(long)]
        ttl_secs: Option<i64>,
    },
    Verify {
        wire: String,
    },
}

fn three_in_memory_backends() -> BTreeMap<BackendTag, Arc<dyn StorageBackend>> {
    let mut backends: BTreeMap<BackendTag, Arc<dyn StorageBackend>> = BTreeMap::new();
    backends.insert(BackendTag::Zcash, Arc::new(ChainBackend::new(BackendTag::Zcash)));
    backends.insert(BackendTag::Starknet, Arc::new(ChainBackend::new(BackendTag::Starknet)));
    backends.insert(BackendTag::Solana, Arc::new(ChainBackend::new(BackendTag::Solana)));
    backends
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Demo {
            pk,
            threshold,
            total_shares,
        } => {
            let config = AuthCoreConfig::new(three_in_memory_backends())
                .with_threshold(threshold)
                .with_total_shares(total_shares);
            let core = AuthCore::new(config)?;

            let registered = core.register(&pk).await?;
            println!("registered user_id={}", registered.user_id);
            println!("master_key_hash={}", registered.master_key_hash);
            for share in &registered.shares {
                println!("  share[{}] = {}", share.x, share.y);
            }

            let logged_in = core.login(&pk).await?;
            println!(
                "login ok: shares_used={} user_id={}",
                logged_in.shares_used, logged_in.user_id
            );

            let session = core.create_session(&logged_in, None);
            let envelope = session.encrypt(b"Hello")?;
            let plaintext = session.decrypt(&envelope)?;
            println!("session round-trip: {}", String::from_utf8_lossy(&plaintext));
        }
        Cmd::Totp { action } => match action {
            TotpAction::Generate { account, issuer } => {
                let secret = twofactor::generate_totp_secret();
                let uri = twofactor::generate_uri(&secret, &account, &issuer);
                println!("secret={secret}");
                println!("uri={uri}");
            }
            TotpAction::Code { secret } => {
                let now = chrono::Utc::now().timestamp() as u64;
                println!("{}", twofactor::generate_at(&secret, now)?);
            }
            TotpAction::Verify { secret, code } => {
                println!("{}", twofactor::verify_totp_now(&code, &secret));
            }
        },
        Cmd::BackupCodes => {
            let (displayed, hashes) = twofactor::generate_backup_codes();
            for (code, hash) in displayed.iter().zip(hashes.iter()) {
                println!("{code}  sha256={hash}");
            }
        }
        Cmd::Session { action } => match action {
            SessionAction::Create {
                zk_id,
                email,
                google_user_id,
                ttl_secs,
            } => {
                let signing_key = SigningKey::generate(&mut OsRng);
                let token = session_token::create(&zk_id, &email, &google_user_id, &signing_key, ttl_secs)?;
                println!("{}", session_token::encode(&token)?);
            }
            SessionAction::Verify { wire } => {
                let token = session_token::decode(&wire)?;
                let payload = session_token::verify(&token)?;
                println!("{}", serde_json::to_string_pretty(&payload)?);
            }
        },
    }
    Ok(())
}
