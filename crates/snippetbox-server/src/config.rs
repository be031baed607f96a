use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use snippetbox_crypto::PasswordParams;
use snippetbox_db::DEFAULT_READER_POOL_SIZE;

/// Snippetbox - paste and share text snippets
#[derive(Parser, Debug)]
#[command(name = "snippetbox")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Listen address; ":8000" listens on every interface
    #[arg(long, env = "SNIPPETBOX_ADDR", default_value = ":8000")]
    pub addr: String,

    /// SQLite database path or file: URI
    #[arg(long, env = "SNIPPETBOX_DSN")]
    pub dsn: String,

    /// Directory holding html/ templates and static/ assets
    #[arg(long, env = "SNIPPETBOX_UI_DIR", default_value = "./ui")]
    pub ui_dir: PathBuf,

    /// Read-only connections in the database pool
    #[arg(long, env = "SNIPPETBOX_DB_READERS", default_value_t = DEFAULT_READER_POOL_SIZE)]
    pub db_readers: usize,

    /// Argon2 memory cost in KiB
    #[arg(long, env = "SNIPPETBOX_ARGON2_MEMORY_KIB", default_value_t = 19 * 1024)]
    pub argon2_memory_kib: u32,

    /// Argon2 time cost
    #[arg(long, env = "SNIPPETBOX_ARGON2_ITERATIONS", default_value_t = 2)]
    pub argon2_iterations: u32,

    /// Argon2 lanes
    #[arg(long, env = "SNIPPETBOX_ARGON2_PARALLELISM", default_value_t = 1)]
    pub argon2_parallelism: u32,

    /// Send session cookies without the Secure attribute (plain-HTTP development)
    #[arg(long, env = "SNIPPETBOX_INSECURE_COOKIES")]
    pub insecure_cookies: bool,

    /// Seconds between sweeps of expired sessions
    #[arg(long, env = "SNIPPETBOX_SESSION_PRUNE_SECS", default_value_t = 300)]
    pub session_prune_secs: u64,
}

impl Config {
    /// Socket address to bind. A bare `:port` binds all interfaces.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let addr = match self.addr.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{}", port),
            None => self.addr.clone(),
        };
        addr.parse()
            .with_context(|| format!("invalid listen address {:?}", self.addr))
    }

    pub fn password_params(&self) -> Result<PasswordParams> {
        PasswordParams::new(
            self.argon2_memory_kib,
            self.argon2_iterations,
            self.argon2_parallelism,
        )
        .context("invalid argon2 parameters")
    }

    /// Reject settings that would only fail later.
    pub fn validate(&self) -> Result<()> {
        if self.dsn.trim().is_empty() {
            bail!("--dsn must not be empty");
        }
        if self.db_readers == 0 {
            bail!("--db-readers must be at least 1");
        }
        if self.session_prune_secs == 0 {
            bail!("--session-prune-secs must be at least 1");
        }
        self.password_params()?;
        self.listen_addr()?;
        Ok(())
    }
}
