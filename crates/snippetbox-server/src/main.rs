mod config;
mod prune;
mod serve;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use snippetbox_db::{Database, SessionStore, SqliteSessionStore, SqliteSnippetModel, SqliteUserModel};
use snippetbox_web::{AppStateInner, TemplateCache, router, session_layer};
use tracing::{Level, error, info, warn};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use crate::config::Config;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // Warnings and errors go to stderr, everything else to stdout.
    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .or_else(std::io::stdout);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "snippetbox=info,snippetbox_server=info,snippetbox_web=info,snippetbox_db=info,tower_http=info"
                    .into()
            }),
        )
        .with_writer(writer)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = Config::parse();
    if let Err(e) = run(config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    config.validate()?;
    let addr = config.listen_addr()?;

    let db = Arc::new(
        Database::open(&config.dsn, config.db_readers).context("failed to open database")?,
    );

    let templates = TemplateCache::load(&config.ui_dir.join("html"))?;
    let session_store: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::new(db.clone()));

    let state = Arc::new(AppStateInner {
        snippets: Arc::new(SqliteSnippetModel::new(db.clone())),
        users: Arc::new(SqliteUserModel::new(db.clone(), config.password_params()?)?),
        templates,
        sessions: session_layer(session_store.clone(), !config.insecure_cookies),
    });
    if config.insecure_cookies {
        warn!("Session cookies are sent without the Secure attribute");
    }

    let pruner = tokio::spawn(prune::run_prune_loop(
        session_store,
        config.session_prune_secs,
    ));

    let app = router(state, &config.ui_dir.join("static"));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Starting server on {}", addr);

    serve::serve(listener, app, serve::IDLE_TIMEOUT, shutdown_signal()).await;

    pruner.abort();
    db.close();
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
