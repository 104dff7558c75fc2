// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dccd: distributed CI crew worker daemon.

use clap::Parser;
use dcc_adapters::{ChatRouter, HttpChatAdapter, MemoryCoord, MemoryDiscovery, NoopChat, SendmailAdapter};
use dcc_core::SystemClock;
use dcc_store::MemoryStore;
use dcc_worker::{daemon, env, Config, DaemonError};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "dccd", about = "distributed CI crew worker", version)]
struct Args {
    /// Path to the TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seize group leadership at startup (bootstrap a stuck group)
    #[arg(long)]
    tyrant: bool,

    /// Listen address override
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("dccd: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), DaemonError> {
    let mut config = match args.config.or_else(env::config_path) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    if args.tyrant {
        config.tyrant = true;
    }
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }

    let state_dir = config.resolve_state_dir()?;
    std::fs::create_dir_all(&state_dir)?;
    let appender = tracing_appender::rolling::daily(state_dir.join("logs"), "worker.log");
    let (writer, _log_guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env::log_filter()))
        .with_writer(writer)
        .with_ansi(false)
        .init();

    let chat = match &config.chat {
        Some(chat) => {
            ChatRouter::Http(HttpChatAdapter::new(chat.room_url.clone(), chat.token.clone()))
        }
        None => ChatRouter::Noop(NoopChat),
    };
    let mail = SendmailAdapter::new(config.mail.sendmail.clone(), config.mail.from.clone());

    // The bundled store and coordination backends serve a single host;
    // multi-host pools plug their own implementations in here.
    let handle = daemon::launch(
        config,
        MemoryStore::new(),
        MemoryCoord::new(SystemClock),
        MemoryDiscovery::new(),
        mail,
        chat,
        SystemClock,
    )
    .await?;

    tracing::info!(uri = %handle.uri(), "worker running");
    shutdown_signal().await;
    tracing::info!("shutting down");
    handle.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
