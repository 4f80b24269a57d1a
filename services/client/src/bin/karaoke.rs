//! services/client/src/bin/karaoke.rs

use clap::{Parser, Subcommand};
use client_lib::{
    adapters::{FileCapabilityStore, HttpSessionApi},
    config::Config,
    error::ClientError,
    render::{render_header, render_queue},
};
use karaoke_queue_core::{entry, AccessCode, Capabilities, ItemId, SessionApi, SessionView};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "karaoke", about = "Join and manage shared karaoke song queues")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Remember the name your songs are queued under.
    Name { name: String },
    /// Create a new session.
    Create {
        #[arg(long)]
        title: String,
        /// Password needed to mark songs done and delete them.
        #[arg(long)]
        password: String,
        /// Request a specific six-digit access code.
        #[arg(long)]
        code: Option<String>,
    },
    /// Print the queue once.
    Show {
        code: String,
        #[arg(long)]
        show_completed: bool,
    },
    /// Keep the queue on screen, refreshing in the background.
    Watch {
        code: String,
        #[arg(long)]
        show_completed: bool,
    },
    /// Queue a song.
    Add {
        code: String,
        title: String,
        #[arg(long, default_value = "")]
        artist: String,
    },
    /// Mark a song done, or not done again (admin).
    Toggle { code: String, item: String },
    /// Remove a song from the queue (admin).
    Delete { code: String, item: String },
    /// Attach a video link to a song, or clear it when omitted (admin).
    Video {
        code: String,
        item: String,
        url: Option<String>,
    },
    /// Unlock admin actions for a session.
    AdminLogin { code: String, secret: String },
    /// Forget the admin login for a session.
    AdminLogout { code: String },
    /// Rename a session (admin).
    Rename { code: String, title: String },
    /// Delete a session for everyone (admin).
    Close { code: String },
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let cli = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. Using session service at {}", config.api_base_url);

    // --- 2. Initialize Adapters ---
    let api: Arc<dyn SessionApi> = Arc::new(HttpSessionApi::new(
        config.api_base_url.clone(),
        config.http_timeout,
    )?);
    let capabilities = Capabilities::new(Arc::new(FileCapabilityStore::new(&config.state_path)));

    // --- 3. Dispatch ---
    run(cli.command, &config, api, capabilities).await
}

async fn run(
    command: Command,
    config: &Config,
    api: Arc<dyn SessionApi>,
    capabilities: Capabilities,
) -> Result<(), ClientError> {
    match command {
        Command::Name { name } => {
            entry::set_display_name(&capabilities, &name)?;
            match capabilities.display_name() {
                Some(name) => println!("Your name is now {}", name),
                None => println!("Please enter a non-empty name"),
            }
        }
        Command::Create { title, password, code } => {
            let code = code.as_deref().map(AccessCode::parse).transpose()?;
            let session = entry::create_session(api.as_ref(), &title, &password, code.as_ref()).await?;
            println!("Created '{}'. Share this code: {}", session.title, session.access_code);
        }
        Command::Show { code, show_completed } => {
            let mut view = open(&code, api, capabilities).await?;
            view.set_show_completed(show_completed);
            print_view(&view).await;
        }
        Command::Watch { code, show_completed } => {
            let code = AccessCode::parse(&code)?;
            let mut view =
                SessionView::enter(code.as_str(), api, capabilities, config.refresh_interval).await;
            if let Some(e) = view.critical_error().await {
                return Err(e.into());
            }
            view.set_show_completed(show_completed);
            let mut changes = view.engine().subscribe();
            print_view(&view).await;

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        print_view(&view).await;
                    }
                }
            }
            view.leave();
        }
        Command::Add { code, title, artist } => {
            let view = open(&code, api, capabilities).await?;
            view.add_song(&title, &artist).await?;
            print_view(&view).await;
        }
        Command::Toggle { code, item } => {
            let view = open(&code, api, capabilities).await?;
            view.toggle_completion(&ItemId(item)).await?;
            print_view(&view).await;
        }
        Command::Delete { code, item } => {
            let view = open(&code, api, capabilities).await?;
            view.delete_song(&ItemId(item)).await?;
            print_view(&view).await;
        }
        Command::Video { code, item, url } => {
            let view = open(&code, api, capabilities).await?;
            view.set_video_url(&ItemId(item), url.as_deref()).await?;
            print_view(&view).await;
        }
        Command::AdminLogin { code, secret } => {
            let mut view = open(&code, api, capabilities).await?;
            view.open_admin_login();
            view.admin_login(&secret).await?;
            println!("Admin access granted for {}", code);
        }
        Command::AdminLogout { code } => {
            let code = AccessCode::parse(&code)?;
            capabilities.revoke_admin(code.as_str())?;
            println!("Logged out of admin for {}", code);
        }
        Command::Rename { code, title } => {
            let view = open(&code, api, capabilities).await?;
            view.rename_session(&title).await?;
            print_view(&view).await;
        }
        Command::Close { code } => {
            let view = open(&code, api, capabilities).await?;
            view.close_session().await?;
            println!("Session {} deleted", code);
        }
    }
    Ok(())
}

/// Opens a one-shot view, failing on any critical error.
async fn open(code: &str, api: Arc<dyn SessionApi>, capabilities: Capabilities) -> Result<SessionView, ClientError> {
    let code = AccessCode::parse(code)?;
    let view = SessionView::enter_once(code.as_str(), api, capabilities).await;
    if let Some(e) = view.critical_error().await {
        return Err(e.into());
    }
    Ok(view)
}

async fn print_view(view: &SessionView) {
    let Some(snapshot) = view.snapshot().await else {
        return;
    };
    let queue = view.queue().await;
    let name = view.display_name();
    println!(
        "{}",
        render_header(&snapshot.session, &queue, name.as_deref(), view.is_admin())
    );
    print!("{}", render_queue(&queue));
    if let Some(alert) = view.alert().await {
        println!("⚠ {}", alert);
    }
}
