//! Paired-login demo.
//!
//! Simulates the credential handover between a main application window and
//! a companion "codes" window:
//! - the app window opens the companion window and waits for its readiness
//!   announcement
//! - the companion window announces, receives the storage snapshot, and
//!   exchanges it for an authenticated session
//!
//! Run the happy path:
//!   cargo run -p handover-demo-paired-login
//! Failure scenarios:
//!   cargo run -p handover-demo-paired-login -- --scenario blocked
//!   cargo run -p handover-demo-paired-login -- --scenario misconfigured --deadline-secs 5
//!
//! The companion host URL comes from --codes-url or HANDOVER_CODES_URL.

mod companion;
mod webcore;

use companion::CompanionHost;
use handover_core::{MemoryStore, Origin};
use handover_transfer::{
    CredentialExchanger, DEFAULT_TRANSFER_DEADLINE, SenderConfig, TransferInitiator,
    TransferOutcome, await_completion,
};
use handover_window::{Window, WindowError, WindowHandle, WindowOpener};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;
use webcore::WebCore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("handover_demo_paired_login=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let scenario = parse_arg_string(&args, "--scenario").unwrap_or_else(|| "happy".to_string());
    let codes_url = parse_arg_string(&args, "--codes-url")
        .or_else(|| std::env::var("HANDOVER_CODES_URL").ok())
        .unwrap_or_else(|| "https://codes.example.com".to_string());
    let deadline = parse_arg(&args, "--deadline-secs")
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TRANSFER_DEADLINE);

    let app_origin = Origin::parse("https://app.example.com")?;
    let codes_origin = Origin::parse(&codes_url)?;

    tracing::info!("scenario '{}', companion host {}", scenario, codes_origin);

    // The app window and the credentials its web core has saved locally.
    let app_core = WebCore::with_saved([
        ("token", "abc123"),
        ("profile", r#"{"name":"Kim"}"#),
    ]);
    let mut app_store = MemoryStore::new();
    for (key, value) in app_core.saved_token() {
        app_store.insert(key, value);
    }
    let mut keys: Vec<String> = app_core.saved_token().into_keys().collect();
    keys.sort();

    let app = Window::root(app_origin.clone());
    let codes_store = Arc::new(RwLock::new(MemoryStore::new()));

    match scenario.as_str() {
        "happy" => {
            let (host, mut pages) =
                CompanionHost::new(app.handle(), app_origin, codes_store.clone());
            tokio::join!(
                run_transfer(app, app_store, host, &codes_url, &keys),
                run_codes_page(&mut pages, codes_store, deadline),
            );
        }
        "blocked" => {
            run_transfer(app, app_store, BlockedPopup, &codes_url, &keys).await;
        }
        "misconfigured" => {
            // The companion page is served with the wrong source origin: its
            // announcement is dropped, the sender gives up, the page times
            // out into its login fallback.
            let wrong_source = Origin::parse("https://staging.example.com")?;
            let (host, mut pages) =
                CompanionHost::new(app.handle(), wrong_source, codes_store.clone());
            tokio::join!(
                run_transfer(app, app_store, host, &codes_url, &keys),
                run_codes_page(&mut pages, codes_store, deadline),
            );
        }
        other => anyhow::bail!("unknown scenario: {other}"),
    }

    Ok(())
}

/// Drive one transfer attempt from the app window, logging status changes
/// the way the dashboard surfaces them.
async fn run_transfer<O: WindowOpener>(
    app: Window,
    app_store: MemoryStore,
    opener: O,
    codes_url: &str,
    keys: &[String],
) {
    let config = SenderConfig::default();
    let mut initiator = TransferInitiator::with_config(app, app_store, opener, config);

    let mut status = initiator.status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let s = status.borrow_and_update().clone();
            tracing::info!("sender: {}", s.phase);
        }
    });

    if let Err(e) = initiator.initiate(codes_url, keys).await {
        // The dashboard turns this into a toast and stays on the page.
        tracing::warn!("transfer failed: {}", e);
    }
}

/// What the page hosted on the companion window does: wait for the
/// transfer, then exchange the stored values for a session.
async fn run_codes_page(
    pages: &mut companion::PageStates,
    store: Arc<RwLock<MemoryStore>>,
    deadline: Duration,
) {
    let Some(state) = pages.recv().await else {
        tracing::warn!("companion page never loaded, redirecting to /login");
        return;
    };

    match await_completion(state, deadline).await {
        TransferOutcome::Completed(snapshot) => {
            tracing::info!("received {} keys", snapshot.len());
            let mut core = WebCore::backed_by(store);
            match core.build_credentials().await {
                Ok(()) => {
                    core.set_authenticated(true);
                    tracing::info!("navigating into the authenticated app");
                }
                Err(e) => {
                    tracing::warn!("credential exchange failed: {}", e);
                    core.set_authenticated(false);
                }
            }
        }
        TransferOutcome::Failed(message) => {
            tracing::warn!("transfer failed: {}, redirecting to /login", message);
        }
        TransferOutcome::TimedOut => {
            tracing::warn!("no data within {:?}, redirecting to /login", deadline);
        }
    }
}

/// Popup blocker stand-in.
struct BlockedPopup;

impl WindowOpener for BlockedPopup {
    fn open(&mut self, url: &str) -> Result<WindowHandle, WindowError> {
        Err(WindowError::OpenFailed {
            url: url.to_string(),
            reason: "popup blocked".to_string(),
        })
    }
}

fn parse_arg(args: &[String], flag: &str) -> Option<u64> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}

fn parse_arg_string(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
