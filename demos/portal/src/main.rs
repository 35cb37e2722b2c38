//! CareBridge portal
//!
//! Drives the sign-in flows from the command line. Every invocation is a
//! fresh process, so the pending-registration file is the only thing that
//! links a `register` to the later `complete`, just like a browser reload.
//!
//! ```text
//! carebridge-portal demo
//! carebridge-portal register <name> <role> <email>
//! carebridge-portal login <email>
//! carebridge-portal complete <link>
//! carebridge-portal google <id-token> [role]
//! carebridge-portal eid
//! ```

mod scripted;

use anyhow::{Context, bail};
use carebridge_auth::{
    AuthAction, AuthConfig, AuthEnvironment, AuthError, AuthReducer, AuthState, AuthStore, Role,
    SecondFactorIssuer,
    state::validate_email,
    stores::{FilePendingCache, FirestoreProfileStore, IdentityToolkitProvider, StaticIdToken},
};
use carebridge_core::environment::{Clock, SystemClock};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type LiveStore = AuthStore<IdentityToolkitProvider<StaticIdToken>, FirestoreProfileStore, FilePendingCache>;

const USAGE: &str = "usage: carebridge-portal <demo | register NAME ROLE EMAIL | login EMAIL | complete LINK | google ID_TOKEN [ROLE] | eid>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let config = AuthConfig::from_env();

    match args.as_slice() {
        [] | ["demo"] => scripted::run().await,
        ["register", name, role, email] => {
            let role: Role = role.parse()?;
            let email = validate_email(email)?;
            let store = live_store(&config, String::new())?;
            let outcome = store
                .send_and_wait_for(
                    AuthAction::SubmitRegistration {
                        name: (*name).to_string(),
                        email,
                        role: Some(role),
                    },
                    is_link_outcome,
                    timeout(&config),
                )
                .await?;
            report(&store, &outcome).await
        },
        ["login", email] => {
            let email = validate_email(email)?;
            let store = live_store(&config, String::new())?;
            let outcome = store
                .send_and_wait_for(
                    AuthAction::SendLoginLink { email },
                    is_link_outcome,
                    timeout(&config),
                )
                .await?;
            report(&store, &outcome).await
        },
        ["complete", link] => {
            let store = live_store(&config, String::new())?;
            let outcome = store
                .send_and_wait_for(
                    AuthAction::DetectCompletionLink {
                        location: (*link).to_string(),
                    },
                    AuthAction::is_sign_in_outcome,
                    timeout(&config) * 3,
                )
                .await
                .context("not a sign-in link, or the provider did not answer")?;
            report(&store, &outcome).await
        },
        ["google", id_token, rest @ ..] => {
            let role = rest.first().map(|r| r.parse::<Role>()).transpose()?;
            let store = live_store(&config, (*id_token).to_string())?;
            google(&store, role, timeout(&config) * 3).await
        },
        ["eid"] => {
            let challenge = SecondFactorIssuer::new(&config.second_factor).issue(SystemClock.now());
            println!("Scan to continue: {}", challenge.payload_url);
            Ok(())
        },
        _ => bail!(USAGE),
    }
}

/// Initialize tracing from `RUST_LOG`
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carebridge_portal=info,carebridge_auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn live_store(config: &AuthConfig, id_token: String) -> anyhow::Result<LiveStore> {
    let identity = IdentityToolkitProvider::new(
        &config.firebase,
        &config.email_link,
        StaticIdToken::new(id_token),
    )?;
    let profiles =
        FirestoreProfileStore::new(&config.firebase)?.with_signed_in_user(identity.signed_in_user());
    let pending = FilePendingCache::from_config(&config.pending_cache);
    info!(cache = %pending.path().display(), "Using pending-registration file");

    let env = AuthEnvironment::new(identity, profiles, pending)
        .with_second_factor(SecondFactorIssuer::new(&config.second_factor));

    Ok(LiveStore::new(AuthState::default(), AuthReducer::new(), env))
}

async fn google(store: &LiveStore, role: Option<Role>, wait: Duration) -> anyhow::Result<()> {
    let first = store
        .send_and_wait_for(
            AuthAction::SignInWithGoogle,
            |a| matches!(a, AuthAction::FederatedAssertionReceived { registered: false, .. }) || a.is_sign_in_outcome(),
            wait,
        )
        .await?;

    if !matches!(first, AuthAction::FederatedAssertionReceived { .. }) {
        return report(store, &first).await;
    }

    // New user: the role argument answers the dialog
    let outcome = match role {
        Some(role) => {
            store
                .send_and_wait_for(AuthAction::SelectRole { role }, AuthAction::is_sign_in_outcome, wait)
                .await?
        },
        None => {
            store.send(AuthAction::CancelRoleSelection).await?.wait().await;
            println!("New account: pass a role ({}) to finish registration", role_list());
            return Ok(());
        },
    };
    report(store, &outcome).await
}

async fn report(store: &LiveStore, outcome: &AuthAction) -> anyhow::Result<()> {
    match outcome {
        AuthAction::LinkSent { email } => {
            println!("Sign-in link sent to {email}. Open it with `carebridge-portal complete <link>`.");
        },
        AuthAction::Reconciled { .. } => {
            if let Some(profile) = store.state(|s| s.session.current_profile().cloned()).await {
                println!("Signed in as {} <{}> ({})", profile.name, profile.email, profile.role);
            }
        },
        AuthAction::SignInFailed { error, .. } => bail!(failure_message(error)),
        other => info!(?other, "Unexpected outcome"),
    }
    Ok(())
}

fn failure_message(error: &AuthError) -> String {
    if error.is_user_error() {
        format!("{error}")
    } else if error.is_transient() {
        format!("sign-in failed: {error}. Run the same command again to retry.")
    } else {
        format!("sign-in failed: {error}")
    }
}

fn is_link_outcome(action: &AuthAction) -> bool {
    matches!(action, AuthAction::LinkSent { .. }) || action.is_sign_in_outcome()
}

fn timeout(config: &AuthConfig) -> Duration {
    config.firebase.request_timeout * 2
}

fn role_list() -> String {
    Role::ALL.map(Role::as_str).join(", ")
}
