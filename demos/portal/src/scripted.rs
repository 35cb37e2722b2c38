//! Offline walkthrough against in-memory fakes.

use carebridge_auth::{
    AuthAction, AuthEnvironment, AuthReducer, AuthState, AuthStore, IdentityAssertion, Profile,
    ProfileRecord, Role,
    mocks::{MockIdentityProvider, MockPendingCache, MockProfileStore},
};
use carebridge_core::environment::{Clock, SystemClock};
use carebridge_runtime::StoreError;
use std::time::Duration;
use tracing::info;

type DemoStore = AuthStore<MockIdentityProvider, MockProfileStore, MockPendingCache>;

const WAIT: Duration = Duration::from_secs(1);
const LINK: &str = "http://localhost:5173/finishSignIn?mode=signIn&oobCode=demo-code";

fn demo_store(identity: &MockIdentityProvider, profiles: &MockProfileStore, pending: &MockPendingCache) -> DemoStore {
    let env = AuthEnvironment::new(identity.clone(), profiles.clone(), pending.clone());
    DemoStore::new(AuthState::default(), AuthReducer::new(), env)
}

async fn signed_in_as(store: &DemoStore) -> Option<Profile> {
    store.state(|s| s.session.current_profile().cloned()).await
}

/// Run the registration, abandoned-dialog and returning-user walkthroughs.
pub async fn run() -> anyhow::Result<()> {
    email_link_registration().await?;
    abandoned_role_dialog().await?;
    returning_google_user().await?;
    Ok(())
}

async fn email_link_registration() -> Result<(), StoreError> {
    info!("── Email-link registration across a reload ──");
    let identity = MockIdentityProvider::new().with_link_assertion(IdentityAssertion {
        uid: "u1".to_string(),
        email: "a@x.com".to_string(),
        display_name: None,
    });
    let profiles = MockProfileStore::new();
    let pending = MockPendingCache::new();

    demo_store(&identity, &profiles, &pending)
        .send_and_wait_for(
            AuthAction::SubmitRegistration {
                name: "Ann".to_string(),
                email: "a@x.com".to_string(),
                role: Some(Role::Nurse),
            },
            |a| matches!(a, AuthAction::LinkSent { .. }) || a.is_sign_in_outcome(),
            WAIT,
        )
        .await?;
    info!(cached_keys = pending.len(), "Link sent, process reloads");

    let reloaded = demo_store(&identity, &profiles, &pending);
    reloaded
        .send_and_wait_for(
            AuthAction::DetectCompletionLink {
                location: LINK.to_string(),
            },
            AuthAction::is_sign_in_outcome,
            WAIT,
        )
        .await?;
    info!(
        profile = ?signed_in_as(&reloaded).await,
        cached_keys = pending.len(),
        "Registration complete"
    );
    Ok(())
}

async fn abandoned_role_dialog() -> Result<(), StoreError> {
    info!("── New Google user closes the role dialog ──");
    let identity = MockIdentityProvider::new().with_federated_assertion(IdentityAssertion {
        uid: "u2".to_string(),
        email: "bob@gmail.com".to_string(),
        display_name: Some("Bob".to_string()),
    });
    let profiles = MockProfileStore::new();
    let store = demo_store(&identity, &profiles, &MockPendingCache::new());

    store
        .send_and_wait_for(
            AuthAction::SignInWithGoogle,
            |a| matches!(a, AuthAction::FederatedAssertionReceived { .. }) || a.is_sign_in_outcome(),
            WAIT,
        )
        .await?;
    store.send(AuthAction::CancelRoleSelection).await?.wait().await;

    info!(
        profile = ?signed_in_as(&store).await,
        stored_profiles = profiles.len(),
        "Dialog abandoned"
    );
    Ok(())
}

async fn returning_google_user() -> Result<(), StoreError> {
    info!("── Returning Google user with a changed display name ──");
    let record = ProfileRecord::new(
        Profile {
            uid: "u3".to_string(),
            email: "carl@clinic.se".to_string(),
            name: "Dr. Carl Lind".to_string(),
            role: Role::Doctor,
        },
        SystemClock.now(),
    );
    let identity = MockIdentityProvider::new().with_federated_assertion(IdentityAssertion {
        uid: "u3".to_string(),
        email: "carl.lind@gmail.com".to_string(),
        display_name: Some("Carl L.".to_string()),
    });
    let profiles = MockProfileStore::new().with_record(record);
    let store = demo_store(&identity, &profiles, &MockPendingCache::new());

    store
        .send_and_wait_for(AuthAction::SignInWithGoogle, AuthAction::is_sign_in_outcome, WAIT)
        .await?;
    info!(
        profile = ?signed_in_as(&store).await,
        writes = profiles.write_count(),
        "Stored profile kept"
    );

    store.send(AuthAction::RequestSecondFactor).await?.wait().await;
    if let Some(challenge) = store.state(|s| s.second_factor.clone()).await {
        info!(payload = %challenge.payload_url, "e-ID QR payload");
    }

    store.send(AuthAction::Logout).await?.wait().await;
    info!(signed_in = signed_in_as(&store).await.is_some(), "Logged out");
    Ok(())
}
