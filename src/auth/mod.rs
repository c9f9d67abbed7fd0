//! Login, registration and logout

mod types;

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use log::{info, warn};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::fetch::ApiClient;
use crate::router::Route;
use crate::session::{Session, SessionStore};

pub use types::*;

const LOGIN_PATH: &str = "/api/users/login";
const REGISTER_PATH: &str = "/api/users/register";

/// Session controller behind the login and register forms.
///
/// One instance stands for one form: while a submission is in flight a second
/// one is refused with [`Error::SubmissionInProgress`], since the backend does
/// not deduplicate registrations.
pub struct Auth {
    api: ApiClient,
    in_flight: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
}

impl Auth {
    /// Create a new Auth controller
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            in_flight: Arc::new(AtomicBool::new(false)),
            state: Arc::new(AtomicU8::new(encode_state(SubmitState::Idle))),
        }
    }

    fn sessions(&self) -> &SessionStore {
        self.api.sessions()
    }

    /// State of the last submission
    pub fn state(&self) -> SubmitState {
        decode_state(self.state.load(Ordering::SeqCst))
    }

    /// Whether the submit action should be enabled
    pub fn can_submit(&self) -> bool {
        !self.in_flight.load(Ordering::SeqCst)
    }

    /// Sign in with email and password.
    ///
    /// A failed attempt leaves any previously stored session in place.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthOutcome> {
        let mut missing = Vec::new();
        if email.trim().is_empty() {
            missing.push("email");
        }
        if password.is_empty() {
            missing.push("password");
        }
        if !missing.is_empty() {
            return Err(Error::validation(missing));
        }

        let credentials = LoginCredentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };

        self.submit(async {
            let body: Value = self.api.post(LOGIN_PATH).json(&credentials)?.execute().await?;
            let session = AuthResponse::session_from(body).ok_or_else(|| {
                warn!("Login for {} returned no token", credentials.email);
                Error::LoginRejected
            })?;
            self.sessions().save(&session)?;
            info!("Logged in as {}", credentials.email);
            Ok::<_, Error>(AuthOutcome {
                session,
                next_route: Route::Home,
            })
        })
        .await
    }

    /// Create an account; on success the user is sent to the login screen
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<AuthOutcome> {
        let mut missing = Vec::new();
        if username.trim().is_empty() {
            missing.push("username");
        }
        if email.trim().is_empty() {
            missing.push("email");
        }
        if password.is_empty() {
            missing.push("password");
        }
        if !missing.is_empty() {
            return Err(Error::validation(missing));
        }

        let credentials = RegisterCredentials {
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };

        self.submit(async {
            let body: Value = self.api.post(REGISTER_PATH).json(&credentials)?.execute().await?;
            let session = AuthResponse::session_from(body).ok_or_else(|| {
                warn!("Registration for {} returned no token", credentials.email);
                Error::RegistrationRejected
            })?;
            self.sessions().save(&session)?;
            info!("Registered {}", credentials.username);
            Ok::<_, Error>(AuthOutcome {
                session,
                next_route: Route::Login,
            })
        })
        .await
    }

    /// Forget the stored session; returns the screen to show next
    pub fn logout(&self) -> Result<Route> {
        self.sessions().logout()?;
        info!("Logged out");
        Ok(Route::Login)
    }

    /// The stored session, if any
    pub fn current_session(&self) -> Result<Option<Session>> {
        self.sessions().load()
    }

    /// Grade a password for the register form
    pub fn password_strength(password: &str) -> PasswordStrength {
        PasswordStrength::of(password)
    }

    async fn submit<F>(&self, fut: F) -> Result<AuthOutcome>
    where
        F: std::future::Future<Output = Result<AuthOutcome>>,
    {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::SubmissionInProgress);
        }
        let _guard = InFlight(self.in_flight.clone());
        self.set_state(SubmitState::Submitting);

        let result = fut.await;
        match &result {
            Ok(_) => self.set_state(SubmitState::Succeeded),
            Err(e) => {
                warn!("Submission failed: {}", e);
                self.set_state(SubmitState::Failed);
            }
        }
        result
    }

    fn set_state(&self, state: SubmitState) {
        self.state.store(encode_state(state), Ordering::SeqCst);
    }
}

/// Re-enables submission when dropped, including when the future is cancelled
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn encode_state(state: SubmitState) -> u8 {
    match state {
        SubmitState::Idle => 0,
        SubmitState::Submitting => 1,
        SubmitState::Succeeded => 2,
        SubmitState::Failed => 3,
    }
}

fn decode_state(raw: u8) -> SubmitState {
    match raw {
        1 => SubmitState::Submitting,
        2 => SubmitState::Succeeded,
        3 => SubmitState::Failed,
        _ => SubmitState::Idle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientOptions;
    use reqwest::Client;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn auth_for(server: &MockServer, sessions: SessionStore) -> Auth {
        let api = ApiClient::new(
            Url::parse(&server.uri()).unwrap(),
            Client::new(),
            sessions,
            &ClientOptions::default(),
        );
        Auth::new(api)
    }

    #[test]
    fn test_password_strength() {
        assert_eq!(Auth::password_strength(""), PasswordStrength::Empty);
        assert_eq!(Auth::password_strength("abc"), PasswordStrength::Weak);
        assert_eq!(Auth::password_strength("abcdef"), PasswordStrength::Fair);
        assert_eq!(Auth::password_strength("abcdefgh"), PasswordStrength::Good);
        assert_eq!(Auth::password_strength("abcdefghijkl"), PasswordStrength::Strong);
        assert_eq!(PasswordStrength::Good.label(), "Good");
    }

    #[test]
    fn test_login_success() {
        tokio_test::block_on(async {
            let mock_server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/users/login"))
                .and(body_json(json!({"email": "a@example.com", "password": "secret"})))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "_id": "u1",
                    "username": "alice",
                    "email": "a@example.com",
                    "token": "test_token"
                })))
                .expect(1)
                .mount(&mock_server)
                .await;

            let sessions = SessionStore::in_memory();
            let auth = auth_for(&mock_server, sessions.clone());
            assert_eq!(auth.state(), SubmitState::Idle);

            let outcome = auth.login("a@example.com", "secret").await.unwrap();
            assert_eq!(outcome.next_route, Route::Home);
            assert_eq!(outcome.session.token, "test_token");
            assert_eq!(auth.state(), SubmitState::Succeeded);
            assert!(auth.can_submit());

            let stored = sessions.load().unwrap().unwrap();
            assert_eq!(stored.token, "test_token");
            assert_eq!(stored.username(), Some("alice"));
            assert_eq!(stored.user["token"], "test_token");
        });
    }

    #[tokio::test]
    async fn test_login_without_token_is_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "alice"})))
            .mount(&mock_server)
            .await;

        let sessions = SessionStore::in_memory();
        let auth = auth_for(&mock_server, sessions.clone());

        let result = auth.login("a@example.com", "secret").await;
        assert!(matches!(result, Err(Error::LoginRejected)));
        assert_eq!(auth.state(), SubmitState::Failed);
        assert_eq!(sessions.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_success_without_usable_body_is_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/login"))
            .respond_with(ResponseTemplate::new(200))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/users/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/users/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": ""})))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/users/register"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!(["bob"])))
            .mount(&mock_server)
            .await;

        let sessions = SessionStore::in_memory();
        let auth = auth_for(&mock_server, sessions.clone());

        for _ in 0..3 {
            let result = auth.login("a@example.com", "secret").await;
            assert!(matches!(result, Err(Error::LoginRejected)), "got {:?}", result);
        }
        let result = auth.register("bob", "b@example.com", "secret").await;
        assert!(matches!(result, Err(Error::RegistrationRejected)), "got {:?}", result);
        assert_eq!(sessions.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_login_keeps_existing_session() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid email or password"})))
            .mount(&mock_server)
            .await;

        let sessions = SessionStore::in_memory();
        sessions.save(&Session::new("old", json!({"token": "old"}))).unwrap();
        let auth = auth_for(&mock_server, sessions.clone());

        let err = auth.login("a@example.com", "wrong").await.unwrap_err();
        match err {
            Error::RequestFailed { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid email or password");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(sessions.token().unwrap(), Some("old".to_string()));
    }

    #[tokio::test]
    async fn test_empty_fields_never_reach_the_network() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let auth = auth_for(&mock_server, SessionStore::in_memory());
        assert!(matches!(auth.login("", "secret").await, Err(Error::ValidationFailed(_))));
        match auth.register("bob", "  ", "").await {
            Err(Error::ValidationFailed(fields)) => assert_eq!(fields, vec!["email", "password"]),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_goes_to_login() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/register"))
            .and(body_json(json!({"username": "bob", "email": "b@example.com", "password": "longpassword"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"username": "bob", "token": "t2"})))
            .mount(&mock_server)
            .await;

        let sessions = SessionStore::in_memory();
        let auth = auth_for(&mock_server, sessions.clone());

        let outcome = auth.register("bob", "b@example.com", "longpassword").await.unwrap();
        assert_eq!(outcome.next_route, Route::Login);
        assert_eq!(sessions.token().unwrap(), Some("t2".to_string()));
    }

    #[tokio::test]
    async fn test_register_failure_surfaces_backend_message() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/register"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "User already exists"})))
            .mount(&mock_server)
            .await;

        let auth = auth_for(&mock_server, SessionStore::in_memory());
        let err = auth.register("bob", "b@example.com", "pw").await.unwrap_err();
        assert_eq!(err.user_message("Registration failed. Please try again."), "User already exists");
    }

    #[tokio::test]
    async fn test_concurrent_submission_is_refused() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"token": "slow"}))
                    .set_delay(std::time::Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let auth = auth_for(&mock_server, SessionStore::in_memory());
        let (first, second) = tokio::join!(
            auth.login("a@example.com", "secret"),
            async {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                auth.login("a@example.com", "secret").await
            }
        );
        assert!(first.is_ok());
        assert!(matches!(second, Err(Error::SubmissionInProgress)));
        assert!(auth.can_submit());
    }

    #[test]
    fn test_logout_clears_session() {
        let sessions = SessionStore::in_memory();
        sessions.save(&Session::new("abc", json!({"token": "abc"}))).unwrap();
        let api = ApiClient::new(
            Url::parse("http://backend.test").unwrap(),
            Client::new(),
            sessions.clone(),
            &ClientOptions::default(),
        );
        let auth = Auth::new(api);

        assert_eq!(auth.logout().unwrap(), Route::Login);
        assert_eq!(auth.current_session().unwrap(), None);
    }
}
