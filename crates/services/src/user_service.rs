//! Account signup, login and listing.

use std::sync::Arc;

use domains::{
    AppError, CredentialHasher, PersistenceError, Result, TokenService, User, UserId, UserRepository, UserView,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::validation;

const EMAIL_TAKEN: &str = "User exists already, please login instead.";
const BAD_CREDENTIALS: &str = "Invalid credentials, could not log you in.";

/// Missing fields deserialize as empty and are reported by validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// What signup and login hand back to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user_id: UserId,
    pub email: String,
    pub token: String,
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<dyn TokenService>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self { users, hasher, tokens }
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<AuthSession> {
        let email = validation::normalize_email(&request.email);
        validation::check_signup(&request.name, &email, &request.password)?;

        if self.users.find_user_by_email(&email).await.map_err(store_error)?.is_some() {
            return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let hash = self.hasher.hash(&request.password)?;
        let image = request.image.filter(|image| !image.trim().is_empty());
        let user = User::new(request.name.trim().to_string(), email, hash, image);

        // A concurrent signup can still win the race; the store's unique index decides.
        self.users.insert_user(&user).await.map_err(|err| match err {
            PersistenceError::UniqueViolation(_) => AppError::Conflict(EMAIL_TAKEN.to_string()),
            other => store_error(other),
        })?;

        info!(user_id = %user.id, "user signed up");
        self.session_for(&user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthSession> {
        let email = validation::normalize_email(&request.email);
        validation::check_login(&email, &request.password)?;

        let Some(user) = self.users.find_user_by_email(&email).await.map_err(store_error)? else {
            warn!("login attempt for unknown email");
            return Err(AppError::Unauthenticated(BAD_CREDENTIALS.to_string()));
        };

        if !self.hasher.verify(&request.password, &user.password_hash) {
            warn!(user_id = %user.id, "login attempt with wrong password");
            return Err(AppError::Unauthenticated(BAD_CREDENTIALS.to_string()));
        }

        info!(user_id = %user.id, "user logged in");
        self.session_for(&user)
    }

    pub async fn list(&self) -> Result<Vec<UserView>> {
        let users = self.users.list_users().await.map_err(store_error)?;
        Ok(users.iter().map(UserView::from).collect())
    }

    fn session_for(&self, user: &User) -> Result<AuthSession> {
        let token = self.tokens.issue(user)?;
        Ok(AuthSession { user_id: user.id, email: user.email.clone(), token })
    }
}

fn store_error(err: PersistenceError) -> AppError {
    error!(error = %err, "user store operation failed");
    AppError::from(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockCredentialHasher, MockTokenService, MockUserRepository};

    fn signup_request() -> SignupRequest {
        SignupRequest {
            name: "Ann".into(),
            email: " Ann@Example.com ".into(),
            password: "Str0ng!pass".into(),
            image: None,
        }
    }

    fn tokens() -> MockTokenService {
        let mut tokens = MockTokenService::new();
        tokens.expect_issue().returning(|user| Ok(format!("token-for-{}", user.id)));
        tokens
    }

    fn hasher(accept: bool) -> MockCredentialHasher {
        let mut hasher = MockCredentialHasher::new();
        hasher.expect_hash().returning(|plain| Ok(format!("hashed:{plain}")));
        hasher.expect_verify().returning(move |_, _| accept);
        hasher
    }

    #[tokio::test]
    async fn signup_normalizes_email_and_hashes_password() {
        let mut users = MockUserRepository::new();
        users.expect_find_user_by_email().returning(|_| Ok(None));
        users
            .expect_insert_user()
            .withf(|user: &User| user.email == "ann@example.com" && user.password_hash == "hashed:Str0ng!pass")
            .times(1)
            .returning(|_| Ok(()));

        let service = UserService::new(Arc::new(users), Arc::new(hasher(true)), Arc::new(tokens()));
        let session = service.signup(signup_request()).await.unwrap();
        assert_eq!(session.email, "ann@example.com");
        assert!(session.token.starts_with("token-for-"));
    }

    #[tokio::test]
    async fn signup_with_taken_email_is_conflict() {
        let existing = User::new("Ann".into(), "ann@example.com".into(), "h".into(), None);
        let mut users = MockUserRepository::new();
        users.expect_find_user_by_email().returning(move |_| Ok(Some(existing.clone())));
        users.expect_insert_user().never();

        let service = UserService::new(Arc::new(users), Arc::new(hasher(true)), Arc::new(tokens()));
        let err = service.signup(signup_request()).await.unwrap_err();
        assert_eq!(err, AppError::Conflict(EMAIL_TAKEN.into()));
    }

    #[tokio::test]
    async fn signup_rejects_weak_password_before_touching_store() {
        let mut users = MockUserRepository::new();
        users.expect_find_user_by_email().never();

        let service = UserService::new(Arc::new(users), Arc::new(hasher(true)), Arc::new(tokens()));
        let request = SignupRequest { password: "short".into(), ..signup_request() };
        let err = service.signup(request).await.unwrap_err();
        assert_eq!(err.code(), "validation_failed");
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthenticated() {
        let existing = User::new("Ann".into(), "ann@example.com".into(), "h".into(), None);
        let mut users = MockUserRepository::new();
        users.expect_find_user_by_email().returning(move |_| Ok(Some(existing.clone())));

        let service = UserService::new(Arc::new(users), Arc::new(hasher(false)), Arc::new(tokens()));
        let request = LoginRequest { email: "ann@example.com".into(), password: "Wr0ng!pass".into() };
        let err = service.login(request).await.unwrap_err();
        assert_eq!(err, AppError::Unauthenticated(BAD_CREDENTIALS.into()));
    }

    #[tokio::test]
    async fn login_issues_token_for_matching_user() {
        let existing = User::new("Ann".into(), "ann@example.com".into(), "h".into(), None);
        let id = existing.id;
        let mut users = MockUserRepository::new();
        users.expect_find_user_by_email().returning(move |_| Ok(Some(existing.clone())));

        let service = UserService::new(Arc::new(users), Arc::new(hasher(true)), Arc::new(tokens()));
        let request = LoginRequest { email: "ANN@example.com".into(), password: "Str0ng!pass".into() };
        let session = service.login(request).await.unwrap();
        assert_eq!(session.user_id, id);
    }

    #[test]
    fn session_serializes_camel_case() {
        let session = AuthSession { user_id: UserId::generate(), email: "a@b.co".into(), token: "t".into() };
        let value = serde_json::to_value(&session).unwrap();
        assert!(value.get("userId").is_some());
    }
}
