//! Identity tokens and the account registration and login handlers.
//!
//! A successful login returns a signed JWT that clients present as a bearer
//! token on every subsequent request. Handlers opt into authentication by
//! taking a [Claims] argument, which axum fills in from the `Authorization`
//! header.

use axum::{
    Json, RequestPartsExt,
    extract::{FromRef, FromRequestParts, State},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use email_address::EmailAddress;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::{Duration, OffsetDateTime};

use common::{PasswordHash, UserID, UserProfile};

use crate::{
    AppState, Error,
    user::{create_user, get_user_by_email},
};

/// How long an identity token stays valid. Expiry forces a re-login; there is
/// no refresh mechanism.
const TOKEN_DURATION: Duration = Duration::days(7);

/// The contents of an identity token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The ID of the user the token was issued to.
    pub user_id: UserID,
    /// The email of the user the token was issued to.
    pub email: EmailAddress,
    /// The time the token was issued as a unix timestamp.
    pub iat: usize,
    /// The expiry time of the token as a unix timestamp.
    pub exp: usize,
}

impl<S> FromRequestParts<S> for Claims
where
    DecodingKey: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| Error::Unauthorized)?;

        let decoding_key = DecodingKey::from_ref(state);
        let token_data = decode_token(bearer.token(), &decoding_key)?;

        Ok(token_data.claims)
    }
}

/// Create a signed identity token for a user.
///
/// # Errors
/// Returns [Error::TokenCreation] if the claims could not be signed.
pub fn encode_token(
    user_id: UserID,
    email: &EmailAddress,
    encoding_key: &EncodingKey,
) -> Result<String, Error> {
    let now = OffsetDateTime::now_utc();
    let claims = Claims {
        user_id,
        email: email.to_owned(),
        iat: now.unix_timestamp() as usize,
        exp: (now + TOKEN_DURATION).unix_timestamp() as usize,
    };

    encode(&Header::default(), &claims, encoding_key)
        .map_err(|error| Error::TokenCreation(error.to_string()))
}

/// Decode and validate an identity token.
///
/// # Errors
/// Returns [Error::Unauthorized] if the token is malformed, expired or signed
/// with a different secret.
pub fn decode_token(
    token: &str,
    decoding_key: &DecodingKey,
) -> Result<TokenData<Claims>, Error> {
    decode(token, decoding_key, &Validation::default()).map_err(|_| Error::Unauthorized)
}

/// The request body for registering a new account.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// The email for the new account.
    pub email: EmailAddress,
    /// The plaintext password, hashed before storage and never persisted.
    pub password: String,
    /// The display name for the new account.
    #[serde(rename = "fullName")]
    pub full_name: String,
}

/// Handler for registration requests.
///
/// # Errors
/// Returns [Error::DuplicateEmail] when the email is already registered
/// (case-sensitive exact match).
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<Value>, Error> {
    let password_hash =
        PasswordHash::from_raw_password(&request.password, PasswordHash::DEFAULT_COST)?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    create_user(&request.email, &password_hash, &request.full_name, &connection)?;

    Ok(Json(json!({ "message": "User registered" })))
}

/// The request body for login.
///
/// The email is taken as a plain string so that a malformed email fails with
/// the same error as an unknown one.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// Email entered during login.
    pub email: String,
    /// Password entered during login.
    pub password: String,
}

/// The response body for a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// The signed identity token.
    pub token: String,
    /// The profile of the logged in user.
    pub user: UserProfile,
}

/// Handler for login requests.
///
/// # Errors
/// Returns [Error::InvalidCredentials] for both an unknown email and a wrong
/// password, so the response does not leak which accounts exist.
pub async fn log_in(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<LoginResponse>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let user = get_user_by_email(&credentials.email, &connection).map_err(|error| match error {
        Error::NotFound | Error::UserNotFound => Error::InvalidCredentials,
        other => other,
    })?;

    if !user.password_hash().verify(&credentials.password)? {
        return Err(Error::InvalidCredentials);
    }

    let token = encode_token(user.id(), user.email(), state.encoding_key())?;

    Ok(Json(LoginResponse {
        token,
        user: user.profile(),
    }))
}


#[cfg(test)]
mod auth_route_tests {
    use axum::{
        Router,
        http::StatusCode,
        routing::{get, post},
    };
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{AppState, endpoints};

    use super::{Claims, LoginResponse, log_in, register};

    fn get_test_app_state() -> AppState {
        let db_connection =
            Connection::open_in_memory().expect("Could not open database in memory.");

        AppState::new(db_connection, "foobar").expect("Could not create app state.")
    }

    fn get_test_server() -> TestServer {
        let app = Router::new()
            .route(endpoints::REGISTER, post(register))
            .route(endpoints::LOG_IN, post(log_in))
            .route("/protected", get(protected_handler))
            .with_state(get_test_app_state());

        TestServer::new(app)
    }

    async fn protected_handler(_claims: Claims) -> &'static str {
        "hello"
    }

    async fn register_test_user(server: &TestServer) {
        server
            .post(endpoints::REGISTER)
            .content_type("application/json")
            .json(&json!({
                "email": "foo@bar.baz",
                "password": "averysafeandsecurepassword",
                "fullName": "Foo Bar",
            }))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn register_then_log_in_succeeds() {
        let server = get_test_server();

        register_test_user(&server).await;

        let response = server
            .post(endpoints::LOG_IN)
            .content_type("application/json")
            .json(&json!({
                "email": "foo@bar.baz",
                "password": "averysafeandsecurepassword",
            }))
            .await;

        response.assert_status_ok();

        let body = response.json::<LoginResponse>();
        assert!(!body.token.is_empty());
        assert_eq!(body.user.full_name, "Foo Bar");
        assert_eq!(body.user.email.as_str(), "foo@bar.baz");
    }

    #[tokio::test]
    async fn register_fails_with_duplicate_email() {
        let server = get_test_server();

        register_test_user(&server).await;

        let response = server
            .post(endpoints::REGISTER)
            .content_type("application/json")
            .json(&json!({
                "email": "foo@bar.baz",
                "password": "anotherpasswordentirely",
                "fullName": "Impostor",
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);

        // The original password must still work, i.e. the stored hash was not
        // overwritten by the failed registration.
        server
            .post(endpoints::LOG_IN)
            .content_type("application/json")
            .json(&json!({
                "email": "foo@bar.baz",
                "password": "averysafeandsecurepassword",
            }))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn log_in_fails_with_wrong_password() {
        let server = get_test_server();

        register_test_user(&server).await;

        server
            .post(endpoints::LOG_IN)
            .content_type("application/json")
            .json(&json!({
                "email": "foo@bar.baz",
                "password": "definitelyNotTheCorrectPassword",
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_email() {
        let server = get_test_server();

        server
            .post(endpoints::LOG_IN)
            .content_type("application/json")
            .json(&json!({
                "email": "nobody@bar.baz",
                "password": "itdoesnotmatter",
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn protected_route_fails_without_token() {
        let server = get_test_server();

        server
            .get("/protected")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn protected_route_fails_with_garbage_token() {
        let server = get_test_server();

        server
            .get("/protected")
            .authorization_bearer("notarealtoken")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn protected_route_succeeds_with_token_from_log_in() {
        let server = get_test_server();

        register_test_user(&server).await;

        let body = server
            .post(endpoints::LOG_IN)
            .content_type("application/json")
            .json(&json!({
                "email": "foo@bar.baz",
                "password": "averysafeandsecurepassword",
            }))
            .await
            .json::<LoginResponse>();

        server
            .get("/protected")
            .authorization_bearer(&body.token)
            .await
            .assert_status_ok();
    }
}
