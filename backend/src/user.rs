//! User records: storage, profile handlers and password changes.

use std::str::FromStr;

use axum::{Json, extract::State};
use email_address::EmailAddress;
use rusqlite::{Connection, Row, types::Type};
use serde::Deserialize;
use serde_json::{Value, json};
use time::OffsetDateTime;

use common::{PasswordHash, User, UserID, UserProfile};

use crate::{
    AppState, Error,
    auth::Claims,
    db::{CreateTable, MapRow},
};

impl CreateTable for User {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                full_name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
                )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for User {
    type ReturnType = Self;

    fn map_row(row: &Row) -> Result<Self, rusqlite::Error> {
        let raw_email: String = row.get(1)?;
        let email = EmailAddress::from_str(&raw_email)
            .map_err(|error| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, error.into()))?;
        let raw_password_hash: String = row.get(2)?;

        Ok(User::new(
            UserID::new(row.get(0)?),
            email,
            PasswordHash::new_unchecked(&raw_password_hash),
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }
}

/// Insert a new user into the database.
///
/// # Errors
/// Returns [Error::DuplicateEmail] if the email is already stored
/// (case-sensitive exact match).
pub fn create_user(
    email: &EmailAddress,
    password_hash: &PasswordHash,
    full_name: &str,
    connection: &Connection,
) -> Result<User, Error> {
    let now = OffsetDateTime::now_utc();

    let user = connection
        .prepare(
            "INSERT INTO user (email, password_hash, full_name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, email, password_hash, full_name, created_at, updated_at",
        )?
        .query_row(
            (
                email.as_str(),
                password_hash.to_string(),
                full_name,
                now,
                now,
            ),
            User::map_row,
        )?;

    Ok(user)
}

/// Retrieve a user by their email.
///
/// The lookup is a case-sensitive exact match on the stored text.
///
/// # Errors
/// Returns [Error::NotFound] if there is no user with the given email.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, email, password_hash, full_name, created_at, updated_at
             FROM user WHERE email = ?1",
        )?
        .query_row([email], User::map_row)
        .map_err(|error| error.into())
}

/// Retrieve a user by their ID.
///
/// # Errors
/// Returns [Error::UserNotFound] if there is no user with the given ID.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, email, password_hash, full_name, created_at, updated_at
             FROM user WHERE id = ?1",
        )?
        .query_row([user_id.as_i64()], User::map_row)
        .map_err(|error| match error.into() {
            Error::NotFound => Error::UserNotFound,
            other => other,
        })
}

/// Set a user's display name.
///
/// # Errors
/// Returns [Error::UserNotFound] if there is no user with the given ID.
pub fn update_full_name(
    user_id: UserID,
    full_name: &str,
    connection: &Connection,
) -> Result<User, Error> {
    connection
        .prepare(
            "UPDATE user SET full_name = ?1, updated_at = ?2 WHERE id = ?3
             RETURNING id, email, password_hash, full_name, created_at, updated_at",
        )?
        .query_row(
            (full_name, OffsetDateTime::now_utc(), user_id.as_i64()),
            User::map_row,
        )
        .map_err(|error| match error.into() {
            Error::NotFound => Error::UserNotFound,
            other => other,
        })
}

/// Replace a user's password hash.
///
/// # Errors
/// Returns [Error::UserNotFound] if there is no user with the given ID.
pub fn update_password_hash(
    user_id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_updated = connection.execute(
        "UPDATE user SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
        (
            password_hash.to_string(),
            OffsetDateTime::now_utc(),
            user_id.as_i64(),
        ),
    )?;

    if rows_updated == 0 {
        return Err(Error::UserNotFound);
    }

    Ok(())
}

/// A route handler for getting the caller's profile.
pub async fn get_profile(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<UserProfile>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let user = get_user_by_id(claims.user_id, &connection)?;

    Ok(Json(user.profile()))
}

/// The request body for a profile update.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    /// The new display name.
    pub full_name: String,
}

/// A route handler for updating the caller's display name.
pub async fn update_profile(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let user = update_full_name(claims.user_id, &request.full_name, &connection)?;

    Ok(Json(user.profile()))
}

/// The request body for a password change.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    /// The caller's current password.
    #[serde(rename = "oldPassword")]
    pub old_password: String,
    /// The replacement password.
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

/// A route handler for changing the caller's password.
///
/// # Errors
/// Returns [Error::InvalidCredentials] if the old password does not match the
/// stored hash.
pub async fn change_password(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let user = get_user_by_id(claims.user_id, &connection)?;

    if !user.password_hash().verify(&request.old_password)? {
        return Err(Error::InvalidCredentials);
    }

    let new_hash =
        PasswordHash::from_raw_password(&request.new_password, PasswordHash::DEFAULT_COST)?;
    update_password_hash(claims.user_id, &new_hash, &connection)?;

    Ok(Json(json!({ "success": true })))
}


#[cfg(test)]
mod profile_route_tests {
    use std::str::FromStr;

    use axum::{
        Router,
        http::StatusCode,
        routing::{get, put},
    };
    use axum_test::TestServer;
    use email_address::EmailAddress;
    use rusqlite::Connection;
    use serde_json::json;

    use common::{PasswordHash, User, UserProfile};

    use crate::{AppState, auth::encode_token, endpoints};

    use super::{change_password, create_user, get_profile, get_user_by_id, update_profile};

    fn get_test_app_state() -> AppState {
        let db_connection =
            Connection::open_in_memory().expect("Could not open database in memory.");

        AppState::new(db_connection, "foobar").expect("Could not create app state.")
    }

    fn create_test_user(state: &AppState, password: &str) -> User {
        let email = EmailAddress::from_str("foo@bar.baz").unwrap();
        let password_hash = PasswordHash::from_raw_password(password, 4).unwrap();
        let connection = state.db_connection.lock().unwrap();

        create_user(&email, &password_hash, "Foo Bar", &connection).unwrap()
    }

    fn get_test_server(state: AppState) -> TestServer {
        let app = Router::new()
            .route(endpoints::PROFILE, get(get_profile).put(update_profile))
            .route(endpoints::PASSWORD, put(change_password))
            .with_state(state);

        TestServer::new(app)
    }

    #[tokio::test]
    async fn get_profile_returns_email_and_name() {
        let state = get_test_app_state();
        let user = create_test_user(&state, "hunter22hunter22");
        let token = encode_token(user.id(), user.email(), state.encoding_key()).unwrap();
        let server = get_test_server(state);

        let response = server
            .get(endpoints::PROFILE)
            .authorization_bearer(token)
            .await;

        response.assert_status_ok();

        let profile = response.json::<UserProfile>();
        assert_eq!(profile.email.as_str(), "foo@bar.baz");
        assert_eq!(profile.full_name, "Foo Bar");
    }

    #[tokio::test]
    async fn update_profile_changes_display_name() {
        let state = get_test_app_state();
        let user = create_test_user(&state, "hunter22hunter22");
        let token = encode_token(user.id(), user.email(), state.encoding_key()).unwrap();
        let server = get_test_server(state);

        let response = server
            .put(endpoints::PROFILE)
            .authorization_bearer(token)
            .content_type("application/json")
            .json(&json!({ "full_name": "Bar Foo" }))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<UserProfile>().full_name, "Bar Foo");
    }

    #[tokio::test]
    async fn change_password_fails_with_wrong_old_password() {
        let state = get_test_app_state();
        let user = create_test_user(&state, "hunter22hunter22");
        let token = encode_token(user.id(), user.email(), state.encoding_key()).unwrap();
        let server = get_test_server(state.clone());

        server
            .put(endpoints::PASSWORD)
            .authorization_bearer(token)
            .content_type("application/json")
            .json(&json!({
                "oldPassword": "notthepassword",
                "newPassword": "anewpasswordentirely",
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        // The stored hash must be unchanged.
        let connection = state.db_connection.lock().unwrap();
        let stored = get_user_by_id(user.id(), &connection).unwrap();
        assert!(stored.password_hash().verify("hunter22hunter22").unwrap());
    }

    #[tokio::test]
    async fn change_password_replaces_hash() {
        let state = get_test_app_state();
        let user = create_test_user(&state, "hunter22hunter22");
        let token = encode_token(user.id(), user.email(), state.encoding_key()).unwrap();
        let server = get_test_server(state.clone());

        server
            .put(endpoints::PASSWORD)
            .authorization_bearer(token)
            .content_type("application/json")
            .json(&json!({
                "oldPassword": "hunter22hunter22",
                "newPassword": "anewpasswordentirely",
            }))
            .await
            .assert_status_ok();

        let connection = state.db_connection.lock().unwrap();
        let stored = get_user_by_id(user.id(), &connection).unwrap();
        assert!(stored.password_hash().verify("anewpasswordentirely").unwrap());
        assert!(!stored.password_hash().verify("hunter22hunter22").unwrap());
    }
}
