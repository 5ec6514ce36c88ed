//! Defines the app level error type and its conversion to JSON error
//! responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The email used to register is already taken by another account.
    ///
    /// Emails are compared exactly as stored, case-sensitively.
    #[error("the email is already in use")]
    DuplicateEmail,

    /// The user provided an invalid combination of email and password.
    ///
    /// The same error is returned for an unknown email and a wrong password so
    /// that clients cannot tell which one failed.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The identity token is missing, malformed, expired or has a bad
    /// signature.
    #[error("the identity token is missing or invalid")]
    Unauthorized,

    /// Could not create an identity token at login.
    #[error("could not create an identity token: {0}")]
    TokenCreation(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server,
    /// never sent to the client.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// There is no user record for the authenticated caller.
    #[error("no user found with the given details")]
    UserNotFound,

    /// No budget matched the given `(id, user_id)` pair.
    #[error("no budget found with the given id")]
    BudgetNotFound,

    /// No transaction matched the given `(id, user_id)` pair.
    #[error("no transaction found with the given id")]
    TransactionNotFound,

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => Error::SqlError(error),
        }
    }
}

impl From<common::PasswordError> for Error {
    fn from(value: common::PasswordError) -> Self {
        let common::PasswordError::Hashing(detail) = value;
        Error::HashingError(detail)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Error::DuplicateEmail => (StatusCode::BAD_REQUEST, "User already exists"),
            Error::InvalidCredentials => (StatusCode::BAD_REQUEST, "Invalid credentials"),
            Error::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid token"),
            Error::NotFound => (StatusCode::NOT_FOUND, "Not found"),
            Error::UserNotFound => (StatusCode::NOT_FOUND, "User not found"),
            Error::BudgetNotFound => (StatusCode::NOT_FOUND, "Budget not found"),
            Error::TransactionNotFound => (StatusCode::NOT_FOUND, "Transaction not found"),
            // Any errors that are not handled above are not intended to be
            // shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
