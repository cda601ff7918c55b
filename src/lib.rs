//! SpendTrack is a web app for recording day-to-day expenses and budgets.
//!
//! The server renders HTML pages directly. Each registered account owns its
//! own expense and budget rows; accounts with the admin role can additionally
//! view the rows of every account.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod auth;
mod budget;
mod database_id;
mod db;
mod endpoints;
mod expense;
mod html;
mod internal_server_error;
mod logging;
mod navigation;
mod not_found;
mod routing;
mod user;
mod users_page;

pub use app_state::AppState;
pub use auth::PasswordHash;
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use routing::build_router;
pub use user::{Role, User, UserID, create_user};

use crate::{
    alert::AlertView,
    internal_server_error::render_internal_server_error,
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal,
/// whichever comes first, and then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The log-in form was submitted with an empty email or password.
    #[error("email and password are required")]
    MissingCredentials,

    /// The email/password pair did not match a registered account.
    ///
    /// The same error is used for an unknown email and a wrong password so
    /// that log-in responses do not reveal which emails are registered.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The password and confirmation fields on the sign-up form differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// The email used to sign up already belongs to a registered account.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// A required form field was missing or blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// An amount field was zero or negative.
    #[error("amount must be greater than zero")]
    InvalidAmount,

    /// The session references an email that no longer resolves to an account.
    ///
    /// The session is stale or the account was removed out-of-band. The only
    /// recovery is logging out and back in, so client-facing messages should
    /// say so.
    #[error("the signed-in account could not be found")]
    UnresolvedIdentity,

    /// The session cookie is missing from the request, or could not be read.
    #[error("no valid session cookie in the request")]
    CookieMissing,

    /// The session cookie was readable but its expiry has passed.
    #[error("the session has expired")]
    SessionExpired,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An error occurred while serializing a struct as JSON.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::UnresolvedIdentity => render_internal_server_error(
                "Account Not Found",
                "Your signed-in account could not be found. Log out and log in again.",
            ),
            Error::DatabaseLockError => render_internal_server_error(
                "Sorry, something went wrong.",
                "Try again later or check the server logs.",
            ),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                render_internal_server_error(
                    "Sorry, something went wrong.",
                    "Try again later or check the server logs.",
                )
            }
        }
    }
}

impl Error {
    /// Convert the error into an alert fragment for HTMX form endpoints.
    fn into_alert_response(self) -> Response {
        match self {
            Error::UnresolvedIdentity => (
                StatusCode::BAD_REQUEST,
                AlertView::error(
                    "Account not found",
                    "Unable to retrieve your account. Please log out and log in again.",
                )
                .into_html(),
            )
                .into_response(),
            Error::MissingField(field) => (
                StatusCode::BAD_REQUEST,
                AlertView::error_simple(&format!("{field} is required.")).into_html(),
            )
                .into_response(),
            Error::InvalidAmount => (
                StatusCode::BAD_REQUEST,
                AlertView::error_simple("Amount must be greater than zero.").into_html(),
            )
                .into_response(),
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    AlertView::error(
                        "Something went wrong",
                        "An unexpected error occurred, check the server logs for more details.",
                    )
                    .into_html(),
                )
                    .into_response()
            }
        }
    }
}
