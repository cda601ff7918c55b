//! The log-in page and the handler for log-in requests.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    alert::AlertView,
    app_state::create_cookie_key,
    auth::cookie::{DEFAULT_COOKIE_DURATION, set_auth_cookie},
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, LINK_STYLE, base, email_input, log_in_sign_up, password_input},
    user::{User, get_user_by_email},
};

pub const MISSING_CREDENTIALS_ERROR_MSG: &str = "Email and password are required.";
pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Invalid email or password.";
pub const REGISTERED_NOTICE: &str = "Account created successfully! Please log in.";

fn log_in_form(email: &str, error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-swap="outerHTML"
            class="space-y-4 md:space-y-6"
        {
            (email_input(email, None))
            (password_input("password", "Password", error_message))

            button
                type="submit" id="submit-button" tabindex="0"
                class=(BUTTON_PRIMARY_STYLE)
            {
                "Log In"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Don't have an account? "

                a
                    href=(endpoints::SIGN_UP_VIEW) tabindex="0"
                    class=(LINK_STYLE)
                {
                  "Sign up here"
                }
            }
        }
    }
}

/// The query parameters accepted by the log-in page.
#[derive(Debug, Default, Deserialize)]
pub struct LogInPageQuery {
    /// Set by the sign-up redirect so the page can confirm the registration.
    pub registered: Option<bool>,
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<LogInPageQuery>) -> Response {
    let form = log_in_form("", None);
    let content = html! {
        @if query.registered == Some(true)
        {
            div class="flex flex-col items-center pt-8"
            {
                (AlertView::success(REGISTERED_NOTICE, "").into_html())
            }
        }

        (log_in_sign_up("Log In", &form))
    };

    base("Log In", &content).into_response()
}

/// The state needed to perform a log-in.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which session cookies are valid.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl LogInState {
    /// Create the cookie key from a string and set the default cookie duration.
    pub fn new(cookie_secret: &str, db_connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection,
        }
    }
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// The raw data entered by the user in the log-in form.
///
/// The email and password are stored as plain strings. There is no need for
/// validation here beyond the empty check since they are compared against the
/// email and password hash in the database.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// Email entered during log-in.
    pub email: String,
    /// Password entered during log-in.
    pub password: String,
}

/// Check `email` and `password` against the user table.
///
/// # Errors
///
/// This function will return an error if:
/// - either field is empty ([Error::MissingCredentials]; the store is not
///   queried in this case),
/// - the email does not belong to a registered user or the password is wrong
///   (both [Error::InvalidCredentials], so responses do not reveal which
///   emails are registered),
/// - or the stored hash could not be checked.
fn verify_credentials(email: &str, password: &str, connection: &Connection) -> Result<User, Error> {
    if email.is_empty() || password.is_empty() {
        return Err(Error::MissingCredentials);
    }

    let user = match get_user_by_email(email, connection) {
        Ok(user) => user,
        Err(Error::NotFound) => return Err(Error::InvalidCredentials),
        Err(error) => return Err(error),
    };

    if !user.password_hash.verify(password)? {
        return Err(Error::InvalidCredentials);
    }

    Ok(user)
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the session cookie is set and the client
/// is redirected to the expenses page. Otherwise, the form is returned with
/// an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let email = user_data.email.trim();

    let verification = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("Could not acquire database lock: {error}");
                return create_log_in_error_response(email, INTERNAL_ERROR_MSG);
            }
        };

        verify_credentials(email, &user_data.password, &connection)
    };

    let user: User = match verification {
        Ok(user) => user,
        Err(Error::MissingCredentials) => {
            return create_log_in_error_response(email, MISSING_CREDENTIALS_ERROR_MSG);
        }
        Err(Error::InvalidCredentials) => {
            return create_log_in_error_response(email, INVALID_CREDENTIALS_ERROR_MSG);
        }
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return create_log_in_error_response(email, INTERNAL_ERROR_MSG);
        }
    };

    set_auth_cookie(jar, &user.email, user.role, state.cookie_duration)
        .map(|updated_jar| {
            (
                StatusCode::SEE_OTHER,
                HxRedirect(endpoints::EXPENSES_VIEW.to_owned()),
                updated_jar,
            )
        })
        .map_err(|err| {
            tracing::error!("Error setting session cookie: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
            )
        })
        .into_response()
}

const INTERNAL_ERROR_MSG: &str = "An internal error occurred. Please try again later.";

fn create_log_in_error_response(email: &str, error_message: &str) -> Response {
    (StatusCode::OK, log_in_form(email, Some(error_message))).into_response()
}


#[cfg(test)]
mod log_in_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, routing::post};
    use axum_htmx::HX_REDIRECT;
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{
        auth::{PasswordHash, cookie::COOKIE_TOKEN},
        endpoints,
        user::{Role, create_user, create_user_table},
    };

    use super::{
        INVALID_CREDENTIALS_ERROR_MSG, LogInData, LogInState, MISSING_CREDENTIALS_ERROR_MSG,
        post_log_in,
    };

    fn get_test_state(test_user: Option<(&str, &str)>) -> LogInState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        create_user_table(&connection).expect("Could not create user table");

        if let Some((email, password)) = test_user {
            let password_hash =
                PasswordHash::new(password, 4).expect("Could not hash test password");
            create_user(email, password_hash, Role::User, &connection)
                .expect("Could not create test user");
        }

        LogInState::new("foobar", Arc::new(Mutex::new(connection)))
    }

    fn get_test_server(state: LogInState) -> TestServer {
        let app = Router::new()
            .route(endpoints::LOG_IN_API, post(post_log_in))
            .with_state(state);

        TestServer::new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let server = get_test_server(get_test_state(Some(("test@test.com", "hunter2"))));

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&LogInData {
                email: "test@test.com".to_string(),
                password: "hunter2".to_string(),
            })
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header(HX_REDIRECT), endpoints::EXPENSES_VIEW);
        assert!(
            !response.cookie(COOKIE_TOKEN).value().is_empty(),
            "log-in should set the session cookie"
        );
    }

    #[tokio::test]
    async fn log_in_fails_with_incorrect_password() {
        let server = get_test_server(get_test_state(Some(("test@test.com", "hunter2"))));

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&LogInData {
                email: "test@test.com".to_string(),
                password: "wrongpassword".to_string(),
            })
            .await;

        response.assert_status_ok();
        response.assert_text_contains(INVALID_CREDENTIALS_ERROR_MSG);
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_email() {
        let server = get_test_server(get_test_state(None));

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&LogInData {
                email: "wrong@email.com".to_string(),
                password: "hunter2".to_string(),
            })
            .await;

        response.assert_status_ok();
        response.assert_text_contains(INVALID_CREDENTIALS_ERROR_MSG);
    }

    #[tokio::test]
    async fn log_in_fails_with_empty_fields() {
        let server = get_test_server(get_test_state(None));

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&LogInData {
                email: "".to_string(),
                password: "".to_string(),
            })
            .await;

        response.assert_status_ok();
        response.assert_text_contains(MISSING_CREDENTIALS_ERROR_MSG);
    }

    #[tokio::test]
    async fn log_in_with_empty_fields_does_not_set_cookie() {
        let server = get_test_server(get_test_state(None));

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&LogInData {
                email: "".to_string(),
                password: "".to_string(),
            })
            .await;

        assert!(
            response.maybe_cookie(COOKIE_TOKEN).is_none(),
            "failed log-in should not set the session cookie"
        );
    }
}
