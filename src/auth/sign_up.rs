//! The sign-up page and the handler for registering new accounts.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::password::PasswordHash,
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, LINK_STYLE, base, email_input, log_in_sign_up, password_input},
    user::{Role, create_user},
};

pub const PASSWORD_MISMATCH_ERROR_MSG: &str = "Passwords do not match.";
pub const MISSING_FIELDS_ERROR_MSG: &str = "All fields are required.";
pub const DUPLICATE_EMAIL_ERROR_MSG: &str = "Email already registered.";

fn sign_up_form(
    email: &str,
    email_error_message: Option<&str>,
    password_error_message: Option<&str>,
) -> Markup {
    html! {
        form
            hx-post=(endpoints::USERS_API)
            hx-swap="outerHTML"
            class="space-y-4 md:space-y-6"
        {
            (email_input(email, email_error_message))
            (password_input("password", "Choose a Password", None))
            (password_input("confirm_password", "Confirm Your Password", password_error_message))

            button
                type="submit" id="submit-button" tabindex="0"
                class=(BUTTON_PRIMARY_STYLE)
            {
                "Sign Up"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "

                a
                    href=(endpoints::LOG_IN_VIEW) tabindex="0"
                    class=(LINK_STYLE)
                {
                  "Log in here"
                }
            }
        }
    }
}

/// Display the sign-up page.
pub async fn get_sign_up_page() -> Response {
    let form = sign_up_form("", None, None);
    base("Sign Up", &log_in_sign_up("Sign Up", &form)).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct SignUpState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SignUpState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The raw data entered by the user in the sign-up form.
#[derive(Serialize, Deserialize)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Check the sign-up form before any row is created.
///
/// The mismatch check runs first so a typo'd confirmation never reaches the
/// store, even when other fields are also wrong.
///
/// # Errors
///
/// Returns [Error::PasswordMismatch] if the confirmation differs from the
/// password, or [Error::MissingCredentials] if the email or password is
/// empty.
fn validate_registration(form: &SignUpForm) -> Result<(), Error> {
    if form.password != form.confirm_password {
        return Err(Error::PasswordMismatch);
    }

    if form.email.trim().is_empty() || form.password.is_empty() {
        return Err(Error::MissingCredentials);
    }

    Ok(())
}

/// Handler for sign-up requests via the POST method.
///
/// New accounts always get the regular user role. On success the client is
/// redirected to the log-in page; there is no automatic log-in after
/// registration. On failure the form is returned with an error message and no
/// row is created.
pub async fn post_sign_up(
    State(state): State<SignUpState>,
    Form(user_data): Form<SignUpForm>,
) -> Response {
    let email = user_data.email.trim();

    match validate_registration(&user_data) {
        Ok(()) => {}
        Err(Error::PasswordMismatch) => {
            return create_sign_up_error_response(email, None, Some(PASSWORD_MISMATCH_ERROR_MSG));
        }
        Err(_) => {
            return create_sign_up_error_response(email, None, Some(MISSING_FIELDS_ERROR_MSG));
        }
    }

    let password_hash = match PasswordHash::new(&user_data.password, PasswordHash::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(error) => {
            tracing::error!("an error occurred while hashing a password: {error}");
            return internal_error_redirect();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not acquire database lock: {error}");
            return internal_error_redirect();
        }
    };

    match create_user(email, password_hash, Role::User, &connection) {
        Ok(_) => (
            StatusCode::SEE_OTHER,
            HxRedirect(format!("{}?registered=true", endpoints::LOG_IN_VIEW)),
        )
            .into_response(),
        Err(Error::DuplicateEmail) => {
            create_sign_up_error_response(email, Some(DUPLICATE_EMAIL_ERROR_MSG), None)
        }
        Err(error) => {
            tracing::error!("An unhandled error occurred while inserting a new user: {error}");
            internal_error_redirect()
        }
    }
}

fn create_sign_up_error_response(
    email: &str,
    email_error_message: Option<&str>,
    password_error_message: Option<&str>,
) -> Response {
    (
        StatusCode::OK,
        sign_up_form(email, email_error_message, password_error_message),
    )
        .into_response()
}

fn internal_error_redirect() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
    )
        .into_response()
}

#[cfg(test)]
mod sign_up_page_tests {
    use axum::http::{StatusCode, header::CONTENT_TYPE};
    use scraper::Html;

    use crate::endpoints;

    use super::get_sign_up_page;

    #[tokio::test]
    async fn sign_up_page_displays_form() {
        let response = get_sign_up_page().await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .get(CONTENT_TYPE)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("text/html")
        );

        let body = response.into_body();
        let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        let text = String::from_utf8_lossy(&body).to_string();
        let document = Html::parse_document(&text);
        assert!(
            document.errors.is_empty(),
            "Got HTML parsing errors: {:?}",
            document.errors
        );

        let form_selector = scraper::Selector::parse("form").unwrap();
        let forms = document.select(&form_selector).collect::<Vec<_>>();
        assert_eq!(forms.len(), 1, "want 1 form, got {}", forms.len());
        let form = forms.first().unwrap();
        assert_eq!(form.value().attr("hx-post"), Some(endpoints::USERS_API));

        let email_selector = scraper::Selector::parse("input[type=email]").unwrap();
        assert_eq!(form.select(&email_selector).count(), 1);

        let password_selector = scraper::Selector::parse("input[type=password]").unwrap();
        let password_inputs = form.select(&password_selector).collect::<Vec<_>>();
        assert_eq!(
            password_inputs.len(),
            2,
            "want password and confirmation inputs, got {}",
            password_inputs.len()
        );

        let log_in_link_selector = scraper::Selector::parse("a[href]").unwrap();
        let links = form.select(&log_in_link_selector).collect::<Vec<_>>();
        assert_eq!(links.len(), 1, "want 1 link, got {}", links.len());
        assert_eq!(
            links.first().unwrap().value().attr("href"),
            Some(endpoints::LOG_IN_VIEW),
        );
    }
}
