//! Defines the endpoint for recording a new expense.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    auth::Identity,
    endpoints,
    expense::core::{NewExpense, insert_expense},
    user::find_user_id_by_email,
};

/// The state needed to create an expense.
#[derive(Debug, Clone)]
pub struct CreateExpenseState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for recording an expense.
#[derive(Debug, Deserialize)]
pub struct ExpenseForm {
    /// The amount spent in dollars.
    pub amount: Option<f64>,
    /// What kind of spending this was.
    pub category: String,
    /// The day the money was spent.
    pub date: Date,
    /// Free-form notes, may be blank.
    #[serde(default)]
    pub description: String,
}

/// A route handler for recording a new expense, redirects to the expenses
/// view on success.
///
/// The row is always owned by the user resolved from the session identity,
/// never by an ID taken from the form.
pub async fn create_expense_endpoint(
    State(state): State<CreateExpenseState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<ExpenseForm>,
) -> Response {
    let amount = match validate_expense_form(&form) {
        Ok(amount) => amount,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let user_id = match find_user_id_by_email(&identity.email, &connection) {
        Ok(user_id) => user_id,
        Err(Error::NotFound) => return Error::UnresolvedIdentity.into_alert_response(),
        Err(error) => {
            tracing::error!("Could not resolve user for expense: {error}");
            return error.into_alert_response();
        }
    };

    let new_expense = NewExpense {
        user_id,
        amount,
        category: form.category.trim().to_owned(),
        date: form.date,
        description: form.description.trim().to_owned(),
    };

    match insert_expense(new_expense, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::EXPENSES_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Could not create expense with {form:?}: {error}");
            error.into_alert_response()
        }
    }
}

fn validate_expense_form(form: &ExpenseForm) -> Result<f64, Error> {
    let amount = match form.amount {
        Some(amount) => amount,
        None => return Err(Error::MissingField("Amount")),
    };

    if amount <= 0.0 {
        return Err(Error::InvalidAmount);
    }

    if form.category.trim().is_empty() {
        return Err(Error::MissingField("Category"));
    }

    Ok(amount)
}
