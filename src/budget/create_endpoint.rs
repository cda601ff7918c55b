//! Defines the endpoint for setting a new budget.

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
    budget::core::{NewBudget, Period, insert_budget},
    endpoints,
    user::find_user_id_by_email,
};

/// The state needed to create a budget.
#[derive(Debug, Clone)]
pub struct CreateBudgetState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateBudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for setting a budget.
#[derive(Debug, Deserialize)]
pub struct BudgetForm {
    /// The spending limit in dollars.
    pub budget_amount: Option<f64>,
    /// How often the budget resets.
    pub period: Period,
    /// The first day the budget applies to.
    pub start_date: Date,
    /// The last day the budget applies to.
    pub end_date: Date,
}

/// A route handler for setting a new budget, redirects to the budgets view on
/// success.
///
/// The row is always owned by the user resolved from the session identity,
/// never by an ID taken from the form.
pub async fn create_budget_endpoint(
    State(state): State<CreateBudgetState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<BudgetForm>,
) -> Response {
    let budget_amount = match form.budget_amount {
        Some(budget_amount) if budget_amount > 0.0 => budget_amount,
        Some(_) => return Error::InvalidAmount.into_alert_response(),
        None => return Error::MissingField("Budget amount").into_alert_response(),
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
            tracing::error!("Could not resolve user for budget: {error}");
            return error.into_alert_response();
        }
    };

    let new_budget = NewBudget {
        user_id,
        budget_amount,
        period: form.period,
        start_date: form.start_date,
        end_date: form.end_date,
    };

    match insert_budget(new_budget, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::BUDGETS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Could not create budget with {form:?}: {error}");
            error.into_alert_response()
        }
    }
}
