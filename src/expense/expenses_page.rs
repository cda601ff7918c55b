//! Displays the expense form and the expense table.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    auth::Identity,
    endpoints,
    expense::core::{Expense, list_all_expenses, list_expenses_by_user},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency,
    },
    navigation::NavBar,
    user::{Role, find_user_id_by_email},
};

/// The state needed for the expenses page.
#[derive(Debug, Clone)]
pub struct ExpensesPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ExpensesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn add_expense_form(today: Date) -> Markup {
    html!(
        section class="w-full max-w-md space-y-4"
        {
            h2 class="text-lg font-bold" { "Add New Expense" }

            form
                hx-post=(endpoints::EXPENSES_API)
                hx-target-4xx="#alert-container"
                hx-target-5xx="#alert-container"
                class="space-y-4"
            {
                div
                {
                    label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }
                    input
                        type="number"
                        name="amount"
                        id="amount"
                        min="0"
                        step="0.01"
                        class=(FORM_TEXT_INPUT_STYLE)
                        required;
                }

                div
                {
                    label for="category" class=(FORM_LABEL_STYLE) { "Category" }
                    input
                        type="text"
                        name="category"
                        id="category"
                        placeholder="e.g. food"
                        class=(FORM_TEXT_INPUT_STYLE)
                        required;
                }

                div
                {
                    label for="date" class=(FORM_LABEL_STYLE) { "Date" }
                    input
                        type="date"
                        name="date"
                        id="date"
                        value=(today)
                        class=(FORM_TEXT_INPUT_STYLE)
                        required;
                }

                div
                {
                    label for="description" class=(FORM_LABEL_STYLE) { "Description" }
                    textarea
                        name="description"
                        id="description"
                        rows="2"
                        class=(FORM_TEXT_INPUT_STYLE)
                    {}
                }

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add Expense" }
            }
        }
    )
}

fn expenses_table(expenses: &[Expense]) -> Markup {
    let table_row = |expense: &Expense| {
        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (expense.id) }
                td class=(TABLE_CELL_STYLE) { (expense.user_id) }
                td class="px-6 py-4 text-right" { (format_currency(expense.amount)) }
                td class=(TABLE_CELL_STYLE) { (expense.category) }
                td class=(TABLE_CELL_STYLE) { time datetime=(expense.date) { (expense.date) } }
                td class=(TABLE_CELL_STYLE) { (expense.description) }
            }
        )
    };

    html!(
        section class="w-full overflow-x-auto dark:bg-gray-800 lg:max-w-5xl lg:mx-auto"
        {
            table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "ID" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "User" }
                        th scope="col" class="px-6 py-3 text-right" { "Amount" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                    }
                }

                tbody
                {
                    @for expense in expenses {
                        (table_row(expense))
                    }

                    @if expenses.is_empty() {
                        tr
                        {
                            td
                                colspan="6"
                                class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                            {
                                "No expenses found."
                            }
                        }
                    }
                }
            }
        }
    )
}

fn expenses_view(identity: &Identity, expenses: &[Expense], today: Date) -> Markup {
    let nav_bar = NavBar::new(endpoints::EXPENSES_VIEW, &identity.email).into_html();
    let list_title = match identity.role {
        Role::Admin => "All Expenses",
        Role::User => "Your Expense List",
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-8 w-full lg:max-w-5xl"
            {
                h1 class="text-xl font-bold" { "Manage Expenses" }

                (add_expense_form(today))

                section class="space-y-4"
                {
                    h2 class="text-lg font-bold" { (list_title) }

                    (expenses_table(expenses))
                }
            }
        }
    );

    base("Expenses", &content)
}

/// Renders the expenses page.
///
/// Admins see the expenses of every user; everyone else only sees rows they
/// recorded themselves. The scoping is decided here, when the query is
/// chosen, not by filtering rows after the fact.
pub async fn get_expenses_page(
    State(state): State<ExpensesPageState>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let expenses = match identity.role {
        Role::Admin => list_all_expenses(&connection)?,
        Role::User => {
            let user_id = find_user_id_by_email(&identity.email, &connection)
                .map_err(|error| match error {
                    Error::NotFound => Error::UnresolvedIdentity,
                    error => error,
                })?;
            list_expenses_by_user(user_id, &connection)?
        }
    };

    let today = OffsetDateTime::now_utc().date();

    Ok(expenses_view(&identity, &expenses, today).into_response())
}
