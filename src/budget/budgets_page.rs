//! Displays the budget form and the budget table.

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
    budget::core::{Budget, Period, list_all_budgets, list_budgets_by_user},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency,
    },
    navigation::NavBar,
    user::{Role, find_user_id_by_email},
};

/// The state needed for the budgets page.
#[derive(Debug, Clone)]
pub struct BudgetsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BudgetsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn add_budget_form(today: Date) -> Markup {
    html!(
        section class="w-full max-w-md space-y-4"
        {
            h2 class="text-lg font-bold" { "Add New Budget" }

            form
                hx-post=(endpoints::BUDGETS_API)
                hx-target-4xx="#alert-container"
                hx-target-5xx="#alert-container"
                class="space-y-4"
            {
                div
                {
                    label for="budget_amount" class=(FORM_LABEL_STYLE) { "Budget Amount" }
                    input
                        type="number"
                        name="budget_amount"
                        id="budget_amount"
                        min="0"
                        step="0.01"
                        class=(FORM_TEXT_INPUT_STYLE)
                        required;
                }

                div
                {
                    label for="period" class=(FORM_LABEL_STYLE) { "Period" }
                    select
                        name="period"
                        id="period"
                        class=(FORM_TEXT_INPUT_STYLE)
                    {
                        option value=(Period::Weekly) { "Weekly" }
                        option value=(Period::Monthly) selected { "Monthly" }
                    }
                }

                div
                {
                    label for="start_date" class=(FORM_LABEL_STYLE) { "Start Date" }
                    input
                        type="date"
                        name="start_date"
                        id="start_date"
                        value=(today)
                        class=(FORM_TEXT_INPUT_STYLE)
                        required;
                }

                div
                {
                    label for="end_date" class=(FORM_LABEL_STYLE) { "End Date" }
                    input
                        type="date"
                        name="end_date"
                        id="end_date"
                        value=(today)
                        class=(FORM_TEXT_INPUT_STYLE)
                        required;
                }

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add Budget" }
            }
        }
    )
}

fn budgets_table(budgets: &[Budget]) -> Markup {
    let table_row = |budget: &Budget| {
        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (budget.id) }
                td class=(TABLE_CELL_STYLE) { (budget.user_id) }
                td class="px-6 py-4 text-right" { (format_currency(budget.budget_amount)) }
                td class=(TABLE_CELL_STYLE) { (budget.period) }
                td class=(TABLE_CELL_STYLE) { time datetime=(budget.start_date) { (budget.start_date) } }
                td class=(TABLE_CELL_STYLE) { time datetime=(budget.end_date) { (budget.end_date) } }
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
                        th scope="col" class="px-6 py-3 text-right" { "Budget Amount" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Period" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Start Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "End Date" }
                    }
                }

                tbody
                {
                    @for budget in budgets {
                        (table_row(budget))
                    }

                    @if budgets.is_empty() {
                        tr
                        {
                            td
                                colspan="6"
                                class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                            {
                                "No budgets found."
                            }
                        }
                    }
                }
            }
        }
    )
}

fn budgets_view(identity: &Identity, budgets: &[Budget], today: Date) -> Markup {
    let nav_bar = NavBar::new(endpoints::BUDGETS_VIEW, &identity.email).into_html();
    let list_title = match identity.role {
        Role::Admin => "All Budgets",
        Role::User => "Your Budget List",
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-8 w-full lg:max-w-5xl"
            {
                h1 class="text-xl font-bold" { "Manage Budgets" }

                (add_budget_form(today))

                section class="space-y-4"
                {
                    h2 class="text-lg font-bold" { (list_title) }

                    (budgets_table(budgets))
                }
            }
        }
    );

    base("Budgets", &content)
}

/// Renders the budgets page.
///
/// Admins see the budgets of every user; everyone else only sees rows they
/// set themselves. The scoping is decided here, when the query is chosen, not
/// by filtering rows after the fact.
pub async fn get_budgets_page(
    State(state): State<BudgetsPageState>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let budgets = match identity.role {
        Role::Admin => list_all_budgets(&connection)?,
        Role::User => {
            let user_id = find_user_id_by_email(&identity.email, &connection)
                .map_err(|error| match error {
                    Error::NotFound => Error::UnresolvedIdentity,
                    error => error,
                })?;
            list_budgets_by_user(user_id, &connection)?
        }
    };

    let today = OffsetDateTime::now_utc().date();

    Ok(budgets_view(&identity, &budgets, today).into_response())
}

#[cfg(test)]
mod budgets_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State};
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        auth::{Identity, PasswordHash},
        budget::core::{NewBudget, Period, insert_budget},
        db::initialize,
        user::{Role, User, create_user},
    };

    use super::{BudgetsPageState, get_budgets_page};

    fn get_test_state() -> BudgetsPageState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        BudgetsPageState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    fn insert_test_user(email: &str, role: Role, state: &BudgetsPageState) -> User {
        let connection = state.db_connection.lock().unwrap();
        create_user(
            email,
            PasswordHash::new_unchecked("hunter2"),
            role,
            &connection,
        )
        .expect("Could not create test user")
    }

    fn insert_test_budget(user: &User, budget_amount: f64, state: &BudgetsPageState) {
        let connection = state.db_connection.lock().unwrap();
        insert_budget(
            NewBudget {
                user_id: user.id,
                budget_amount,
                period: Period::Monthly,
                start_date: date!(2025 - 06 - 01),
                end_date: date!(2025 - 06 - 30),
            },
            &connection,
        )
        .expect("Could not create test budget");
    }

    fn identity_for(user: &User) -> Identity {
        Identity {
            email: user.email.clone(),
            role: user.role,
        }
    }

    async fn render_page_for(user: &User, state: &BudgetsPageState) -> String {
        let response = get_budgets_page(State(state.clone()), Extension(identity_for(user)))
            .await
            .expect("Could not render budgets page");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8_lossy(&body).to_string()
    }

    #[tokio::test]
    async fn user_only_sees_their_own_budgets() {
        let state = get_test_state();
        let alice = insert_test_user("alice@example.com", Role::User, &state);
        let bob = insert_test_user("bob@example.com", Role::User, &state);
        insert_test_budget(&alice, 123.45, &state);
        insert_test_budget(&bob, 987.65, &state);

        let page = render_page_for(&alice, &state).await;

        assert!(page.contains("$123.45"));
        assert!(
            !page.contains("$987.65"),
            "another user's budgets must not be shown"
        );
    }

    #[tokio::test]
    async fn admin_sees_every_users_budgets() {
        let state = get_test_state();
        let alice = insert_test_user("alice@example.com", Role::User, &state);
        let admin = insert_test_user("admin@example.com", Role::Admin, &state);
        insert_test_budget(&alice, 123.45, &state);

        let page = render_page_for(&admin, &state).await;

        assert!(
            page.contains("$123.45"),
            "admins should see other users' budgets"
        );
    }

    #[tokio::test]
    async fn page_shows_indicator_when_no_budgets_exist() {
        let state = get_test_state();
        let alice = insert_test_user("alice@example.com", Role::User, &state);

        let page = render_page_for(&alice, &state).await;

        assert!(page.contains("No budgets found."));
    }

    #[tokio::test]
    async fn page_fails_when_identity_cannot_be_resolved() {
        let state = get_test_state();
        let stale_identity = Identity {
            email: "gone@example.com".to_owned(),
            role: Role::User,
        };

        let result = get_budgets_page(State(state), Extension(stale_identity)).await;

        assert_eq!(result.err(), Some(Error::UnresolvedIdentity));
    }
}
