//! Displays account details.
//!
//! Admins see every registered account; everyone else only sees their own
//! account row.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::Identity,
    endpoints,
    html::{
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
    },
    navigation::NavBar,
    user::{Role, UserAccount, get_account_by_email, list_accounts},
};

/// The state needed for the users page.
#[derive(Debug, Clone)]
pub struct UsersPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UsersPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn users_view(identity: &Identity, accounts: &[UserAccount]) -> Markup {
    let nav_bar = NavBar::new(endpoints::USERS_VIEW, &identity.email).into_html();
    let list_title = match identity.role {
        Role::Admin => "All User Information",
        Role::User => "Your Account Information",
    };

    let table_row = |account: &UserAccount| {
        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (account.id) }
                td class=(TABLE_CELL_STYLE) { (account.email) }
                td class=(TABLE_CELL_STYLE) { (account.role) }
            }
        )
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-3xl"
            {
                h1 class="text-xl font-bold" { "Manage Accounts" }

                h2 class="text-lg font-bold" { (list_title) }

                section class="w-full overflow-x-auto dark:bg-gray-800"
                {
                    table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "User ID" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Email" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Role" }
                            }
                        }

                        tbody
                        {
                            @for account in accounts {
                                (table_row(account))
                            }
                        }
                    }
                }
            }
        }
    );

    base("Users", &content)
}

/// Renders the users page.
///
/// Admins get every registered account; everyone else gets exactly their own
/// row, fetched with a query scoped to the session email.
pub async fn get_users_page(
    State(state): State<UsersPageState>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let accounts = match identity.role {
        Role::Admin => list_accounts(&connection)?,
        Role::User => match get_account_by_email(&identity.email, &connection) {
            Ok(account) => vec![account],
            Err(Error::NotFound) => return Err(Error::UnresolvedIdentity),
            Err(error) => return Err(error),
        },
    };

    Ok(users_view(&identity, &accounts).into_response())
}
