//! Defines the session token stored in the auth cookie and the identity that
//! the auth middleware hands to route handlers.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::user::Role;

mod datetime_format {
    //! Specifies how to serialize a [time::OffsetDateTime] in a custom format that
    //! avoids serialisations with datetimes containing midnight.
    //!
    //! The default serializer for [time::OffsetDateTime] will serialize
    //! "00:00:00.000000" as "0:00:00.0" and the deserializer would error out
    //! because it expects the hours to be two digits, not one.
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{
        OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
    };

    /// Date time format for the token expiry, e.g. "2021-01-01 00:00:00.000000 +00:00:00".
    const DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
             sign:mandatory]:[offset_minute]:[offset_second]"
    );

    pub fn serialize<S>(dt: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = dt
            .format(DATE_TIME_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&s, DATE_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// The session state for one signed-in user.
///
/// The token lives in an encrypted, signed private cookie, so each client
/// connection carries its own session and the server holds no session state
/// between requests. A missing or expired token is the unauthenticated state.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Token {
    /// The email of the signed-in user.
    pub email: String,
    /// The access level the user had when they logged in.
    pub role: Role,
    /// When the session stops being valid.
    #[serde(
        serialize_with = "datetime_format::serialize",
        deserialize_with = "datetime_format::deserialize"
    )]
    pub expires_at: OffsetDateTime,
}

/// The resolved identity of the signed-in user.
///
/// The auth middleware inserts this into request extensions after validating
/// the session token, so route handlers never read the cookie jar themselves.
#[derive(Clone, Debug, PartialEq)]
pub struct Identity {
    /// The email of the signed-in user.
    pub email: String,
    /// The access level of the signed-in user.
    pub role: Role,
}

impl From<&Token> for Identity {
    fn from(token: &Token) -> Self {
        Self {
            email: token.email.clone(),
            role: token.role,
        }
    }
}
