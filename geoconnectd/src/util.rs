//! Various Rocket-related utilities.

use geoconnect_common::prelude::{error};
use geoconnect_common::{
    db,
    errors::{user_facing_message, DisplayCausesAndBacktraceExt},
    forms::FormData,
    prelude::*,
    services::Remotes,
    signing,
    url::form_urlencoded,
};
use headers::{authorization::Basic, Authorization, Header, HeaderValue};
use rocket::{
    data::{self, Data, FromData, ToByteUnit},
    http::Status,
    outcome::{try_outcome, Outcome},
    request::{self, FromRequest, Request},
    response::{self, Responder},
    tokio::task::spawn_blocking,
    State,
};
use std::{result, sync::Arc};

/// The user name for admin-only routes.
pub const ADMIN_USERNAME: &str = "admin";

/// Everything a handler needs besides a database connection. Handlers clone
/// the `Arc` into their blocking closures.
pub struct Services {
    /// Our settings.
    pub settings: Settings,
    /// Clients for WorldMap and Dataverse.
    pub remotes: Remotes,
}

/// Shared state, as managed by Rocket.
pub type SharedServices = Arc<Services>;

/// A handle to our connection pool. Connections are checked out on a
/// blocking thread inside `run`, because everything we do with them blocks.
#[derive(Clone)]
pub struct DbConn(db::Pool);

impl DbConn {
    /// Run `f` on a blocking thread with a database connection.
    pub async fn run<F, T>(self, f: F) -> GeoconnectdResult<T>
    where
        F: FnOnce(&PgConnection) -> GeoconnectdResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.0;
        spawn_blocking(move || {
            let conn = pool.get().context("could not get database connection")?;
            f(&conn)
        })
        .await
        .map_err(|err| format_err!("database task failed: {}", err))?
    }
}

/// This holds a `db::Pool` and it can be attached to a Rocket server.
pub struct DbPool(pub db::Pool);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for DbConn {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, ()> {
        let pool = try_outcome!(request.guard::<&State<DbPool>>().await);
        Outcome::Success(DbConn(pool.0.clone()))
    }
}

/// The administrator password. This is looked up once and stored in our
/// server state.
pub struct AdminPassword(pub String);

/// Someone who knows the admin password. Only the test-only admin routes
/// require this.
pub struct User;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, ()> {
        let auth = match basic_auth_from_request(request) {
            Ok(Some(auth)) => auth,
            Ok(None) => return Outcome::Failure((Status::Unauthorized, ())),
            Err(_) => return Outcome::Failure((Status::BadRequest, ())),
        };
        let password = try_outcome!(request.guard::<&State<AdminPassword>>().await);
        let username_ok = signing::secrets_match(auth.0.username(), ADMIN_USERNAME);
        let password_ok = signing::secrets_match(auth.0.password(), &password.0);
        if username_ok & password_ok {
            Outcome::Success(User)
        } else {
            Outcome::Failure((Status::Unauthorized, ()))
        }
    }
}

/// Extract HTTP Basic Auth credentials from a request.
fn basic_auth_from_request(request: &Request<'_>) -> Result<Option<Authorization<Basic>>> {
    let auth_headers = request
        .headers()
        .get(Authorization::<Basic>::name().as_str())
        .map(HeaderValue::from_str)
        .collect::<result::Result<Vec<HeaderValue>, _>>()?;

    if auth_headers.is_empty() {
        Ok(None)
    } else {
        let auth = Authorization::<Basic>::decode(&mut auth_headers.iter())
            .map_err(|_| format_err!("expected Authorization Basic header"))?;
        Ok(Some(auth))
    }
}

/// A URL-encoded form body, as a map of field names to values. Validation
/// happens in `geoconnect_common::forms`, so we accept any fields here.
pub struct PostedForm(pub FormData);

#[rocket::async_trait]
impl<'r> FromData<'r> for PostedForm {
    type Error = Error;

    async fn from_data(req: &'r Request<'_>, data: Data<'r>) -> data::Outcome<'r, Self> {
        let limit = req.limits().get("form").unwrap_or_else(|| 32.kibibytes());
        match data.open(limit).into_string().await {
            Ok(body) if body.is_complete() => {
                let fields = form_urlencoded::parse(body.as_bytes())
                    .into_owned()
                    .collect::<FormData>();
                Outcome::Success(PostedForm(fields))
            }
            Ok(_) => Outcome::Failure((Status::PayloadTooLarge, format_err!("form is too large"))),
            Err(err) => Outcome::Failure((Status::BadRequest, err.into())),
        }
    }
}

/// An error type for `geoconnectd`.
#[derive(Debug)]
pub enum GeoconnectdError {
    /// We don't have the requested record. The message is shown as-is.
    NotFound(String),
    /// Anything else.
    Other(Error),
}

impl<'r> Responder<'r, 'static> for GeoconnectdError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        match self {
            GeoconnectdError::NotFound(msg) => (Status::NotFound, msg).respond_to(req),
            GeoconnectdError::Other(err) => {
                // The full error goes in the logs. People only see the
                // message meant for them.
                error!("{}", err.display_causes_without_backtrace());
                (Status::InternalServerError, user_facing_message(&err)).respond_to(req)
            }
        }
    }
}

impl From<Error> for GeoconnectdError {
    fn from(err: Error) -> Self {
        GeoconnectdError::Other(err)
    }
}

/// The result type of `geoconnectd` handlers.
pub type GeoconnectdResult<T> = result::Result<T, GeoconnectdError>;

/// Look up a data file by `md5`, or fail with a 404 using `not_found`.
pub fn find_file(
    md5: &str,
    not_found: &str,
    conn: &PgConnection,
) -> GeoconnectdResult<GisDataFile> {
    GisDataFile::find_by_md5(md5, conn)?
        .ok_or_else(|| GeoconnectdError::NotFound(not_found.to_owned()))
}
