//! Google Calendar backend: OAuth login, the credential cache and the REST
//! calls the fetch driver needs.

mod api;
mod auth;
mod secrets;
mod types;

pub use auth::GoogleAuth;
