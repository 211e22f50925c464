// Public handlers: login, signup and logout.
//
// Reachable without a session. The access policy bounces callers that
// already have a provisioned profile away from login and signup.
pub mod auth;

pub use auth::{login_page, login_post, logout, signup_page, signup_post};
