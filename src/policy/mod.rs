//! Role-based access and routing policy.
//!
//! Every request is classified into a [`RouteClass`] and then decided
//! against the caller's session and profile roles. The decision function is
//! pure; lookups live in the access middleware.

pub mod role;
pub mod route;

pub use role::{Role, RoleSet, UnknownRole};
pub use route::{RouteClass, DASHBOARD_PATH, LOGIN_PATH, SIGNUP_PATH};

/// Outcome of evaluating the policy for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectToLogin,
    /// Redirect to the canonical root of the given role
    RedirectToRoot(Role),
}

impl Decision {
    pub fn location(&self) -> Option<String> {
        match self {
            Decision::Allow => None,
            Decision::RedirectToLogin => Some(LOGIN_PATH.to_string()),
            Decision::RedirectToRoot(role) => Some(role.root_path()),
        }
    }
}

/// Decide what happens to a request.
///
/// `roles` is `None` when the profile is missing, not yet provisioned, or its
/// lookup failed; protected pages are then let through in degraded mode.
pub fn decide(route: RouteClass, has_session: bool, roles: Option<&RoleSet>) -> Decision {
    match (route, has_session) {
        (RouteClass::Unprotected, _) => Decision::Allow,
        (RouteClass::Public, false) => Decision::Allow,
        (_, false) => Decision::RedirectToLogin,
        (RouteClass::DashboardOther, true) => Decision::Allow,
        (RouteClass::Public, true) | (RouteClass::RoleRoot, true) => match roles {
            Some(roles) => Decision::RedirectToRoot(roles.canonical()),
            None => Decision::Allow,
        },
        (RouteClass::RoleScoped(required), true) => match roles {
            Some(roles) if roles.contains(required) => Decision::Allow,
            Some(roles) => Decision::RedirectToRoot(roles.canonical()),
            None => Decision::Allow,
        },
    }
}
