use super::role::Role;

pub const LOGIN_PATH: &str = "/login";
pub const SIGNUP_PATH: &str = "/signup";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Policy-relevant classification of a request path, derived on every request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Login and signup pages
    Public,
    /// `/dashboard` with no role segment
    RoleRoot,
    /// `/dashboard/<role>/...`
    RoleScoped(Role),
    /// Any other path starting with `/dashboard`: needs a session, no role check
    DashboardOther,
    /// Everything else: assets, health, logout
    Unprotected,
}

impl RouteClass {
    pub fn classify(path: &str) -> Self {
        let trimmed = match path.trim_end_matches('/') {
            "" => "/",
            p => p,
        };

        if trimmed == LOGIN_PATH || trimmed == SIGNUP_PATH {
            return RouteClass::Public;
        }
        if trimmed == DASHBOARD_PATH {
            return RouteClass::RoleRoot;
        }

        let Some(rest) = trimmed.strip_prefix(DASHBOARD_PATH) else {
            return RouteClass::Unprotected;
        };
        let segment = rest.strip_prefix('/').and_then(|r| r.split('/').next()).unwrap_or_default();
        match segment.parse::<Role>() {
            Ok(role) => RouteClass::RoleScoped(role),
            Err(_) => RouteClass::DashboardOther,
        }
    }

    /// Whether evaluation needs the caller's profile
    pub fn needs_profile(&self, has_session: bool) -> bool {
        has_session && !matches!(self, RouteClass::Unprotected | RouteClass::DashboardOther)
    }
}
