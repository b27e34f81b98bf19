//! Page routes and the access guard in front of them

use advisory_model::{Profile, Role};
use std::fmt;
use std::str::FromStr;

/// Portal page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/`
    Home,
    /// `/dashboard`
    Dashboard,
    /// `/my-requests`
    MyRequests,
    /// `/my-items`
    MyItems,
    /// `/admin-dashboard`
    AdminDashboard,
    /// `/information-hub`
    InformationHub,
    /// `/login`
    Login,
    /// `/signup`
    Signup,
    /// `/forgot-password`
    ForgotPassword,
    /// `/admin-login`
    AdminLogin,
    /// Anything else
    NotFound,
}

impl Route {
    /// Canonical path; `NotFound` has none
    #[must_use]
    pub fn path(self) -> Option<&'static str> {
        Some(match self {
            Self::Home => "/",
            Self::Dashboard => "/dashboard",
            Self::MyRequests => "/my-requests",
            Self::MyItems => "/my-items",
            Self::AdminDashboard => "/admin-dashboard",
            Self::InformationHub => "/information-hub",
            Self::Login => "/login",
            Self::Signup => "/signup",
            Self::ForgotPassword => "/forgot-password",
            Self::AdminLogin => "/admin-login",
            Self::NotFound => return None,
        })
    }

    /// Parse a path; query strings, fragments and one trailing slash are ignored
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match path.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed,
            _ => path,
        };
        match path {
            "/" | "" => Self::Home,
            "/dashboard" => Self::Dashboard,
            "/my-requests" => Self::MyRequests,
            "/my-items" => Self::MyItems,
            "/admin-dashboard" => Self::AdminDashboard,
            "/information-hub" => Self::InformationHub,
            "/login" => Self::Login,
            "/signup" => Self::Signup,
            "/forgot-password" => Self::ForgotPassword,
            "/admin-login" => Self::AdminLogin,
            _ => Self::NotFound,
        }
    }

    /// Who may see the page
    #[must_use]
    pub fn access(self) -> Access {
        match self {
            Self::Dashboard | Self::MyRequests | Self::MyItems => Access::SignedIn,
            Self::AdminDashboard => Access::Admin,
            Self::Home
            | Self::InformationHub
            | Self::Login
            | Self::Signup
            | Self::ForgotPassword
            | Self::AdminLogin
            | Self::NotFound => Access::Public,
        }
    }
}

impl FromStr for Route {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path().unwrap_or("(not found)"))
    }
}

/// Access level of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Everyone
    Public,
    /// Any signed-in user
    SignedIn,
    /// Users with the admin role
    Admin,
}

/// Guard decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the page
    Allow,
    /// Send the visitor elsewhere
    Redirect(Route),
}

/// Decide whether the visitor may open `route`
#[must_use]
pub fn guard(route: Route, profile: Option<&Profile>) -> GuardDecision {
    match (route.access(), profile) {
        (Access::Public, _) => GuardDecision::Allow,
        (Access::SignedIn, Some(_)) => GuardDecision::Allow,
        (Access::SignedIn, None) => GuardDecision::Redirect(Route::Login),
        (Access::Admin, Some(p)) if p.role == Role::Admin => GuardDecision::Allow,
        (Access::Admin, _) => {
            tracing::debug!(%route, "admin page refused");
            GuardDecision::Redirect(Route::AdminLogin)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_paths() {
        for route in [
            Route::Home,
            Route::Dashboard,
            Route::MyRequests,
            Route::MyItems,
            Route::AdminDashboard,
            Route::InformationHub,
            Route::Login,
            Route::Signup,
            Route::ForgotPassword,
            Route::AdminLogin,
        ] {
            let path = route.path().unwrap();
            assert_eq!(Route::parse(path), route, "{path}");
        }
        assert_eq!(Route::parse("/my-items/"), Route::MyItems);
        assert_eq!(Route::parse("/login?next=/dashboard"), Route::Login);
        assert_eq!(Route::parse("/nope"), Route::NotFound);
        assert_eq!(Route::parse("/admin-dashboard/extra"), Route::NotFound);
    }

    #[test]
    fn guard_rules() {
        let user = Profile::new("Rita", "rita@example.com");
        let admin = Profile::new("Ada", "ada@example.com").with_role(Role::Admin);

        assert_eq!(guard(Route::Home, None), GuardDecision::Allow);
        assert_eq!(guard(Route::NotFound, None), GuardDecision::Allow);
        assert_eq!(
            guard(Route::MyRequests, None),
            GuardDecision::Redirect(Route::Login)
        );
        assert_eq!(guard(Route::MyRequests, Some(&user)), GuardDecision::Allow);
        assert_eq!(
            guard(Route::AdminDashboard, None),
            GuardDecision::Redirect(Route::AdminLogin)
        );
        assert_eq!(
            guard(Route::AdminDashboard, Some(&user)),
            GuardDecision::Redirect(Route::AdminLogin)
        );
        assert_eq!(guard(Route::AdminDashboard, Some(&admin)), GuardDecision::Allow);
    }
}
