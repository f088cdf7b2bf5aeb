//! Console route table. Only the paths the session core redirects to are named
//! here; the rest are listed so the CLI can tell protected pages from unknown ones.

pub const ROOT: &str = "/";
pub const SIGNIN: &str = "/signin";
pub const SIGNUP: &str = "/signup";
pub const DASHBOARD: &str = "/dashboard";

/// Pages that require a session.
pub const PROTECTED: &[&str] = &[
    DASHBOARD,
    "/home",
    "/users",
    "/manage-api-keys",
    "/apis",
    "/customers",
    "/channel-partners",
    "/vendors",
    "/reports",
    "/logs",
    "/batch-processing",
    "/profile",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteKind {
    /// `/` redirects to the sign-in page.
    Root,
    /// Sign-in and sign-up.
    AuthPage,
    Protected,
    NotFound,
}

/// Classifies a location. Query strings, fragments and trailing slashes are ignored.
#[must_use]
pub fn classify(location: &str) -> RouteKind {
    let path = path_of(location);
    if path == ROOT {
        return RouteKind::Root;
    }
    if path == SIGNIN || path == SIGNUP {
        return RouteKind::AuthPage;
    }
    if PROTECTED.iter().any(|prefix| matches_prefix(path, prefix)) {
        return RouteKind::Protected;
    }
    RouteKind::NotFound
}

/// Strips the query and fragment, and any trailing slash except the root's.
#[must_use]
pub fn path_of(location: &str) -> &str {
    let end = location.find(['?', '#']).unwrap_or(location.len());
    let path = location[..end].trim();
    if path.is_empty() {
        return ROOT;
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        ROOT
    } else {
        trimmed
    }
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
