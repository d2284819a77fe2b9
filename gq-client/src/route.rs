//! Guards for routes available only to anonymous users

use crate::context::SessionStore;
use crate::model::Claims;

/// Where authenticated users are sent from auth-only routes
pub const HOME_PATH: &str = "/";

/// Result of a navigation attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Decision<C, P> {
    /// Render the component with forwarded navigation props
    Render { component: C, props: P },
    /// Navigate somewhere else instead
    Redirect { to: &'static str },
}

/// Decides what an auth-only route shows to the `user`
pub fn decide<C, P>(user: Option<&Claims>, component: C, props: P) -> Decision<C, P> {
    match user {
        Some(_) => Decision::Redirect { to: HOME_PATH },
        None => Decision::Render { component, props },
    }
}

/// Route rendering its component only to anonymous users
#[derive(Debug, Clone)]
pub struct AuthRoute<C> {
    path: String,
    component: C,
}

impl<C: Clone> AuthRoute<C> {
    pub fn new(path: impl Into<String>, component: C) -> Self {
        Self {
            path: path.into(),
            component,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Checks if the route handles the `path`. Trailing slashes are not significant.
    pub fn matches(&self, path: &str) -> bool {
        fn trim(path: &str) -> &str {
            match path.trim_end_matches('/') {
                "" => "/",
                path => path,
            }
        }

        trim(&self.path) == trim(path)
    }

    /// Decides on the navigation using the current session
    pub fn resolve<P>(&self, session: &SessionStore, props: P) -> Decision<C, P> {
        decide(session.user().as_ref(), self.component.clone(), props)
    }
}

/// Pages accessible only without logging in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Login,
    Register,
}

impl std::fmt::Display for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Login => write!(f, "login"),
            Self::Register => write!(f, "register"),
        }
    }
}

/// All the application auth-only routes
pub fn auth_routes() -> Vec<AuthRoute<Page>> {
    vec![
        AuthRoute::new("/login", Page::Login),
        AuthRoute::new("/register", Page::Register),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::storage::MemoryStorage;

    #[derive(Debug, Clone, PartialEq)]
    struct Props {
        path: &'static str,
    }

    #[test]
    fn authenticated_users_are_redirected() {
        let user = Claims::new(4_000_000_000).with("sub", "u1");
        for page in [Page::Login, Page::Register] {
            assert_eq!(
                decide(Some(&user), page, Props { path: "/login" }),
                Decision::Redirect { to: "/" }
            );
        }
    }

    #[test]
    fn anonymous_users_see_the_page() {
        for page in [Page::Login, Page::Register] {
            assert_eq!(
                decide(None, page, Props { path: "/login" }),
                Decision::Render {
                    component: page,
                    props: Props { path: "/login" }
                }
            );
        }
    }

    #[test]
    fn path_matching() {
        let route = AuthRoute::new("/login", Page::Login);
        assert!(route.matches("/login"));
        assert!(route.matches("/login/"));
        assert!(!route.matches("/"));
        assert!(!route.matches("/login/reset"));
        assert!(!route.matches("/register"));

        let home = AuthRoute::new("/", Page::Login);
        assert!(home.matches("/"));
        assert!(home.matches(""));
    }

    #[test]
    fn resolve_reads_session_on_each_navigation() {
        let store = SessionStore::initialize(Arc::new(MemoryStorage::new())).unwrap();
        let routes = auth_routes();
        let login = routes.iter().find(|route| route.matches("/login")).unwrap();

        assert_eq!(
            login.resolve(&store, ()),
            Decision::Render {
                component: Page::Login,
                props: ()
            }
        );

        store
            .login(Claims::new(4_000_000_000).with("sub", "u1"), "tok123")
            .unwrap();
        assert_eq!(login.resolve(&store, ()), Decision::Redirect { to: HOME_PATH });

        store.logout().unwrap();
        assert_eq!(
            login.resolve(&store, ()),
            Decision::Render {
                component: Page::Login,
                props: ()
            }
        );
    }
}
