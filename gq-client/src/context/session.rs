//! Session information

use crate::model::Claims;

/// Authentication state of the client
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Session {
    /// Nobody is logged in
    #[default]
    Anonymous,
    /// User is logged in, claims of their token are kept
    Authenticated(Claims),
}

/// Session transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Login { claims: Claims },
    Logout,
}

impl Session {
    /// Currently logged in user
    pub fn user(&self) -> Option<&Claims> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(claims) => Some(claims),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Performs the transition
    pub fn reduce(self, action: Action) -> Self {
        match action {
            Action::Login { claims } => Self::Authenticated(claims),
            Action::Logout => Self::Anonymous,
        }
    }
}
