use shared::domain::UserId;

/// Signed-in user as reported by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub token: String,
}

pub trait SessionProvider: Send + Sync {
    fn current_session(&self) -> Option<Session>;

    fn is_authenticated(&self) -> bool {
        self.current_session().is_some()
    }
}

/// Fixed session, e.g. from a token passed on the command line.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    session: Option<Session>,
}

impl StaticSession {
    pub fn signed_in(user_id: UserId, token: impl Into<String>) -> Self {
        Self {
            session: Some(Session {
                user_id,
                token: token.into(),
            }),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl SessionProvider for StaticSession {
    fn current_session(&self) -> Option<Session> {
        self.session.clone()
    }
}
