/// Per-connection, ephemeral session state (spec.md §3). Lives exactly as
/// long as the TCP connection does.
#[derive(Debug, Default)]
pub struct UserSession {
    username: Option<String>,
}

impl UserSession {
    pub fn new() -> UserSession {
        UserSession { username: None }
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn authenticate_as(&mut self, username: impl Into<String>) {
        self.username = Some(username.into());
    }
}
