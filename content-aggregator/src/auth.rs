use crate::traits::CredentialProvider;

/// A fixed bearer token, e.g. one issued at login and passed in by the caller.
#[derive(Clone, Default)]
pub struct StaticToken {
    token: Option<String>,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        Self { token: Some(token).filter(|t| !t.is_empty()) }
    }

    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

impl CredentialProvider for StaticToken {
    fn bearer(&self) -> Option<String> {
        self.token.clone()
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = if self.token.is_some() { "***" } else { "<none>" };
        f.debug_struct("StaticToken").field("token", &shown).finish()
    }
}
