use crate::store::UserDirectory;

/// The authenticated principal, supplied by the (out-of-scope)
/// authentication collaborator. The core trusts it without re-validating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub email: String,
}

impl CurrentUser {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("unknown user `{email}`")]
    UnknownUser { email: String },
    #[error("user `{email}` is disabled")]
    Disabled { email: String },
}

/// Entry-point identity check for the CLI. When the user directory is empty
/// (no authentication collaborator has written it yet) the identity is
/// trusted as-is.
pub fn resolve_current_user(users: &UserDirectory, email: &str) -> Result<CurrentUser, AuthError> {
    if users.is_empty() {
        return Ok(CurrentUser::new(email));
    }
    match users.get(email) {
        Some(record) if record.disabled => Err(AuthError::Disabled {
            email: email.to_string(),
        }),
        Some(record) => Ok(CurrentUser::new(record.email.clone())),
        None => Err(AuthError::UnknownUser {
            email: email.to_string(),
        }),
    }
}
