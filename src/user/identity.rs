use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::utils::error::UserError;

const MAX_NAME_LEN: usize = 30;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("valid email pattern")
});

/// A chat user record as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    pub id: String,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            id: id.into(),
        }
    }

    /// Check name, email and id, in that order, stopping at the first
    /// failure. The name limit counts UTF-8 bytes.
    pub fn validate(&self) -> Result<(), UserError> {
        if self.name.is_empty() || self.name.len() > MAX_NAME_LEN {
            return Err(UserError::InvalidName);
        }
        if !EMAIL.is_match(&self.email) {
            return Err(UserError::InvalidEmail);
        }
        if self.id.is_empty() {
            return Err(UserError::InvalidId);
        }
        Ok(())
    }

    pub fn into_validated(self) -> Result<ValidatedUser, UserError> {
        self.validate()?;
        Ok(ValidatedUser(self))
    }
}

/// A `User` that passed validation. Only obtainable through
/// [`User::into_validated`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUser(User);

impl ValidatedUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }
}
