use crate::utils::{AppError, Result};

/// Longest accepted user id, in characters
pub const MAX_USER_ID_CHARS: usize = 128;

/// Who is making the request. Ids are opaque and never verified here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Caller {
    #[default]
    Anonymous,
    User(String),
}

impl Caller {
    /// Interpret an optional header value
    pub fn from_header(value: Option<&str>) -> Result<Self> {
        let Some(raw) = value else {
            return Ok(Self::Anonymous);
        };

        let id = raw.trim();
        if id.is_empty() {
            return Err(AppError::BadRequest("User id must not be empty".to_string()));
        }
        if id.chars().count() > MAX_USER_ID_CHARS {
            return Err(AppError::BadRequest(format!(
                "User id must be at most {} characters",
                MAX_USER_ID_CHARS
            )));
        }

        Ok(Self::User(id.to_string()))
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::User(id) => Some(id),
        }
    }

    /// The user id, or `Unauthorized` for anonymous callers
    pub fn require_user(&self) -> Result<&str> {
        self.user_id()
            .ok_or_else(|| AppError::Unauthorized("Missing X-User-Id header".to_string()))
    }
}
