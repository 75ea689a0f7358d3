//! Customer profile as held by the API (`/users/me`).

use serde::{Deserialize, Serialize};

/// Message shown on the login screen after identity-bearing details change.
pub const REAUTH_MESSAGE: &str = "Your account details have been updated. Please log in again.";

/// Editable account details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub phone_number: String,
}

impl Profile {
    /// Whether saving `updated` over `self` invalidates the current credential.
    ///
    /// The token embeds the customer's identity claims, so any change to name,
    /// email or phone makes it stale. Surrounding whitespace is ignored.
    #[must_use]
    pub fn requires_reauth(&self, updated: &Self) -> bool {
        self.name.trim() != updated.name.trim()
            || self.email.trim() != updated.email.trim()
            || self.phone_number.trim() != updated.phone_number.trim()
    }

    /// Copy with every field trimmed.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_owned(),
            email: self.email.trim().to_owned(),
            phone_number: self.phone_number.trim().to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ana() -> Profile {
        Profile {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            phone_number: "9800000000".to_string(),
        }
    }

    #[test]
    fn test_unchanged_profile_keeps_session() {
        let mut same = ana();
        same.name = " Ana ".to_string();
        assert!(!ana().requires_reauth(&same));
    }

    #[test]
    fn test_any_identity_field_change_requires_reauth() {
        let edits: [fn(&mut Profile); 3] = [
            |p| p.name = "Ana B".to_string(),
            |p| p.email = "ana.b@example.com".to_string(),
            |p| p.phone_number = "9811111111".to_string(),
        ];
        for edit in edits {
            let mut updated = ana();
            edit(&mut updated);
            assert!(ana().requires_reauth(&updated));
        }
    }
}
