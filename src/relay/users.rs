use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::common::DisplayColor;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimError {
    #[error("a name is required")]
    EmptyName,
    #[error("name '{0}' is already taken")]
    NameTaken(String),
    #[error("color {0} is already taken")]
    ColorTaken(DisplayColor),
}

/// Names and colors of the users currently signed in.
///
/// Each name and each color can be held by one user at a time.
#[derive(Default)]
pub struct UserDirectory {
    users: Mutex<HashMap<String, DisplayColor>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self, name: &str, color: DisplayColor) -> Result<(), ClaimError> {
        if name.trim().is_empty() {
            return Err(ClaimError::EmptyName);
        }

        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        if users.contains_key(name) {
            return Err(ClaimError::NameTaken(name.to_string()));
        }
        if users.values().any(|taken| *taken == color) {
            return Err(ClaimError::ColorTaken(color));
        }
        users.insert(name.to_string(), color);
        log::info!("User '{name}' signed in with color {color}");
        Ok(())
    }

    /// Returns false if `name` was not signed in.
    pub fn release(&self, name: &str) -> bool {
        let removed = self
            .users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some();
        if removed {
            log::info!("User '{name}' signed out");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_color_are_exclusive() {
        let users = UserDirectory::new();
        users.claim("alice", DisplayColor::Red).unwrap();

        assert_eq!(
            users.claim("alice", DisplayColor::Blue),
            Err(ClaimError::NameTaken("alice".to_string()))
        );
        assert_eq!(
            users.claim("bob", DisplayColor::Red),
            Err(ClaimError::ColorTaken(DisplayColor::Red))
        );
        assert!(users.claim("bob", DisplayColor::Blue).is_ok());
    }

    #[test]
    fn blank_name_is_rejected() {
        assert_eq!(
            UserDirectory::new().claim("  ", DisplayColor::Red),
            Err(ClaimError::EmptyName)
        );
    }

    #[test]
    fn release_frees_name_and_color() {
        let users = UserDirectory::new();
        users.claim("alice", DisplayColor::Red).unwrap();

        assert!(users.release("alice"));
        assert!(!users.release("alice"));
        assert!(users.claim("bob", DisplayColor::Red).is_ok());
    }
}
