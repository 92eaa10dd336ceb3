//! Account repository for `data/users.json`

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::SheetbookError;
use crate::models::user::normalize_username;
use crate::models::{User, UserId};

use super::file_io::{read_json, write_json_atomic};
use super::lock_error;

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserData {
    #[serde(default)]
    users: Vec<User>,
}

pub struct UserRepository {
    path: PathBuf,
    data: RwLock<HashMap<UserId, User>>,
    /// Index: normalized username -> user id
    by_name: RwLock<HashMap<String, UserId>>,
}

impl UserRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
            by_name: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> Result<(), SheetbookError> {
        let file_data: UserData = read_json(&self.path)?;

        let mut data = self.data.write().map_err(lock_error)?;
        let mut by_name = self.by_name.write().map_err(lock_error)?;
        data.clear();
        by_name.clear();
        for user in file_data.users {
            by_name.insert(normalize_username(&user.username), user.id);
            data.insert(user.id, user);
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), SheetbookError> {
        let data = self.data.read().map_err(lock_error)?;
        let mut users: Vec<User> = data.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        write_json_atomic(&self.path, &UserData { users })
    }

    pub fn get(&self, id: UserId) -> Result<Option<User>, SheetbookError> {
        Ok(self.data.read().map_err(lock_error)?.get(&id).cloned())
    }

    pub fn get_by_username(&self, username: &str) -> Result<Option<User>, SheetbookError> {
        let id = self
            .by_name
            .read()
            .map_err(lock_error)?
            .get(&normalize_username(username))
            .copied();
        match id {
            Some(id) => self.get(id),
            None => Ok(None),
        }
    }

    /// The user holding session `token`
    pub fn get_by_token(&self, token: &str) -> Result<Option<User>, SheetbookError> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data
            .values()
            .find(|u| u.tokens.iter().any(|t| t == token))
            .cloned())
    }

    /// Insert or update; a username taken by another account is rejected
    pub fn upsert(&self, user: User) -> Result<(), SheetbookError> {
        let mut data = self.data.write().map_err(lock_error)?;
        let mut by_name = self.by_name.write().map_err(lock_error)?;

        let normalized = normalize_username(&user.username);
        if let Some(existing) = by_name.get(&normalized) {
            if *existing != user.id {
                return Err(SheetbookError::Validation(format!(
                    "Username '{}' is already taken",
                    normalized
                )));
            }
        }
        if let Some(old) = data.get(&user.id) {
            by_name.remove(&normalize_username(&old.username));
        }

        by_name.insert(normalized, user.id);
        data.insert(user.id, user);
        Ok(())
    }

    pub fn count(&self) -> Result<usize, SheetbookError> {
        Ok(self.data.read().map_err(lock_error)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo() -> (TempDir, UserRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = UserRepository::new(temp_dir.path().join("users.json"));
        (temp_dir, repo)
    }

    #[test]
    fn test_lookup_by_name_is_case_insensitive() {
        let (_dir, repo) = repo();
        let user = User::new("Ada", "hash");
        repo.upsert(user.clone()).unwrap();

        assert_eq!(repo.get_by_username("ADA").unwrap().map(|u| u.id), Some(user.id));
        assert!(repo.get_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let (_dir, repo) = repo();
        repo.upsert(User::new("ada", "h1")).unwrap();
        let err = repo.upsert(User::new("ADA", "h2")).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_token_lookup_after_reload() {
        let (dir, repo) = repo();
        let mut user = User::new("ada", "hash");
        user.tokens.push("tok-1".into());
        repo.upsert(user.clone()).unwrap();
        repo.save().unwrap();

        let reloaded = UserRepository::new(dir.path().join("users.json"));
        reloaded.load().unwrap();
        assert_eq!(reloaded.get_by_token("tok-1").unwrap().map(|u| u.id), Some(user.id));
        assert!(reloaded.get_by_token("nope").unwrap().is_none());
    }
}
