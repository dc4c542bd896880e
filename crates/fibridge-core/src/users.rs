// In-memory user store backing the local HTTP service.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// A local user record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

/// Partial update accepted by `PATCH /users/{id}`. Absent fields are
/// left as they are.
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Process-local user list, ordered by id.
#[derive(Debug, Default)]
pub struct UserStore {
    users: RwLock<BTreeMap<u64, User>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store.
    pub fn seeded(users: impl IntoIterator<Item = User>) -> Self {
        let store = Self::new();
        for user in users {
            store.insert(user);
        }
        store
    }

    // Poisoning is recovered rather than swallowed: no code path panics
    // while holding the lock, and dropping a write would lose the user
    // without any signal.

    pub fn insert(&self, user: User) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.id, user);
    }

    pub fn list(&self) -> Vec<User> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn get(&self, id: u64) -> Option<User> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Merge an update into an existing user; `None` if the id is unknown.
    pub fn update(&self, id: u64, update: &UserUpdate) -> Option<User> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        let user = users.get_mut(&id)?;
        if let Some(ref name) = update.name {
            user.name.clone_from(name);
        }
        if let Some(ref email) = update.email {
            user.email.clone_from(email);
        }
        Some(user.clone())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::{User, UserStore, UserUpdate};

    fn sample() -> User {
        User {
            id: 1,
            name: "Ada".into(),
            email: "ada@example.com".into(),
        }
    }

    #[test]
    fn update_merges_only_provided_fields() {
        let store = UserStore::seeded([sample()]);

        let updated = store
            .update(
                1,
                &UserUpdate {
                    name: Some("Grace".into()),
                    email: None,
                },
            )
            .unwrap();

        assert_eq!(updated.name, "Grace");
        assert_eq!(updated.email, "ada@example.com");
    }

    #[test]
    fn update_unknown_id_is_none() {
        let store = UserStore::new();
        assert!(store.update(7, &UserUpdate::default()).is_none());
    }

    #[test]
    fn list_is_ordered_by_id() {
        let store = UserStore::seeded([
            User {
                id: 2,
                name: "B".into(),
                email: "b@example.com".into(),
            },
            User {
                id: 1,
                name: "A".into(),
                email: "a@example.com".into(),
            },
        ]);

        let ids: Vec<u64> = store.list().into_iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn store_survives_a_poisoned_lock() {
        let store = UserStore::new();

        // Poison the lock by panicking while holding a write guard.
        let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = store.users.write().unwrap();
            panic!("poison the store");
        }));
        assert!(poisoned.is_err());

        store.insert(sample());
        assert_eq!(store.get(1), Some(sample()));
        assert_eq!(store.list().len(), 1);
    }
}
