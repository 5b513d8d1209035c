//! Service account resolution and data directory ownership.

use crate::config::store::ConfigStore;
use crate::system::directory::UserDirectory;
use crate::system::SystemUser;
use crate::CosmicError;
use std::fs;
use std::os::unix::fs::chown;
use std::path::PathBuf;

/// Make sure the configured service account exists and record it.
///
/// An unknown user is created; any other lookup failure is returned without
/// attempting creation. On success the resolved uid/gid are already on disk.
///
/// # Errors
/// - `ConfigError` - No username configured
/// - `UserLookup` - Directory lookup failed for a reason other than "unknown user"
/// - `UserCreation` - Account creation failed, or the new account cannot be found
/// - `ConfigIO` / `ConfigLocked` - Persisting the resolved ids failed
pub fn ensure_user(
    store: &mut ConfigStore,
    directory: &dyn UserDirectory,
) -> Result<SystemUser, CosmicError> {
    let username = store
        .config()
        .username()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| CosmicError::ConfigError("system.username is not set".to_string()))?
        .to_string();

    let user = match directory.lookup(&username)? {
        Some(user) => {
            tracing::debug!(%username, uid = user.uid, gid = user.gid, "found system user");
            user
        }
        None => {
            tracing::info!(%username, "system user missing, creating it");
            directory.create_system_user(&username)?;
            directory.lookup(&username)?.ok_or_else(|| {
                CosmicError::UserCreation(format!(
                    "user '{}' not found after creation",
                    username
                ))
            })?
        }
    };

    store.config_mut().set_system_user(&user);
    store.write_to_disk()?;
    Ok(user)
}

/// Create the data directory if needed and hand it to `user`.
pub fn ensure_data_directory(
    store: &ConfigStore,
    user: &SystemUser,
) -> Result<PathBuf, CosmicError> {
    let data = store
        .config()
        .system
        .as_ref()
        .map(|s| PathBuf::from(&s.data))
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| CosmicError::ConfigError("system.data is not set".to_string()))?;

    fs::create_dir_all(&data).map_err(|e| {
        CosmicError::DataDirectory(format!("Failed to create {}: {}", data.display(), e))
    })?;

    chown(&data, Some(user.uid), Some(user.gid)).map_err(|e| {
        CosmicError::DataDirectory(format!(
            "Failed to chown {} to {}:{}: {}",
            data.display(),
            user.uid,
            user.gid,
            e
        ))
    })?;

    tracing::debug!(path = %data.display(), uid = user.uid, gid = user.gid, "data directory ready");
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::store::try_lock_exclusive;
    use crate::system::directory::MockUserDirectory;
    use std::fs::OpenOptions;
    use std::os::unix::fs::MetadataExt;
    use tempfile::TempDir;

    fn store_with_user(dir: &TempDir, username: &str) -> ConfigStore {
        let path = dir.path().join("config.yml");
        fs::write(&path, format!("system:\n  username: {}\n", username)).unwrap();
        ConfigStore::open(path).unwrap()
    }

    #[test]
    fn test_existing_user_is_recorded_and_persisted() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with_user(&dir, "cosmicpanel");
        let users = MockUserDirectory::new().with_user("cosmicpanel", 120, 130);

        let user = ensure_user(&mut store, &users).unwrap();
        assert_eq!((user.uid, user.gid), (120, 130));
        assert_eq!(users.creations(), 0);

        let on_disk = ConfigStore::load_from(store.path()).unwrap();
        let ids = on_disk.config().system.as_ref().unwrap().user;
        assert_eq!((ids.uid, ids.gid), (120, 130));
    }

    #[test]
    fn test_missing_user_is_created_once() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with_user(&dir, "panelsvc");
        let users = MockUserDirectory::new();

        let user = ensure_user(&mut store, &users).unwrap();
        assert_eq!(users.creations(), 1);
        assert_eq!(users.lookup("panelsvc").unwrap(), Some(user.clone()));

        let on_disk = ConfigStore::load_from(store.path()).unwrap();
        assert_eq!(on_disk.config().system.as_ref().unwrap().user.uid, user.uid);
    }

    #[test]
    fn test_ensure_user_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with_user(&dir, "panelsvc");
        let users = MockUserDirectory::new();

        let first = ensure_user(&mut store, &users).unwrap();
        let first_disk = fs::read_to_string(store.path()).unwrap();
        let second = ensure_user(&mut store, &users).unwrap();
        let second_disk = fs::read_to_string(store.path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_disk, second_disk);
        assert_eq!(users.creations(), 1);
    }

    #[test]
    fn test_other_lookup_error_does_not_create() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with_user(&dir, "panelsvc");
        let users = MockUserDirectory::new().failing_lookup("permission denied");

        let result = ensure_user(&mut store, &users);
        assert!(matches!(result, Err(CosmicError::UserLookup(_))));
        assert_eq!(users.creations(), 0);
        assert_eq!(store.config().system.as_ref().unwrap().user.uid, 0);
    }

    #[test]
    fn test_creation_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with_user(&dir, "panelsvc");
        let users = MockUserDirectory::new().failing_creation("useradd: cannot lock /etc/passwd");

        let result = ensure_user(&mut store, &users);
        assert!(matches!(result, Err(CosmicError::UserCreation(_))));
    }

    #[test]
    fn test_locked_config_fails_ensure_user() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with_user(&dir, "panelsvc");
        let before = fs::read_to_string(store.path()).unwrap();
        let users = MockUserDirectory::new().with_user("panelsvc", 120, 130);

        let holder = OpenOptions::new().write(true).open(store.path()).unwrap();
        try_lock_exclusive(&holder).unwrap();

        let result = ensure_user(&mut store, &users);
        assert!(matches!(result, Err(CosmicError::ConfigLocked { .. })));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_missing_username_is_config_error() {
        let dir = TempDir::new().unwrap();
        let mut store = ConfigStore::new(dir.path().join("config.yml"));
        let users = MockUserDirectory::new();

        let result = ensure_user(&mut store, &users);
        assert!(matches!(result, Err(CosmicError::ConfigError(_))));
    }

    #[test]
    fn test_data_directory_created_and_owned() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data/nested");
        let mut store = ConfigStore::new(dir.path().join("config.yml"));
        store.set_defaults();
        store.config_mut().system.as_mut().unwrap().data = data.display().to_string();

        let meta = fs::metadata(dir.path()).unwrap();
        let owner = SystemUser {
            username: "me".to_string(),
            uid: meta.uid(),
            gid: meta.gid(),
        };

        let created = ensure_data_directory(&store, &owner).unwrap();
        assert_eq!(created, data);
        let created_meta = fs::metadata(&data).unwrap();
        assert!(created_meta.is_dir());
        assert_eq!(created_meta.uid(), owner.uid);
    }
}
