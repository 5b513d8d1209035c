//! User directory abstraction so account resolution is testable without root.

use crate::system::SystemUser;
use crate::CosmicError;
use std::ffi::{CStr, CString};
use std::io;
use std::process::Command;

/// Lookup and creation of OS accounts.
pub trait UserDirectory: Send + Sync {
    /// Look up `username`. `Ok(None)` means the user does not exist; any
    /// other failure is an error.
    fn lookup(&self, username: &str) -> Result<Option<SystemUser>, CosmicError>;

    /// Create a system account with no home directory and no login shell.
    fn create_system_user(&self, username: &str) -> Result<(), CosmicError>;
}

/// The host's user directory, via `getpwnam_r(3)` and `useradd(8)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsUserDirectory;

const MAX_PASSWD_BUF: usize = 1 << 20;

impl UserDirectory for OsUserDirectory {
    fn lookup(&self, username: &str) -> Result<Option<SystemUser>, CosmicError> {
        let name = CString::new(username).map_err(|_| {
            CosmicError::UserLookup(format!("username contains a NUL byte: {:?}", username))
        })?;

        // SAFETY: sysconf has no preconditions.
        let suggested = unsafe { libc::sysconf(libc::_SC_GETPW_R_SIZE_MAX) };
        let mut buf_len = if suggested > 0 { suggested as usize } else { 1024 };

        loop {
            // SAFETY: passwd is plain old data; getpwnam_r fills it in.
            let mut passwd: libc::passwd = unsafe { std::mem::zeroed() };
            let mut buf: Vec<libc::c_char> = vec![0; buf_len];
            let mut result: *mut libc::passwd = std::ptr::null_mut();

            // SAFETY: every pointer is valid for the duration of the call and
            // `buf.len()` is the real buffer size.
            let rc = unsafe {
                libc::getpwnam_r(
                    name.as_ptr(),
                    &mut passwd,
                    buf.as_mut_ptr(),
                    buf.len(),
                    &mut result,
                )
            };

            if rc == libc::ERANGE && buf_len < MAX_PASSWD_BUF {
                buf_len *= 2;
                continue;
            }
            if rc != 0 {
                return Err(CosmicError::UserLookup(format!(
                    "lookup of {}: {}",
                    username,
                    io::Error::from_raw_os_error(rc)
                )));
            }
            if result.is_null() {
                return Ok(None);
            }

            // SAFETY: on success pw_name points into `buf`, which is still alive.
            let resolved = unsafe { CStr::from_ptr(passwd.pw_name) }
                .to_string_lossy()
                .into_owned();

            return Ok(Some(SystemUser {
                username: resolved,
                uid: passwd.pw_uid,
                gid: passwd.pw_gid,
            }));
        }
    }

    fn create_system_user(&self, username: &str) -> Result<(), CosmicError> {
        let output = Command::new("useradd")
            .args(useradd_args(username))
            .output()
            .map_err(|e| CosmicError::UserCreation(format!("failed to run useradd: {}", e)))?;

        if !output.status.success() {
            return Err(CosmicError::UserCreation(format!(
                "useradd {} exited with {}: {}",
                username,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        tracing::info!(username, "created system user");
        Ok(())
    }
}

/// Arguments passed to `useradd` for the service account.
pub fn useradd_args(username: &str) -> [&str; 6] {
    [
        "--system",
        "--no-create-home",
        "--shell",
        "/bin/false",
        "--",
        username,
    ]
}

/// In-memory user directory for deterministic testing.
#[cfg(any(test, feature = "test-seams"))]
#[derive(Debug)]
pub struct MockUserDirectory {
    users: std::sync::Mutex<std::collections::HashMap<String, SystemUser>>,
    next_id: std::sync::atomic::AtomicU32,
    creations: std::sync::atomic::AtomicUsize,
    lookup_error: Option<String>,
    creation_error: Option<String>,
}

#[cfg(any(test, feature = "test-seams"))]
impl MockUserDirectory {
    /// Empty directory; created accounts get ids starting at 990.
    pub fn new() -> Self {
        Self {
            users: std::sync::Mutex::new(std::collections::HashMap::new()),
            next_id: std::sync::atomic::AtomicU32::new(990),
            creations: std::sync::atomic::AtomicUsize::new(0),
            lookup_error: None,
            creation_error: None,
        }
    }

    /// Seed an existing account.
    pub fn with_user(self, username: &str, uid: u32, gid: u32) -> Self {
        self.users.lock().expect("mock directory poisoned").insert(
            username.to_string(),
            SystemUser {
                username: username.to_string(),
                uid,
                gid,
            },
        );
        self
    }

    /// Make every lookup fail with a non-"unknown user" error.
    pub fn failing_lookup(mut self, reason: &str) -> Self {
        self.lookup_error = Some(reason.to_string());
        self
    }

    /// Make account creation fail.
    pub fn failing_creation(mut self, reason: &str) -> Self {
        self.creation_error = Some(reason.to_string());
        self
    }

    /// Number of accounts created so far.
    pub fn creations(&self) -> usize {
        self.creations.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-seams"))]
impl Default for MockUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-seams"))]
impl UserDirectory for MockUserDirectory {
    fn lookup(&self, username: &str) -> Result<Option<SystemUser>, CosmicError> {
        if let Some(reason) = &self.lookup_error {
            return Err(CosmicError::UserLookup(reason.clone()));
        }
        Ok(self
            .users
            .lock()
            .expect("mock directory poisoned")
            .get(username)
            .cloned())
    }

    fn create_system_user(&self, username: &str) -> Result<(), CosmicError> {
        use std::sync::atomic::Ordering;

        if let Some(reason) = &self.creation_error {
            return Err(CosmicError::UserCreation(reason.clone()));
        }

        let mut users = self.users.lock().expect("mock directory poisoned");
        if users.contains_key(username) {
            return Err(CosmicError::UserCreation(format!(
                "user '{}' already exists",
                username
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        users.insert(
            username.to_string(),
            SystemUser {
                username: username.to_string(),
                uid: id,
                gid: id,
            },
        );
        self.creations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
