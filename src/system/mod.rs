//! OS service account resolution.

pub mod directory;
pub mod identity;

/// A resolved OS account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemUser {
    /// Account name as reported by the user directory.
    pub username: String,
    /// Numeric user id.
    pub uid: u32,
    /// Primary group id.
    pub gid: u32,
}
