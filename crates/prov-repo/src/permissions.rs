//! Capability flags attached to each repo instance.
//!
//! [`RepoPermissions`] is the plain, serializable form used in configuration.
//! [`Permissions`] is the live form held by a repo: every flag is an atomic,
//! read at the start of each operation, so toggling a flag takes effect on
//! the next call from any thread.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Capability, RepoError, RepoResult};

/// Serializable snapshot of a repo's capability flags. All default to `true`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoPermissions {
    pub read: bool,
    pub write: bool,
    pub delete: bool,
    /// Accept artifacts promoted by a chained read that hit a later member.
    pub read_through_write: bool,
}

impl RepoPermissions {
    /// Every capability enabled.
    pub const fn all() -> Self {
        Self {
            read: true,
            write: true,
            delete: true,
            read_through_write: true,
        }
    }

    /// Readable only; never written, deleted, or promoted into.
    pub const fn read_only() -> Self {
        Self {
            read: true,
            write: false,
            delete: false,
            read_through_write: false,
        }
    }

    pub const fn with_read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    pub const fn with_write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    pub const fn with_delete(mut self, delete: bool) -> Self {
        self.delete = delete;
        self
    }

    pub const fn with_read_through_write(mut self, read_through_write: bool) -> Self {
        self.read_through_write = read_through_write;
        self
    }
}

impl Default for RepoPermissions {
    fn default() -> Self {
        Self::all()
    }
}

/// Live, runtime-mutable capability flags.
#[derive(Debug)]
pub struct Permissions {
    read: AtomicBool,
    write: AtomicBool,
    delete: AtomicBool,
    read_through_write: AtomicBool,
}

impl Permissions {
    pub fn new(flags: RepoPermissions) -> Self {
        Self {
            read: AtomicBool::new(flags.read),
            write: AtomicBool::new(flags.write),
            delete: AtomicBool::new(flags.delete),
            read_through_write: AtomicBool::new(flags.read_through_write),
        }
    }

    pub fn can_read(&self) -> bool {
        self.read.load(Ordering::SeqCst)
    }

    pub fn can_write(&self) -> bool {
        self.write.load(Ordering::SeqCst)
    }

    pub fn can_delete(&self) -> bool {
        self.delete.load(Ordering::SeqCst)
    }

    pub fn read_through_write(&self) -> bool {
        self.read_through_write.load(Ordering::SeqCst)
    }

    /// Eligible as a promotion target: writable and opted in to read-through.
    pub fn accepts_read_through(&self) -> bool {
        self.can_write() && self.read_through_write()
    }

    pub fn set_read(&self, on: bool) {
        self.read.store(on, Ordering::SeqCst);
    }

    pub fn set_write(&self, on: bool) {
        self.write.store(on, Ordering::SeqCst);
    }

    pub fn set_delete(&self, on: bool) {
        self.delete.store(on, Ordering::SeqCst);
    }

    pub fn set_read_through_write(&self, on: bool) {
        self.read_through_write.store(on, Ordering::SeqCst);
    }

    /// Replace every flag at once.
    pub fn set_all(&self, flags: RepoPermissions) {
        self.set_read(flags.read);
        self.set_write(flags.write);
        self.set_delete(flags.delete);
        self.set_read_through_write(flags.read_through_write);
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Read => self.can_read(),
            Capability::Write => self.can_write(),
            Capability::Delete => self.can_delete(),
        }
    }

    /// Fail with [`RepoError::PermissionDenied`] unless `capability` is on.
    pub fn check(&self, repo: &str, capability: Capability) -> RepoResult<()> {
        if self.allows(capability) {
            Ok(())
        } else {
            Err(RepoError::permission_denied(repo, capability))
        }
    }

    pub fn snapshot(&self) -> RepoPermissions {
        RepoPermissions {
            read: self.can_read(),
            write: self.can_write(),
            delete: self.can_delete(),
            read_through_write: self.read_through_write(),
        }
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::new(RepoPermissions::all())
    }
}

impl From<RepoPermissions> for Permissions {
    fn from(flags: RepoPermissions) -> Self {
        Self::new(flags)
    }
}
