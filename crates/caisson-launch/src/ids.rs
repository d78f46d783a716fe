//! Identity and umask capture for the in-container init helper.
//!
//! caisson-init drops privileges inside the container to mirror the invoking
//! user; these helpers gather the numbers and names it needs.

#[cfg(not(unix))]
use crate::error::Result;

/// Numeric and symbolic identity of the invoking user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub uid: u32,
    pub gid: u32,
    pub user: String,
    pub group: String,
}

#[cfg(unix)]
pub use unix::{current_identity, current_umask};

#[cfg(unix)]
mod unix {
    use std::ffi::CStr;

    use super::UserIdentity;
    use crate::error::{Error, Result};

    /// Identity of the current process.
    ///
    /// The name lookups use the non-reentrant passwd/group calls; caisson is
    /// single-threaded while preparing a dive and the results are copied out
    /// immediately.
    pub fn current_identity() -> Result<UserIdentity> {
        let uid = unsafe { libc::getuid() };
        let gid = unsafe { libc::getgid() };
        Ok(UserIdentity {
            uid,
            gid,
            user: user_name(uid)?,
            group: group_name(gid)?,
        })
    }

    /// Read the process umask.
    ///
    /// There is no read-only query, so set-and-restore.
    pub fn current_umask() -> u32 {
        let current = unsafe { libc::umask(0o022) };
        unsafe { libc::umask(current) };
        current as u32
    }

    fn user_name(uid: libc::uid_t) -> Result<String> {
        let pw = unsafe { libc::getpwuid(uid) };
        if pw.is_null() {
            return Err(Error::UnknownUser { uid });
        }
        let name = unsafe { CStr::from_ptr((*pw).pw_name) };
        Ok(name.to_string_lossy().into_owned())
    }

    fn group_name(gid: libc::gid_t) -> Result<String> {
        let gr = unsafe { libc::getgrgid(gid) };
        if gr.is_null() {
            return Err(Error::UnknownGroup { gid });
        }
        let name = unsafe { CStr::from_ptr((*gr).gr_name) };
        Ok(name.to_string_lossy().into_owned())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn identity_matches_process_ids() {
            let identity = current_identity().unwrap();
            assert_eq!(identity.uid, unsafe { libc::getuid() });
            assert_eq!(identity.gid, unsafe { libc::getgid() });
            assert!(!identity.user.is_empty());
            assert!(!identity.group.is_empty());
        }

        #[test]
        fn umask_is_in_range() {
            // umask is process-global and other tests run concurrently, so
            // only the invariant is checked, not a specific value.
            assert!(current_umask() <= 0o777);
        }
    }
}

#[cfg(not(unix))]
pub fn current_identity() -> Result<UserIdentity> {
    // No meaningful uid/gid mapping to forward; the init helper runs with
    // whatever identity the container runtime provides.
    Ok(UserIdentity {
        uid: 0,
        gid: 0,
        user: "root".to_string(),
        group: "root".to_string(),
    })
}

#[cfg(not(unix))]
pub fn current_umask() -> u32 {
    0o022
}
