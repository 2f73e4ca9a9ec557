use nix::unistd::{Gid, Uid, setgid, setuid};

/// Default uid to drop to (nobody).
pub const UNPRIVILEGED_UID: u32 = 65534;

/// Default gid to drop to (nogroup).
pub const UNPRIVILEGED_GID: u32 = 65534;

/// Gives up root after setup is done.
///
/// The gid goes first: once the uid is unprivileged, setgid is no longer
/// permitted.
pub fn drop_privileges(uid: u32, gid: u32) -> nix::Result<()> {
    setgid(Gid::from_raw(gid))?;
    setuid(Uid::from_raw(uid))?;
    Ok(())
}
