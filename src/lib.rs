//! Typed bindings for the Linux `quotactl(2)` syscall family: administer
//! per-user, per-group, and per-project disk quotas on a filesystem.
//!
//! Every operation is one synchronous syscall with stack-local buffers; the
//! kernel is the sole system of record, and every failure is terminal (no
//! retries, no partial results). Kernels from 2.4.22 are supported; project
//! quotas need 4.1 and the next-quota search needs 4.6, both checked once
//! per process before dispatch (see [`Capabilities`]).
//!
//! The flat per-type functions below mirror the quota tools' naming; the
//! same operations are available generically over [`QuotaType`] via
//! [`quota_on`], [`quota_get`], and friends.
//!
//! # Examples
//!
//! ```no_run
//! use quotax::{QuotaFormat, QuotaLimits};
//!
//! # fn main() -> quotax::Result<()> {
//! quotax::user_quota_on("/dev/sda1", QuotaFormat::VFS_V1, "/mnt/aquota.user")?;
//! quotax::set_user_quota(
//!     "/dev/sda1",
//!     1000,
//!     QuotaLimits {
//!         block_hard: 100_000,
//!         block_soft: 90_000,
//!         inode_hard: 10_000,
//!         inode_soft: 9_000,
//!     },
//! )?;
//! let record = quotax::get_user_quota("/dev/sda1", 1000)?;
//! assert_eq!(record.blocks.hard, 100_000);
//! # Ok(())
//! # }
//! ```

use nix::NixPath;

mod abi;
mod caps;
mod error;
mod ops;

pub use abi::QuotaType;
pub use caps::{Capabilities, Capability, KernelVersion};
pub use error::{QuotaError, Result};
pub use ops::{
    quota_get, quota_get_format, quota_get_info, quota_get_next, quota_off, quota_on, quota_set,
    quota_set_info, quota_sync, BlockLimits, InodeLimits, NextQuotaRecord, QuotaFileFlags,
    QuotaFileInfo, QuotaFormat, QuotaLimits, QuotaRecord,
};

// === User quotas === //

/// Turn on user quotas for a filesystem.
pub fn user_quota_on<P: NixPath + ?Sized>(
    device: &P,
    format: QuotaFormat,
    quota_file: &P,
) -> Result<()> {
    ops::quota_on(QuotaType::User, device, format, quota_file)
}

/// Turn off user quotas for a filesystem.
pub fn user_quota_off<P: NixPath + ?Sized>(device: &P) -> Result<()> {
    ops::quota_off(QuotaType::User, device)
}

/// Get the quota of a user on a filesystem.
pub fn get_user_quota<P: NixPath + ?Sized>(device: &P, uid: u32) -> Result<QuotaRecord> {
    ops::quota_get(QuotaType::User, device, uid)
}

/// Get the quota of the next user whose id is greater than or equal to
/// `uid` on a filesystem.
pub fn get_next_user_quota<P: NixPath + ?Sized>(device: &P, uid: u32) -> Result<NextQuotaRecord> {
    ops::quota_get_next(QuotaType::User, device, uid)
}

/// Set the quota limits of a user on a filesystem.
pub fn set_user_quota<P: NixPath + ?Sized>(
    device: &P,
    uid: u32,
    limits: QuotaLimits,
) -> Result<()> {
    ops::quota_set(QuotaType::User, device, uid, limits)
}

/// Get information about the user quota file for a filesystem.
pub fn get_user_quota_info<P: NixPath + ?Sized>(device: &P) -> Result<QuotaFileInfo> {
    ops::quota_get_info(QuotaType::User, device)
}

/// Set information about the user quota file for a filesystem.
pub fn set_user_quota_info<P: NixPath + ?Sized>(device: &P, info: QuotaFileInfo) -> Result<()> {
    ops::quota_set_info(QuotaType::User, device, info)
}

/// Get the quota format used for user quotas on a filesystem.
pub fn get_user_quota_format<P: NixPath + ?Sized>(device: &P) -> Result<QuotaFormat> {
    ops::quota_get_format(QuotaType::User, device)
}

/// Update the on-disk copy of user quota usages for a filesystem, or for
/// all filesystems with active user quotas when `device` is `None`.
pub fn sync_user_quotas<P: NixPath + ?Sized>(device: Option<&P>) -> Result<()> {
    ops::quota_sync(QuotaType::User, device)
}

// === Group quotas === //

/// Turn on group quotas for a filesystem.
pub fn group_quota_on<P: NixPath + ?Sized>(
    device: &P,
    format: QuotaFormat,
    quota_file: &P,
) -> Result<()> {
    ops::quota_on(QuotaType::Group, device, format, quota_file)
}

/// Turn off group quotas for a filesystem.
pub fn group_quota_off<P: NixPath + ?Sized>(device: &P) -> Result<()> {
    ops::quota_off(QuotaType::Group, device)
}

/// Get the quota of a group on a filesystem.
pub fn get_group_quota<P: NixPath + ?Sized>(device: &P, gid: u32) -> Result<QuotaRecord> {
    ops::quota_get(QuotaType::Group, device, gid)
}

/// Get the quota of the next group whose id is greater than or equal to
/// `gid` on a filesystem.
pub fn get_next_group_quota<P: NixPath + ?Sized>(device: &P, gid: u32) -> Result<NextQuotaRecord> {
    ops::quota_get_next(QuotaType::Group, device, gid)
}

/// Set the quota limits of a group on a filesystem.
pub fn set_group_quota<P: NixPath + ?Sized>(
    device: &P,
    gid: u32,
    limits: QuotaLimits,
) -> Result<()> {
    ops::quota_set(QuotaType::Group, device, gid, limits)
}

/// Get information about the group quota file for a filesystem.
pub fn get_group_quota_info<P: NixPath + ?Sized>(device: &P) -> Result<QuotaFileInfo> {
    ops::quota_get_info(QuotaType::Group, device)
}

/// Set information about the group quota file for a filesystem.
pub fn set_group_quota_info<P: NixPath + ?Sized>(device: &P, info: QuotaFileInfo) -> Result<()> {
    ops::quota_set_info(QuotaType::Group, device, info)
}

/// Get the quota format used for group quotas on a filesystem.
pub fn get_group_quota_format<P: NixPath + ?Sized>(device: &P) -> Result<QuotaFormat> {
    ops::quota_get_format(QuotaType::Group, device)
}

/// Update the on-disk copy of group quota usages for a filesystem, or for
/// all filesystems with active group quotas when `device` is `None`.
pub fn sync_group_quotas<P: NixPath + ?Sized>(device: Option<&P>) -> Result<()> {
    ops::quota_sync(QuotaType::Group, device)
}

// === Project quotas === //
//
// All of these report `QuotaError::Unsupported` without issuing a syscall
// when project quotas are compiled out or the kernel predates 4.1.

/// Turn on project quotas for a filesystem.
pub fn project_quota_on<P: NixPath + ?Sized>(
    device: &P,
    format: QuotaFormat,
    quota_file: &P,
) -> Result<()> {
    ops::quota_on(QuotaType::Project, device, format, quota_file)
}

/// Turn off project quotas for a filesystem.
pub fn project_quota_off<P: NixPath + ?Sized>(device: &P) -> Result<()> {
    ops::quota_off(QuotaType::Project, device)
}

/// Get the quota of a project on a filesystem.
pub fn get_project_quota<P: NixPath + ?Sized>(device: &P, project_id: u32) -> Result<QuotaRecord> {
    ops::quota_get(QuotaType::Project, device, project_id)
}

/// Get the quota of the next project whose id is greater than or equal to
/// `project_id` on a filesystem.
pub fn get_next_project_quota<P: NixPath + ?Sized>(
    device: &P,
    project_id: u32,
) -> Result<NextQuotaRecord> {
    ops::quota_get_next(QuotaType::Project, device, project_id)
}

/// Set the quota limits of a project on a filesystem.
pub fn set_project_quota<P: NixPath + ?Sized>(
    device: &P,
    project_id: u32,
    limits: QuotaLimits,
) -> Result<()> {
    ops::quota_set(QuotaType::Project, device, project_id, limits)
}

/// Get information about the project quota file for a filesystem.
pub fn get_project_quota_info<P: NixPath + ?Sized>(device: &P) -> Result<QuotaFileInfo> {
    ops::quota_get_info(QuotaType::Project, device)
}

/// Set information about the project quota file for a filesystem.
pub fn set_project_quota_info<P: NixPath + ?Sized>(device: &P, info: QuotaFileInfo) -> Result<()> {
    ops::quota_set_info(QuotaType::Project, device, info)
}

/// Get the quota format used for project quotas on a filesystem.
pub fn get_project_quota_format<P: NixPath + ?Sized>(device: &P) -> Result<QuotaFormat> {
    ops::quota_get_format(QuotaType::Project, device)
}

/// Update the on-disk copy of project quota usages for a filesystem, or for
/// all filesystems with active project quotas when `device` is `None`.
pub fn sync_project_quotas<P: NixPath + ?Sized>(device: Option<&P>) -> Result<()> {
    ops::quota_sync(QuotaType::Project, device)
}
