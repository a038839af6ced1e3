use nix::errno::Errno;
use thiserror::Error;

use crate::abi::SubCmd;
use crate::caps::Capability;

pub type Result<T> = std::result::Result<T, QuotaError>;

/// Failure of a quota operation.
///
/// Kernel-reported errnos are translated with the attempted sub-command as
/// context, because the same errno means different things for different
/// commands (EACCES, EINVAL and ESRCH during Q_QUOTAON in particular).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuotaError {
    #[error("privilege required")]
    PermissionDenied,

    #[error("quota enforcement is already turned on")]
    AlreadyActive,

    #[error("quota file is not a regular file, not on the specified filesystem, or corrupted")]
    InvalidQuotaFile,

    #[error("command or quota type is invalid")]
    InvalidArgument,

    #[error("device or file does not exist")]
    NotFound,

    #[error("kernel has not been compiled with the CONFIG_QUOTA option")]
    KernelUnsupported,

    #[error("device is not a block device")]
    NotABlockDevice,

    #[error("specified limits are out of the range allowed by the quota format")]
    LimitOutOfRange,

    #[error("quota format was not found")]
    FormatNotFound,

    #[error("no id greater than or equal to the specified id has an active quota")]
    NoNextEntity,

    #[error("no disk quota found for the entity, or quotas are not turned on for this filesystem")]
    NoQuotaForEntity,

    /// Rejected before any syscall was issued.
    #[error("path contains an interior NUL byte or is too long")]
    InvalidPath,

    /// Rejected before any syscall was issued.
    #[error("{0} not supported by this build or the running kernel")]
    Unsupported(Capability),

    /// The syscall succeeded but the record's validity flags are not all
    /// set; treated as failure rather than a partial result.
    #[error("kernel returned a partially populated record")]
    IncompleteResult,

    #[error("unrecognized quotactl failure: {0}")]
    Unrecognized(Errno),
}

impl QuotaError {
    /// Translate a kernel-reported errno, disambiguated by the attempted
    /// sub-command.
    pub(crate) fn from_errno(errno: Errno, cmd: SubCmd) -> Self {
        match errno {
            Errno::EACCES if cmd == SubCmd::On => Self::InvalidQuotaFile,
            Errno::EACCES => Self::PermissionDenied,
            Errno::EBUSY => Self::AlreadyActive,
            Errno::EFAULT => Self::InvalidArgument,
            Errno::EINVAL if cmd == SubCmd::On => Self::InvalidQuotaFile,
            Errno::EINVAL => Self::InvalidArgument,
            Errno::ENOENT => Self::NotFound,
            Errno::ENOSYS => Self::KernelUnsupported,
            Errno::ENOTBLK => Self::NotABlockDevice,
            Errno::EPERM => Self::PermissionDenied,
            Errno::ERANGE => Self::LimitOutOfRange,
            Errno::ESRCH => match cmd {
                SubCmd::On => Self::FormatNotFound,
                SubCmd::GetNext => Self::NoNextEntity,
                _ => Self::NoQuotaForEntity,
            },
            other => Self::Unrecognized(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_translation_depends_on_subcmd() {
        assert_eq!(
            QuotaError::from_errno(Errno::EACCES, SubCmd::On),
            QuotaError::InvalidQuotaFile
        );
        assert_eq!(
            QuotaError::from_errno(Errno::EACCES, SubCmd::Set),
            QuotaError::PermissionDenied
        );
        assert_eq!(
            QuotaError::from_errno(Errno::EINVAL, SubCmd::On),
            QuotaError::InvalidQuotaFile
        );
        assert_eq!(
            QuotaError::from_errno(Errno::EINVAL, SubCmd::Get),
            QuotaError::InvalidArgument
        );
        assert_eq!(
            QuotaError::from_errno(Errno::ESRCH, SubCmd::On),
            QuotaError::FormatNotFound
        );
        assert_eq!(
            QuotaError::from_errno(Errno::ESRCH, SubCmd::GetNext),
            QuotaError::NoNextEntity
        );
        assert_eq!(
            QuotaError::from_errno(Errno::ESRCH, SubCmd::Get),
            QuotaError::NoQuotaForEntity
        );
        assert_eq!(
            QuotaError::from_errno(Errno::ESRCH, SubCmd::Sync),
            QuotaError::NoQuotaForEntity
        );
    }

    #[test]
    fn errno_translation_common_codes() {
        assert_eq!(
            QuotaError::from_errno(Errno::EBUSY, SubCmd::On),
            QuotaError::AlreadyActive
        );
        assert_eq!(
            QuotaError::from_errno(Errno::EPERM, SubCmd::Get),
            QuotaError::PermissionDenied
        );
        assert_eq!(
            QuotaError::from_errno(Errno::ENOENT, SubCmd::Off),
            QuotaError::NotFound
        );
        assert_eq!(
            QuotaError::from_errno(Errno::ENOSYS, SubCmd::Sync),
            QuotaError::KernelUnsupported
        );
        assert_eq!(
            QuotaError::from_errno(Errno::ENOTBLK, SubCmd::GetFmt),
            QuotaError::NotABlockDevice
        );
        assert_eq!(
            QuotaError::from_errno(Errno::ERANGE, SubCmd::Set),
            QuotaError::LimitOutOfRange
        );
        assert_eq!(
            QuotaError::from_errno(Errno::EFAULT, SubCmd::GetInfo),
            QuotaError::InvalidArgument
        );
    }

    #[test]
    fn unknown_errno_maps_to_unrecognized() {
        assert_eq!(
            QuotaError::from_errno(Errno::EIO, SubCmd::Get),
            QuotaError::Unrecognized(Errno::EIO)
        );
    }
}
