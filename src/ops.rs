//! The generic operation set: one function per quotactl sub-command,
//! parameterized by [`QuotaType`]. Each call validates its arguments,
//! consults the process capability set, issues exactly one syscall with
//! stack-local buffers, and decodes the result.

use std::fmt;
use std::mem::MaybeUninit;
use std::ptr;

use bitflags::bitflags;
use libc::{c_char, c_int};
use nix::errno::Errno;
use nix::NixPath;
use tracing::trace;

use crate::abi::{self, Iif, Qif, QuotaCmd, QuotaType, SubCmd};
use crate::caps::{Capabilities, Capability};
use crate::error::{QuotaError, Result};

// === Data model === //

/// On-disk quota format identifier. Unknown future formats are carried
/// through unchanged.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuotaFormat(pub i32);

impl QuotaFormat {
    /// Original quota format, 16-bit uids/gids.
    pub const VFS_OLD: QuotaFormat = QuotaFormat(libc::QFMT_VFS_OLD);
    /// VFS v0: 32-bit ids, limits up to 2^32 blocks/inodes.
    pub const VFS_V0: QuotaFormat = QuotaFormat(libc::QFMT_VFS_V0);
    /// VFS v1: 32-bit ids, 64-bit limits.
    pub const VFS_V1: QuotaFormat = QuotaFormat(libc::QFMT_VFS_V1);
}

impl fmt::Debug for QuotaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::VFS_OLD => f.write_str("QuotaFormat::VFS_OLD"),
            Self::VFS_V0 => f.write_str("QuotaFormat::VFS_V0"),
            Self::VFS_V1 => f.write_str("QuotaFormat::VFS_V1"),
            Self(other) => write!(f, "QuotaFormat({:#x})", other),
        }
    }
}

bitflags! {
    /// Quota file flags (DQF_*), from the quota file header.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct QuotaFileFlags: u32 {
        /// Root's usage is accounted against the unprivileged limits
        /// (v1 format only).
        const ROOT_SQUASH = abi::DQF_ROOT_SQUASH;
        /// Quota data lives in a hidden system inode.
        const SYS_FILE = abi::DQF_SYS_FILE;
    }
}

/// Block (space) limits and usage. Limits are in quota blocks of 1024
/// bytes; `used` is reported by the kernel in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockLimits {
    pub hard: u64,
    pub soft: u64,
    pub used: u64,
}

/// Inode limits and usage, as counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InodeLimits {
    pub hard: u64,
    pub soft: u64,
    pub used: u64,
}

/// Full per-entity quota snapshot. Only ever built from a kernel record
/// with all validity bits set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaRecord {
    pub blocks: BlockLimits,
    pub inodes: InodeLimits,
    /// Epoch seconds at which the block soft limit becomes enforced.
    pub block_grace_expiry: u64,
    /// Epoch seconds at which the inode soft limit becomes enforced.
    pub inode_grace_expiry: u64,
}

impl QuotaRecord {
    fn from_dqblk(d: &libc::dqblk) -> Result<Self> {
        if !Qif::from_bits_retain(d.dqb_valid).contains(Qif::ALL) {
            return Err(QuotaError::IncompleteResult);
        }
        Ok(Self {
            blocks: BlockLimits {
                hard: d.dqb_bhardlimit,
                soft: d.dqb_bsoftlimit,
                used: d.dqb_curspace,
            },
            inodes: InodeLimits {
                hard: d.dqb_ihardlimit,
                soft: d.dqb_isoftlimit,
                used: d.dqb_curinodes,
            },
            block_grace_expiry: d.dqb_btime,
            inode_grace_expiry: d.dqb_itime,
        })
    }
}

/// Quota record found by a next-id search, with the id it resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextQuotaRecord {
    pub id: u32,
    pub record: QuotaRecord,
}

impl NextQuotaRecord {
    fn from_nextdqblk(d: &abi::if_nextdqblk) -> Result<Self> {
        if !Qif::from_bits_retain(d.dqb_valid).contains(Qif::ALL) {
            return Err(QuotaError::IncompleteResult);
        }
        Ok(Self {
            id: d.dqb_id,
            record: QuotaRecord {
                blocks: BlockLimits {
                    hard: d.dqb_bhardlimit,
                    soft: d.dqb_bsoftlimit,
                    used: d.dqb_curspace,
                },
                inodes: InodeLimits {
                    hard: d.dqb_ihardlimit,
                    soft: d.dqb_isoftlimit,
                    used: d.dqb_curinodes,
                },
                block_grace_expiry: d.dqb_btime,
                inode_grace_expiry: d.dqb_itime,
            },
        })
    }
}

/// The four writable limit fields of a quota record. Usage and grace
/// fields are owned by the kernel and are never written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaLimits {
    pub block_hard: u64,
    pub block_soft: u64,
    pub inode_hard: u64,
    pub inode_soft: u64,
}

impl QuotaLimits {
    fn to_dqblk(self) -> libc::dqblk {
        libc::dqblk {
            dqb_bhardlimit: self.block_hard,
            dqb_bsoftlimit: self.block_soft,
            dqb_curspace: 0,
            dqb_ihardlimit: self.inode_hard,
            dqb_isoftlimit: self.inode_soft,
            dqb_curinodes: 0,
            dqb_btime: 0,
            dqb_itime: 0,
            dqb_valid: Qif::LIMITS.bits(),
        }
    }
}

/// Per-filesystem quota file metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaFileInfo {
    /// Grace period for block soft limits, in seconds.
    pub block_grace: u64,
    /// Grace period for inode soft limits, in seconds.
    pub inode_grace: u64,
    pub flags: QuotaFileFlags,
}

impl QuotaFileInfo {
    fn from_dqinfo(d: &abi::dqinfo) -> Result<Self> {
        if !Iif::from_bits_retain(d.dqi_valid).contains(Iif::ALL) {
            return Err(QuotaError::IncompleteResult);
        }
        Ok(Self {
            block_grace: d.dqi_bgrace,
            inode_grace: d.dqi_igrace,
            flags: QuotaFileFlags::from_bits_retain(d.dqi_flags),
        })
    }

    fn to_dqinfo(self) -> abi::dqinfo {
        abi::dqinfo {
            dqi_bgrace: self.block_grace,
            dqi_igrace: self.inode_grace,
            dqi_flags: self.flags.bits(),
            dqi_valid: Iif::ALL.bits(),
        }
    }
}

// === Dispatch === //

/// Reject a command whose quota type or sub-command needs a capability this
/// build/kernel lacks, before any marshaling or syscall.
fn check_dispatch(caps: &Capabilities, qtype: QuotaType, sub: SubCmd) -> Result<()> {
    if qtype == QuotaType::Project && !caps.supports(Capability::ProjectQuota) {
        return Err(QuotaError::Unsupported(Capability::ProjectQuota));
    }
    if sub == SubCmd::GetNext && !caps.supports(Capability::NextQuota) {
        return Err(QuotaError::Unsupported(Capability::NextQuota));
    }
    Ok(())
}

/// Issue one quotactl call. `id` and `data` are interpreted per `cmd`.
fn quotactl<P: NixPath + ?Sized>(
    cmd: QuotaCmd,
    special: Option<&P>,
    id: c_int,
    data: *mut c_char,
) -> Result<()> {
    let ret = match special {
        Some(device) => device
            .with_nix_path(|device| {
                trace!(?cmd, ?device, id, "quotactl");
                unsafe { libc::quotactl(cmd.as_int(), device.as_ptr(), id, data) }
            })
            .map_err(|_| QuotaError::InvalidPath)?,
        None => {
            trace!(?cmd, id, "quotactl");
            unsafe { libc::quotactl(cmd.as_int(), ptr::null(), id, data) }
        }
    };
    Errno::result(ret)
        .map(drop)
        .map_err(|errno| QuotaError::from_errno(errno, cmd.subcmd()))
}

// === Operations === //

/// Turn on quota enforcement of one type for a filesystem, reading limits
/// from the given quota file.
pub fn quota_on<P: NixPath + ?Sized>(
    qtype: QuotaType,
    device: &P,
    format: QuotaFormat,
    quota_file: &P,
) -> Result<()> {
    check_dispatch(Capabilities::get(), qtype, SubCmd::On)?;

    // the kernel only reads the path, but the syscall takes a mutable
    // data pointer
    let mut path = quota_file
        .with_nix_path(|p| p.to_bytes_with_nul().to_owned())
        .map_err(|_| QuotaError::InvalidPath)?;
    quotactl(
        QuotaCmd(SubCmd::On, qtype),
        Some(device),
        format.0,
        path.as_mut_ptr() as *mut c_char,
    )
}

/// Turn off quota enforcement of one type for a filesystem.
pub fn quota_off<P: NixPath + ?Sized>(qtype: QuotaType, device: &P) -> Result<()> {
    check_dispatch(Capabilities::get(), qtype, SubCmd::Off)?;
    quotactl(QuotaCmd(SubCmd::Off, qtype), Some(device), 0, ptr::null_mut())
}

/// Get the quota record for one entity id.
pub fn quota_get<P: NixPath + ?Sized>(
    qtype: QuotaType,
    device: &P,
    id: u32,
) -> Result<QuotaRecord> {
    check_dispatch(Capabilities::get(), qtype, SubCmd::Get)?;
    let mut data = MaybeUninit::<libc::dqblk>::uninit();
    quotactl(
        QuotaCmd(SubCmd::Get, qtype),
        Some(device),
        id as c_int,
        data.as_mut_ptr() as *mut c_char,
    )?;
    let data = unsafe { data.assume_init() };
    QuotaRecord::from_dqblk(&data)
}

/// Get the quota record of the entity with the smallest id greater than or
/// equal to `id` that has a quota set.
pub fn quota_get_next<P: NixPath + ?Sized>(
    qtype: QuotaType,
    device: &P,
    id: u32,
) -> Result<NextQuotaRecord> {
    check_dispatch(Capabilities::get(), qtype, SubCmd::GetNext)?;
    let mut data = MaybeUninit::<abi::if_nextdqblk>::uninit();
    quotactl(
        QuotaCmd(SubCmd::GetNext, qtype),
        Some(device),
        id as c_int,
        data.as_mut_ptr() as *mut c_char,
    )?;
    let data = unsafe { data.assume_init() };
    NextQuotaRecord::from_nextdqblk(&data)
}

/// Set the four limit fields for one entity id. Usage and grace fields are
/// left untouched.
pub fn quota_set<P: NixPath + ?Sized>(
    qtype: QuotaType,
    device: &P,
    id: u32,
    limits: QuotaLimits,
) -> Result<()> {
    check_dispatch(Capabilities::get(), qtype, SubCmd::Set)?;
    let mut data = limits.to_dqblk();
    quotactl(
        QuotaCmd(SubCmd::Set, qtype),
        Some(device),
        id as c_int,
        &mut data as *mut libc::dqblk as *mut c_char,
    )
}

/// Get grace intervals and flags of the quota file for one quota type.
pub fn quota_get_info<P: NixPath + ?Sized>(qtype: QuotaType, device: &P) -> Result<QuotaFileInfo> {
    check_dispatch(Capabilities::get(), qtype, SubCmd::GetInfo)?;
    let mut data = MaybeUninit::<abi::dqinfo>::uninit();
    quotactl(
        QuotaCmd(SubCmd::GetInfo, qtype),
        Some(device),
        0,
        data.as_mut_ptr() as *mut c_char,
    )?;
    let data = unsafe { data.assume_init() };
    QuotaFileInfo::from_dqinfo(&data)
}

/// Set grace intervals and flags of the quota file, all in one call.
pub fn quota_set_info<P: NixPath + ?Sized>(
    qtype: QuotaType,
    device: &P,
    info: QuotaFileInfo,
) -> Result<()> {
    check_dispatch(Capabilities::get(), qtype, SubCmd::SetInfo)?;
    let mut data = info.to_dqinfo();
    quotactl(
        QuotaCmd(SubCmd::SetInfo, qtype),
        Some(device),
        0,
        &mut data as *mut abi::dqinfo as *mut c_char,
    )
}

/// Get the active on-disk quota format for one quota type.
pub fn quota_get_format<P: NixPath + ?Sized>(qtype: QuotaType, device: &P) -> Result<QuotaFormat> {
    check_dispatch(Capabilities::get(), qtype, SubCmd::GetFmt)?;
    let mut format: c_int = 0;
    quotactl(
        QuotaCmd(SubCmd::GetFmt, qtype),
        Some(device),
        0,
        &mut format as *mut c_int as *mut c_char,
    )?;
    Ok(QuotaFormat(format))
}

/// Write in-kernel quota state to disk. With no device, every filesystem
/// with active quotas of this type is synced.
pub fn quota_sync<P: NixPath + ?Sized>(qtype: QuotaType, device: Option<&P>) -> Result<()> {
    check_dispatch(Capabilities::get(), qtype, SubCmd::Sync)?;
    quotactl(QuotaCmd(SubCmd::Sync, qtype), device, 0, ptr::null_mut())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_dqblk() -> libc::dqblk {
        libc::dqblk {
            dqb_bhardlimit: 100,
            dqb_bsoftlimit: 90,
            dqb_curspace: 42 * 1024,
            dqb_ihardlimit: 10,
            dqb_isoftlimit: 9,
            dqb_curinodes: 3,
            dqb_btime: 1_700_000_000,
            dqb_itime: 1_700_000_100,
            dqb_valid: Qif::ALL.bits(),
        }
    }

    #[test]
    fn record_from_fully_valid_dqblk() {
        let record = QuotaRecord::from_dqblk(&full_dqblk()).unwrap();
        assert_eq!(record.blocks.hard, 100);
        assert_eq!(record.blocks.soft, 90);
        assert_eq!(record.blocks.used, 42 * 1024);
        assert_eq!(record.inodes.hard, 10);
        assert_eq!(record.inodes.soft, 9);
        assert_eq!(record.inodes.used, 3);
        assert_eq!(record.block_grace_expiry, 1_700_000_000);
        assert_eq!(record.inode_grace_expiry, 1_700_000_100);
    }

    #[test]
    fn partially_valid_dqblk_is_an_error() {
        let mut data = full_dqblk();
        data.dqb_valid = Qif::LIMITS.bits();
        assert_eq!(
            QuotaRecord::from_dqblk(&data),
            Err(QuotaError::IncompleteResult)
        );

        data.dqb_valid = 0;
        assert_eq!(
            QuotaRecord::from_dqblk(&data),
            Err(QuotaError::IncompleteResult)
        );
    }

    #[test]
    fn next_record_carries_resolved_id() {
        let data = abi::if_nextdqblk {
            dqb_bhardlimit: 1,
            dqb_bsoftlimit: 2,
            dqb_curspace: 3,
            dqb_ihardlimit: 4,
            dqb_isoftlimit: 5,
            dqb_curinodes: 6,
            dqb_btime: 7,
            dqb_itime: 8,
            dqb_valid: Qif::ALL.bits(),
            dqb_id: 1000,
        };
        let next = NextQuotaRecord::from_nextdqblk(&data).unwrap();
        assert_eq!(next.id, 1000);
        assert_eq!(next.record.blocks.hard, 1);
        assert_eq!(next.record.inodes.used, 6);

        let mut partial = data;
        partial.dqb_valid = Qif::USAGE.bits();
        assert_eq!(
            NextQuotaRecord::from_nextdqblk(&partial),
            Err(QuotaError::IncompleteResult)
        );
    }

    #[test]
    fn set_marshaling_writes_limits_only() {
        let data = QuotaLimits {
            block_hard: 100,
            block_soft: 90,
            inode_hard: 10,
            inode_soft: 9,
        }
        .to_dqblk();

        assert_eq!(data.dqb_valid, Qif::LIMITS.bits());
        assert_eq!(data.dqb_bhardlimit, 100);
        assert_eq!(data.dqb_bsoftlimit, 90);
        assert_eq!(data.dqb_ihardlimit, 10);
        assert_eq!(data.dqb_isoftlimit, 9);
        assert_eq!(data.dqb_curspace, 0);
        assert_eq!(data.dqb_curinodes, 0);
        assert_eq!(data.dqb_btime, 0);
        assert_eq!(data.dqb_itime, 0);
    }

    #[test]
    fn info_marshaling_is_atomic_and_strict() {
        let info = QuotaFileInfo {
            block_grace: 7 * 24 * 3600,
            inode_grace: 3 * 24 * 3600,
            flags: QuotaFileFlags::ROOT_SQUASH,
        };
        let data = info.to_dqinfo();
        assert_eq!(data.dqi_valid, Iif::ALL.bits());
        assert_eq!(QuotaFileInfo::from_dqinfo(&data).unwrap(), info);

        let partial = abi::dqinfo {
            dqi_bgrace: 1,
            dqi_igrace: 2,
            dqi_flags: 0,
            dqi_valid: Iif::BGRACE.bits(),
        };
        assert_eq!(
            QuotaFileInfo::from_dqinfo(&partial),
            Err(QuotaError::IncompleteResult)
        );
    }

    #[test]
    fn unknown_file_flag_bits_are_retained() {
        let data = abi::dqinfo {
            dqi_bgrace: 0,
            dqi_igrace: 0,
            dqi_flags: abi::DQF_SYS_FILE | 0x8000_0000,
            dqi_valid: Iif::ALL.bits(),
        };
        let info = QuotaFileInfo::from_dqinfo(&data).unwrap();
        assert!(info.flags.contains(QuotaFileFlags::SYS_FILE));
        assert_eq!(info.flags.bits(), abi::DQF_SYS_FILE | 0x8000_0000);
    }

    #[test]
    fn dispatch_rejects_missing_capabilities_before_syscall() {
        let none = Capabilities::NONE;
        assert_eq!(
            check_dispatch(&none, QuotaType::Project, SubCmd::Get),
            Err(QuotaError::Unsupported(Capability::ProjectQuota))
        );
        assert_eq!(
            check_dispatch(&none, QuotaType::User, SubCmd::GetNext),
            Err(QuotaError::Unsupported(Capability::NextQuota))
        );
        // project wins over next-quota when both are missing
        assert_eq!(
            check_dispatch(&none, QuotaType::Project, SubCmd::GetNext),
            Err(QuotaError::Unsupported(Capability::ProjectQuota))
        );
        assert_eq!(check_dispatch(&none, QuotaType::User, SubCmd::Get), Ok(()));
        assert_eq!(check_dispatch(&none, QuotaType::Group, SubCmd::Sync), Ok(()));

        let all = Capabilities {
            project_quota: true,
            next_quota: true,
        };
        assert_eq!(
            check_dispatch(&all, QuotaType::Project, SubCmd::GetNext),
            Ok(())
        );
    }

    #[test]
    fn format_constants_and_debug_names() {
        assert_eq!(QuotaFormat::VFS_OLD.0, 1);
        assert_eq!(QuotaFormat::VFS_V0.0, 2);
        assert_eq!(QuotaFormat::VFS_V1.0, 4);
        assert_eq!(format!("{:?}", QuotaFormat::VFS_V1), "QuotaFormat::VFS_V1");
        assert_eq!(format!("{:?}", QuotaFormat(0x77)), "QuotaFormat(0x77)");
    }
}
