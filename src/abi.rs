//! Kernel quota ABI pieces. The libc crate declares the base commands,
//! `dqblk`, the `QIF_*` bits and the `QFMT_VFS_*` formats, but not the rest;
//! everything below mirrors include/uapi/linux/quota.h.
#![allow(non_camel_case_types)]

use bitflags::bitflags;
use libc::c_int;

/// Quota scoped to a directory-tree project id. Kernel >= 4.1.
pub const PRJQUOTA: c_int = 2;

/// Search for the next active quota at or above an id. Kernel >= 4.6.
pub const Q_GETNEXTQUOTA: c_int = 0x800009;

pub const SUBCMDSHIFT: c_int = 8;
pub const SUBCMDMASK: c_int = 0x00ff;

// dqi_flags
pub const DQF_ROOT_SQUASH: u32 = 1 << 0;
pub const DQF_SYS_FILE: u32 = 1 << 16;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct dqinfo {
    pub dqi_bgrace: u64,
    pub dqi_igrace: u64,
    pub dqi_flags: u32,
    pub dqi_valid: u32,
}

/// `struct if_nextdqblk`: a `dqblk` plus the id the search resolved to.
/// The quotactl(2) man page calls it `nextdqblk`, but only this name is
/// defined in linux/quota.h.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct if_nextdqblk {
    pub dqb_bhardlimit: u64,
    pub dqb_bsoftlimit: u64,
    pub dqb_curspace: u64,
    pub dqb_ihardlimit: u64,
    pub dqb_isoftlimit: u64,
    pub dqb_curinodes: u64,
    pub dqb_btime: u64,
    pub dqb_itime: u64,
    pub dqb_valid: u32,
    pub dqb_id: u32,
}

bitflags! {
    /// `dqb_valid` bits (QIF_*).
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Qif: u32 {
        const BLIMITS = libc::QIF_BLIMITS;
        const SPACE = libc::QIF_SPACE;
        const ILIMITS = libc::QIF_ILIMITS;
        const INODES = libc::QIF_INODES;
        const BTIME = libc::QIF_BTIME;
        const ITIME = libc::QIF_ITIME;
        const LIMITS = libc::QIF_LIMITS;
        const USAGE = libc::QIF_USAGE;
        const TIMES = libc::QIF_TIMES;
        const ALL = libc::QIF_ALL;
    }
}

bitflags! {
    /// `dqi_valid` bits (IIF_*).
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Iif: u32 {
        const BGRACE = 1;
        const IGRACE = 2;
        const FLAGS = 4;
        const ALL = Self::BGRACE.bits() | Self::IGRACE.bits() | Self::FLAGS.bits();
    }
}

/// The kind of entity a quota is accounted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum QuotaType {
    /// Per-uid quotas.
    User = libc::USRQUOTA,
    /// Per-gid quotas.
    Group = libc::GRPQUOTA,
    /// Per-project quotas. Kernel >= 4.1.
    Project = PRJQUOTA,
}

/// quotactl sub-command (Q_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum SubCmd {
    Sync = libc::Q_SYNC,
    On = libc::Q_QUOTAON,
    Off = libc::Q_QUOTAOFF,
    GetFmt = libc::Q_GETFMT,
    GetInfo = libc::Q_GETINFO,
    SetInfo = libc::Q_SETINFO,
    Get = libc::Q_GETQUOTA,
    Set = libc::Q_SETQUOTA,
    GetNext = Q_GETNEXTQUOTA,
}

/// Composite quotactl command: QCMD(subcmd, type).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaCmd(pub SubCmd, pub QuotaType);

impl QuotaCmd {
    pub fn as_int(&self) -> c_int {
        ((self.0 as c_int) << SUBCMDSHIFT) | ((self.1 as c_int) & SUBCMDMASK)
    }

    pub fn subcmd(&self) -> SubCmd {
        self.0
    }
}
