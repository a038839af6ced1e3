//! Kernel capability detection.
//!
//! Project quotas and the next-quota search exist only on newer kernels, and
//! each can be compiled out of this crate via a cargo feature. The dispatch
//! layer consults one process-wide [`Capabilities`] set instead of checking
//! at every call site.

use std::fmt;

use nix::sys::utsname::uname;
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

/// Kernel version from the uname release string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct KernelVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl KernelVersion {
    /// Oldest kernel this interface assumes: Q_GETINFO/Q_SETINFO/Q_GETFMT
    /// present, Q_GETSTATS gone.
    pub const MIN_SUPPORTED: KernelVersion = KernelVersion::new(2, 4, 22);

    /// First kernel with PRJQUOTA.
    pub const PROJECT_QUOTA_MIN: KernelVersion = KernelVersion::new(4, 1, 0);

    /// First kernel with Q_GETNEXTQUOTA.
    pub const NEXT_QUOTA_MIN: KernelVersion = KernelVersion::new(4, 6, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a release string such as `"6.8.0-45-generic"`. A missing patch
    /// component reads as zero.
    pub fn parse(release: &str) -> Option<Self> {
        let mut parts = release.split('.');
        let major = leading_number(parts.next()?)?;
        let minor = leading_number(parts.next()?)?;
        let patch = parts.next().and_then(leading_number).unwrap_or(0);
        Some(Self::new(major, minor, patch))
    }

    /// Version of the running kernel, if its release string parses.
    pub fn current() -> Option<Self> {
        let uts = uname().ok()?;
        Self::parse(uts.release().to_str()?)
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn leading_number(s: &str) -> Option<u32> {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    s[..end].parse().ok()
}

/// A quota feature that may be absent from this build or the running kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ProjectQuota,
    NextQuota,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::ProjectQuota => "project quotas",
            Capability::NextQuota => "next-quota lookup",
        })
    }
}

/// The quota features available to this process: a feature is usable when it
/// is compiled in and the running kernel is new enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub project_quota: bool,
    pub next_quota: bool,
}

impl Capabilities {
    /// Everything gated off; used when the kernel version is unknown.
    pub const NONE: Capabilities = Capabilities {
        project_quota: false,
        next_quota: false,
    };

    pub fn supports(&self, cap: Capability) -> bool {
        match cap {
            Capability::ProjectQuota => self.project_quota,
            Capability::NextQuota => self.next_quota,
        }
    }

    pub fn from_kernel(kernel: Option<KernelVersion>) -> Self {
        let Some(kernel) = kernel else {
            return Self::NONE;
        };
        Self {
            project_quota: cfg!(feature = "project-quota")
                && kernel >= KernelVersion::PROJECT_QUOTA_MIN,
            next_quota: cfg!(feature = "next-quota") && kernel >= KernelVersion::NEXT_QUOTA_MIN,
        }
    }

    /// Capabilities of this build on the running kernel, detected once per
    /// process.
    pub fn get() -> &'static Capabilities {
        static CAPS: OnceCell<Capabilities> = OnceCell::new();

        CAPS.get_or_init(|| {
            let kernel = KernelVersion::current();
            if let Some(kernel) = kernel {
                if kernel < KernelVersion::MIN_SUPPORTED {
                    warn!(%kernel, "kernel is older than the supported minimum (2.4.22)");
                }
            }
            let caps = Self::from_kernel(kernel);
            debug!(?kernel, ?caps, "detected quota capabilities");
            caps
        })
    }
}
