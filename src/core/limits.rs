//! Open-file-descriptor limit planning.
//!
//! A [`LimitRequest`] names the bounds to change; [`plan`] reads the current
//! limits and overrides only those bounds; [`LimitPlan::apply`] writes the
//! result. A request with neither bound set never touches OS state.

use crate::core::observe::{Event, Observer};
use crate::error::{LimitError, Result};

/// Requested soft/hard open-files limits. `None` leaves a bound untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitRequest {
    pub soft: Option<u64>,
    pub hard: Option<u64>,
}

impl LimitRequest {
    pub fn new(soft: Option<u64>, hard: Option<u64>) -> Self {
        Self { soft, hard }
    }

    /// Build from signed flag values, where any negative value means "unset".
    pub fn from_flags(soft: i64, hard: i64) -> Self {
        Self {
            soft: u64::try_from(soft).ok(),
            hard: u64::try_from(hard).ok(),
        }
    }

    pub fn is_unset(&self) -> bool {
        self.soft.is_none() && self.hard.is_none()
    }
}

/// Open-files limit pair as the OS reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FdLimits {
    pub soft: u64,
    pub hard: u64,
}

/// Access to the process' open-files limit.
pub trait ResourceLimits {
    fn get_nofile(&self) -> std::io::Result<FdLimits>;
    fn set_nofile(&self, limits: FdLimits) -> std::io::Result<()>;
}

/// The running process' own `RLIMIT_NOFILE`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLimits;

#[cfg(unix)]
impl ResourceLimits for SystemLimits {
    fn get_nofile(&self) -> std::io::Result<FdLimits> {
        use nix::sys::resource::{getrlimit, Resource};

        let (soft, hard) = getrlimit(Resource::RLIMIT_NOFILE)?;
        Ok(FdLimits {
            soft: from_rlim(soft)?,
            hard: from_rlim(hard)?,
        })
    }

    fn set_nofile(&self, limits: FdLimits) -> std::io::Result<()> {
        use nix::sys::resource::{rlim_t, setrlimit, Resource};

        setrlimit(
            Resource::RLIMIT_NOFILE,
            to_rlim::<rlim_t>(limits.soft)?,
            to_rlim::<rlim_t>(limits.hard)?,
        )?;
        Ok(())
    }
}

/// Narrow a requested limit to the OS limit type.
///
/// Fails with `InvalidInput` instead of truncating.
pub fn to_rlim<T: TryFrom<u64>>(value: u64) -> std::io::Result<T> {
    T::try_from(value).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is not representable as an OS resource limit", value),
        )
    })
}

#[cfg(unix)]
fn from_rlim<T: TryInto<u64>>(value: T) -> std::io::Result<u64> {
    value.try_into().map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "OS resource limit does not fit in 64 bits",
        )
    })
}

#[cfg(not(unix))]
impl ResourceLimits for SystemLimits {
    fn get_nofile(&self) -> std::io::Result<FdLimits> {
        Err(std::io::ErrorKind::Unsupported.into())
    }

    fn set_nofile(&self, _limits: FdLimits) -> std::io::Result<()> {
        Err(std::io::ErrorKind::Unsupported.into())
    }
}

/// Limits to apply right before launch. `None` means "leave as is".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitPlan(Option<FdLimits>);

impl LimitPlan {
    /// Target limits, if any change was requested.
    pub fn target(&self) -> Option<FdLimits> {
        self.0
    }

    pub fn is_noop(&self) -> bool {
        self.0.is_none()
    }

    /// Write the planned limits.
    ///
    /// A no-op plan performs no call at all. A soft limit above the hard
    /// limit is rejected before reaching the OS.
    ///
    /// # Errors
    ///
    /// Returns `LimitError::SoftExceedsHard` or `LimitError::Apply`.
    pub fn apply(&self, os: &dyn ResourceLimits, observer: &dyn Observer) -> Result<()> {
        let Some(limits) = self.0 else {
            return Ok(());
        };

        if limits.soft > limits.hard {
            return Err(LimitError::SoftExceedsHard {
                soft: limits.soft,
                hard: limits.hard,
            }
            .into());
        }

        os.set_nofile(limits).map_err(|source| LimitError::Apply {
            soft: limits.soft,
            hard: limits.hard,
            source,
        })?;

        observer.observe(Event::LimitsApplied {
            soft: limits.soft,
            hard: limits.hard,
        });
        Ok(())
    }
}

/// Compute the limits to apply for `request`.
///
/// Reads the current limits only when at least one bound is requested.
///
/// # Errors
///
/// Returns `LimitError::Read` if the current limits cannot be read.
pub fn plan(request: LimitRequest, os: &dyn ResourceLimits) -> Result<LimitPlan> {
    if request.is_unset() {
        return Ok(LimitPlan(None));
    }

    let mut limits = os.get_nofile().map_err(LimitError::Read)?;
    if let Some(soft) = request.soft {
        limits.soft = soft;
    }
    if let Some(hard) = request.hard {
        limits.hard = hard;
    }
    Ok(LimitPlan(Some(limits)))
}
