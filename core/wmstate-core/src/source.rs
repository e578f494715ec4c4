//! Where raw dumps come from.
//!
//! The reconciler never talks to a device itself; it asks a [`DumpSource`]
//! for the current text of each subsystem.

use std::fmt;

/// Which subsystem a dump describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DumpTarget {
    Scheduler,
    Compositor,
}

impl fmt::Display for DumpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpTarget::Scheduler => f.write_str("activity scheduler"),
            DumpTarget::Compositor => f.write_str("window compositor"),
        }
    }
}

/// Fetches the raw text of each subsystem's state dump.
///
/// Failures are reported as plain messages and surface unchanged as
/// `StateError::Fetch`; the reconciler does not retry them.
pub trait DumpSource: Send + Sync {
    fn scheduler_dump(&self) -> Result<String, String>;
    fn compositor_dump(&self) -> Result<String, String>;

    fn dump(&self, target: DumpTarget) -> Result<String, String> {
        match target {
            DumpTarget::Scheduler => self.scheduler_dump(),
            DumpTarget::Compositor => self.compositor_dump(),
        }
    }
}

impl<T: DumpSource + ?Sized> DumpSource for std::sync::Arc<T> {
    fn scheduler_dump(&self) -> Result<String, String> {
        (**self).scheduler_dump()
    }

    fn compositor_dump(&self) -> Result<String, String> {
        (**self).compositor_dump()
    }
}
