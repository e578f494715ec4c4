//! # wmstate-core
//!
//! Parses the activity scheduler and window compositor state dumps of a
//! device into typed models and proves the two models agree.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. Polling blocks the calling thread.
//! - **Best-effort parsing**: Unknown dump lines are dropped and counted, never errors.
//! - **Converge, then assert**: Disagreement is retried until the configured
//!   attempts run out; only the final mismatch is reported.
//! - **Injectable I/O**: Dumps come from a [`DumpSource`], sleeps go through a
//!   [`Sleeper`], so nothing here needs a device to test.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wmstate_core::{load_config, Reconciler};
//!
//! let config = load_config(None)?;
//! let mut reconciler = Reconciler::new(source, config);
//! let targets = reconciler.targets(&["MainActivity"]);
//! reconciler.compute_state(&targets, false)?;
//! reconciler.assert_focused_activity("MainActivity")?;
//! ```

pub mod compositor;
pub mod config;
pub mod error;
pub mod geometry;
pub mod parser;
pub mod patterns;
pub mod reconciler;
pub mod scheduler;
pub mod source;
pub mod types;
pub mod validate;
pub mod wait;

pub use compositor::{CompositorState, Display, WindowRecord, WindowStack, WindowTask};
pub use config::{load_config, MinSizeConfig, PollConfig, ReconcilerConfig};
pub use error::{Result, StateError};
pub use geometry::Rect;
pub use reconciler::{CaptureTimes, Reconciler};
pub use scheduler::{ActivityRecord, ContainerStack, ContainerTask, SchedulerState};
pub use source::{DumpSource, DumpTarget};
pub use types::*;
pub use validate::{validate, Violation, ViolationList};
pub use wait::{CancelToken, Poller, Sleeper, ThreadSleeper};
