//! Platform constants and small value types shared by both models.

use serde::{Serialize, Serializer};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// Stack and Activity Kinds
// ═══════════════════════════════════════════════════════════════════════════════

pub const HOME_STACK_ID: i32 = 0;
pub const FULLSCREEN_WORKSPACE_STACK_ID: i32 = 1;
pub const FREEFORM_WORKSPACE_STACK_ID: i32 = 2;
pub const DOCKED_STACK_ID: i32 = 3;
pub const PINNED_STACK_ID: i32 = 4;
pub const RECENTS_STACK_ID: i32 = 5;
pub const ASSISTANT_STACK_ID: i32 = 6;

pub const APPLICATION_ACTIVITY_TYPE: i32 = 0;
pub const HOME_ACTIVITY_TYPE: i32 = 1;
pub const RECENTS_ACTIVITY_TYPE: i32 = 2;

pub const DEFAULT_DISPLAY_ID: i32 = 0;

/// Reference density that dp values are defined against.
pub const DENSITY_DEFAULT: i32 = 160;

pub const TYPE_WALLPAPER: i32 = 2013;

pub const APP_STATE_IDLE: &str = "APP_STATE_IDLE";

pub const RESIZE_MODE_RESIZEABLE: &str = "RESIZE_MODE_RESIZEABLE";

/// Converts density-independent pixels to physical pixels.
pub fn px_from_dp(dp: i32, density_dpi: i32) -> i32 {
    (dp as f32 * density_dpi as f32 / DENSITY_DEFAULT as f32 + 0.5) as i32
}

// ═══════════════════════════════════════════════════════════════════════════════
// Activity Lifecycle
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle state reported for one activity record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActivityLifecycle {
    Resumed,
    Paused,
    Stopped,
    Destroyed,
    Other(String),
}

impl ActivityLifecycle {
    pub fn parse(value: &str) -> Self {
        match value {
            "RESUMED" => Self::Resumed,
            "PAUSED" => Self::Paused,
            "STOPPED" => Self::Stopped,
            "DESTROYED" => Self::Destroyed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Resumed => "RESUMED",
            Self::Paused => "PAUSED",
            Self::Stopped => "STOPPED",
            Self::Destroyed => "DESTROYED",
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for ActivityLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ActivityLifecycle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// How a window header line was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Normal,
    Starting,
    Exiting,
    Debugger,
}

impl WindowKind {
    /// Starting and exiting windows mean a transition is in flight.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Starting | Self::Exiting)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Component Names
// ═══════════════════════════════════════════════════════════════════════════════

/// `pkg/.Name` for short names, `pkg/a.b.Name` for qualified ones.
pub fn activity_component_name(package: &str, activity: &str) -> String {
    let separator = if activity.contains('.') { "" } else { "." };
    format!("{}/{}{}", package, separator, activity)
}

/// Window title for an activity: the class name is always fully qualified.
pub fn window_name(package: &str, activity: &str) -> String {
    if activity.contains('.') {
        format!("{}/{}", package, activity)
    } else {
        format!("{}/{}.{}", package, package, activity)
    }
}

/// Rewrites `pkg/.Name` into `pkg/pkg.Name`; other names pass through.
pub fn window_name_for_component(component: &str) -> String {
    match component.rfind("/.") {
        Some(index) => {
            let package = &component[..index];
            format!("{}/{}.{}", package, package, &component[index + 2..])
        }
        None => component.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Wait Targets
// ═══════════════════════════════════════════════════════════════════════════════

/// An activity a caller waits on, named the way each subsystem reports it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WaitTarget {
    /// Component name as the scheduler prints it.
    pub activity: String,
    /// Title of the activity's main window in the compositor.
    pub window: String,
}

impl WaitTarget {
    /// Expands a short activity name inside `package`.
    pub fn component(package: &str, activity: &str) -> Self {
        Self {
            activity: activity_component_name(package, activity),
            window: window_name(package, activity),
        }
    }

    /// Uses a full component name (`pkg/.Name` or `pkg/pkg.Name`) as given.
    pub fn named(component: &str) -> Self {
        Self {
            activity: component.to_string(),
            window: window_name_for_component(component),
        }
    }

    /// Waits on a window whose title does not follow the activity name.
    pub fn with_window(mut self, window: impl Into<String>) -> Self {
        self.window = window.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn px_from_dp_rounds_half_up() {
        assert_eq!(px_from_dp(220, 160), 220);
        assert_eq!(px_from_dp(220, 320), 440);
        assert_eq!(px_from_dp(108, 240), 162);
        assert_eq!(px_from_dp(220, 420), 578);
    }

    #[test]
    fn lifecycle_round_trips_unknown_states() {
        assert_eq!(ActivityLifecycle::parse("RESUMED"), ActivityLifecycle::Resumed);
        let odd = ActivityLifecycle::parse("STOPPING");
        assert_eq!(odd, ActivityLifecycle::Other("STOPPING".to_string()));
        assert_eq!(odd.to_string(), "STOPPING");
    }

    #[test]
    fn component_names_expand_short_activity_names() {
        assert_eq!(activity_component_name("com.app", "Main"), "com.app/.Main");
        assert_eq!(
            activity_component_name("com.app", "com.other.Main"),
            "com.app/com.other.Main"
        );
        assert_eq!(window_name("com.app", "Main"), "com.app/com.app.Main");
        assert_eq!(window_name("com.app", "x.Main"), "com.app/x.Main");
    }

    #[test]
    fn wait_target_expands_both_names() {
        let target = WaitTarget::component("com.app", "Main");
        assert_eq!(target.activity, "com.app/.Main");
        assert_eq!(target.window, "com.app/com.app.Main");

        let named = WaitTarget::named("app/.Main");
        assert_eq!(named.activity, "app/.Main");
        assert_eq!(named.window, "app/app.Main");
        assert_eq!(named.with_window("Popup").window, "Popup");
    }

    #[test]
    fn window_name_for_component_qualifies_dot_prefix() {
        assert_eq!(window_name_for_component("app/.Main"), "app/app.Main");
        assert_eq!(window_name_for_component("app/app.Main"), "app/app.Main");
        assert_eq!(window_name_for_component("plain"), "plain");
    }
}
