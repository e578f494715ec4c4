//! Compiled regex patterns for parsing scheduler and compositor dumps.
//!
//! Every pattern is anchored on both ends: a line matches only if the whole
//! trimmed line has the expected shape. Patterns are compiled once on first
//! use. Update these when the upstream dump format changes.

use once_cell::sync::Lazy;
use regex::Regex;

const RECT: &str = r"\[(-?\d+),(-?\d+)\]\[(-?\d+),(-?\d+)\]";

fn anchored(body: &str) -> Regex {
    Regex::new(&format!("^{}$", body)).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Scheduler: Global Scope
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_AM_DISPLAY_ID: Lazy<Regex> = Lazy::new(|| anchored(r"Display #(\d+).*"));
pub static RE_AM_STACK_ID: Lazy<Regex> = Lazy::new(|| anchored(r"Stack #(\d+):"));
pub static RE_AM_FOCUSED_ACTIVITY: Lazy<Regex> =
    Lazy::new(|| anchored(r"ResumedActivity: ActivityRecord\{(.+) u(\d+) (\S+) (\S+)\}"));
pub static RE_AM_FOCUSED_STACK: Lazy<Regex> =
    Lazy::new(|| anchored(r"mFocusedStack=ActivityStack\{(.+) stackId=(\d+), (.+)\}(.+)"));

// ═══════════════════════════════════════════════════════════════════════════════
// Scheduler: Containers
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_AM_FULLSCREEN: Lazy<Regex> = Lazy::new(|| anchored(r"mFullscreen=(\S+)"));
pub static RE_AM_BOUNDS: Lazy<Regex> =
    Lazy::new(|| anchored(r"mBounds=Rect\((-?\d+), (-?\d+) - (-?\d+), (-?\d+)\)"));
pub static RE_AM_MIN_WIDTH: Lazy<Regex> = Lazy::new(|| anchored(r"mMinWidth=(\d+)"));
pub static RE_AM_MIN_HEIGHT: Lazy<Regex> = Lazy::new(|| anchored(r"mMinHeight=(\d+)"));

pub static RE_AM_TASK_ID: Lazy<Regex> = Lazy::new(|| anchored(r"Task id #(\d+)"));
pub static RE_AM_STACK_RESUMED: Lazy<Regex> =
    Lazy::new(|| anchored(r"mResumedActivity: ActivityRecord\{(.+) u(\d+) (\S+) (\S+)\}"));
pub static RE_AM_SLEEPING: Lazy<Regex> = Lazy::new(|| anchored(r"isSleeping=(\S+)"));

pub static RE_AM_TASK_RECORD: Lazy<Regex> = Lazy::new(|| {
    anchored(r"\* TaskRecord\{(\S+) #(\d+) (\S+)=(\S+) U=(\d+) StackId=(\d+) sz=(\d+)\}")
});
pub static RE_AM_LAST_NON_FULLSCREEN_BOUNDS: Lazy<Regex> = Lazy::new(|| {
    anchored(r"mLastNonFullscreenBounds=Rect\((-?\d+), (-?\d+) - (-?\d+), (-?\d+)\)")
});
pub static RE_AM_ORIG_ACTIVITY: Lazy<Regex> = Lazy::new(|| anchored(r"origActivity=(\S+)"));
pub static RE_AM_REAL_ACTIVITY: Lazy<Regex> = Lazy::new(|| anchored(r"realActivity=(\S+)"));
pub static RE_AM_TASK_TYPE: Lazy<Regex> = Lazy::new(|| {
    anchored(
        r"autoRemoveRecents=(\S+) isPersistable=(\S+) numFullscreen=(\d+) taskType=(\d+) mTaskToReturnTo=(\d+)",
    )
});
pub static RE_AM_RESIZE_MODE: Lazy<Regex> = Lazy::new(|| anchored(r".*mResizeMode=(\S+).*"));

// ═══════════════════════════════════════════════════════════════════════════════
// Scheduler: Activity Records
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_AM_ACTIVITY: Lazy<Regex> =
    Lazy::new(|| anchored(r"\* Hist #(\d+): ActivityRecord\{(\S+) u(\d+) (\S+) t(\d+)\}"));
pub static RE_AM_ACTIVITY_STATE: Lazy<Regex> = Lazy::new(|| anchored(r"state=(\S+).*"));
pub static RE_AM_ACTIVITY_VISIBILITY: Lazy<Regex> = Lazy::new(|| {
    anchored(
        r"keysPaused=(\S+) inHistory=(\S+) visible=(\S+) sleeping=(\S+) idle=(\S+) mStartingWindowState=(\S+)",
    )
});
pub static RE_AM_FRONT_OF_TASK: Lazy<Regex> = Lazy::new(|| {
    anchored(r"frontOfTask=(\S+) task=TaskRecord\{(\S+) #(\d+) A=(\S+) U=(\d+) StackId=(\d+) sz=(\d+)\}")
});
pub static RE_AM_PROCESS_RECORD: Lazy<Regex> =
    Lazy::new(|| anchored(r"app=ProcessRecord\{(\S+) (\d+):(\S+)/(.+)\}"));

// ═══════════════════════════════════════════════════════════════════════════════
// Scheduler: Keyguard
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_KEYGUARD_CONTROLLER: Lazy<Regex> = Lazy::new(|| anchored(r"KeyguardController:"));
pub static RE_KEYGUARD_SHOWING: Lazy<Regex> = Lazy::new(|| anchored(r"mKeyguardShowing=(\S+)"));
pub static RE_KEYGUARD_OCCLUDED: Lazy<Regex> = Lazy::new(|| anchored(r"mOccluded=(\S+)"));

// ═══════════════════════════════════════════════════════════════════════════════
// Compositor: Window Headers
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_WM_WINDOW: Lazy<Regex> =
    Lazy::new(|| anchored(r"Window #(\d+) Window\{([0-9a-fA-F]+) u(\d+) (.+)\}:"));
pub static RE_WM_STARTING_WINDOW: Lazy<Regex> =
    Lazy::new(|| anchored(r"Window #(\d+) Window\{([0-9a-fA-F]+) u(\d+) Starting (.+)\}:"));
pub static RE_WM_EXITING_WINDOW: Lazy<Regex> =
    Lazy::new(|| anchored(r"Window #(\d+) Window\{([0-9a-fA-F]+) u(\d+) (.+) EXITING\}:"));
pub static RE_WM_DEBUGGER_WINDOW: Lazy<Regex> = Lazy::new(|| {
    anchored(r"Window #(\d+) Window\{([0-9a-fA-F]+) u(\d+) Waiting For Debugger: (.+)\}:")
});

// ═══════════════════════════════════════════════════════════════════════════════
// Compositor: Global Scope
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_WM_FOCUSED_WINDOW: Lazy<Regex> =
    Lazy::new(|| anchored(r"mCurrentFocus=Window\{([0-9a-fA-F]+) u(\d+) (\S+)\}"));
pub static RE_WM_APP_ERROR_FOCUSED_WINDOW: Lazy<Regex> = Lazy::new(|| {
    anchored(r"mCurrentFocus=Window\{([0-9a-fA-F]+) u(\d+) Application Error: (\S+)\}")
});
pub static RE_WM_DEBUGGER_FOCUSED_WINDOW: Lazy<Regex> = Lazy::new(|| {
    anchored(r"mCurrentFocus=Window\{([0-9a-fA-F]+) u(\d+) Waiting For Debugger: (\S+)\}")
});
pub static RE_WM_FOCUSED_APP: Lazy<Regex> = Lazy::new(|| {
    anchored(r"mFocusedApp=AppWindowToken\{(.+) token=Token\{(.+) ActivityRecord\{(.+) u(\d+) (\S+) (\S+)")
});
pub static RE_WM_STABLE_BOUNDS: Lazy<Regex> =
    Lazy::new(|| anchored(r"mStable=\((\d+),(\d+)\)-\((\d+),(\d+)\)"));
pub static RE_WM_DEFAULT_PINNED_BOUNDS: Lazy<Regex> =
    Lazy::new(|| anchored(r"defaultBounds=\[(\d+),(\d+)\]\[(\d+),(\d+)\]"));
pub static RE_WM_PINNED_MOVEMENT_BOUNDS: Lazy<Regex> =
    Lazy::new(|| anchored(r"movementBounds=\[(\d+),(\d+)\]\[(\d+),(\d+)\]"));
pub static RE_WM_ROTATION: Lazy<Regex> = Lazy::new(|| anchored(r"mRotation=(\d).*"));
pub static RE_WM_LAST_ORIENTATION: Lazy<Regex> =
    Lazy::new(|| anchored(r".*mLastOrientation=(\d)"));
pub static RE_WM_LAST_TRANSITION: Lazy<Regex> =
    Lazy::new(|| anchored(r"mLastUsedAppTransition=(.+)"));
pub static RE_WM_TRANSITION_STATE: Lazy<Regex> =
    Lazy::new(|| anchored(r"mAppTransitionState=(.+)"));
pub static RE_WM_INPUT_METHOD_WINDOW: Lazy<Regex> =
    Lazy::new(|| anchored(r"mInputMethodWindow=Window\{([0-9a-fA-F]+) u\d+ .+\}.*"));
pub static RE_WM_DISPLAY_FROZEN: Lazy<Regex> =
    Lazy::new(|| anchored(r"mDisplayFrozen=([a-z]*) .*"));
pub static RE_WM_DOCKED_MINIMIZED: Lazy<Regex> =
    Lazy::new(|| anchored(r"mMinimizedDock=([a-z]*)"));

// ═══════════════════════════════════════════════════════════════════════════════
// Compositor: Containers
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_WM_DISPLAY_ID: Lazy<Regex> = Lazy::new(|| anchored(r"Display: mDisplayId=(\d+)"));
pub static RE_WM_DISPLAY_INFO: Lazy<Regex> =
    Lazy::new(|| anchored(r"(.+) (\d+)dpi cur=(\d+)x(\d+) app=(\d+)x(\d+) (.+)"));
pub static RE_WM_STACK_ID: Lazy<Regex> = Lazy::new(|| anchored(r"mStackId=(\d+)"));
pub static RE_WM_TASK_ID: Lazy<Regex> = Lazy::new(|| anchored(r"taskId=(\d+)"));
pub static RE_WM_ANIMATION_BACKGROUND: Lazy<Regex> =
    Lazy::new(|| anchored(r"mWindowAnimationBackgroundSurface:"));
pub static RE_WM_FILLS_PARENT: Lazy<Regex> = Lazy::new(|| anchored(r"mFillsParent=(\S+)"));
pub static RE_WM_BOUNDS: Lazy<Regex> = Lazy::new(|| anchored(&format!("mBounds={}", RECT)));
pub static RE_WM_TEMP_INSET_BOUNDS: Lazy<Regex> =
    Lazy::new(|| anchored(&format!("mTempInsetBounds={}", RECT)));
pub static RE_WM_APP_TOKEN: Lazy<Regex> = Lazy::new(|| {
    anchored(
        r"Activity #(\d+) AppWindowToken\{(\S+) token=Token\{(\S+) ActivityRecord\{(\S+) u(\d+) (\S+) t(\d+)\}\}\}",
    )
});

// ═══════════════════════════════════════════════════════════════════════════════
// Compositor: Window Fields
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_WM_WINDOW_ASSOCIATION: Lazy<Regex> =
    Lazy::new(|| anchored(r"mDisplayId=(\d+) stackId=(\d+) (.+)"));
pub static RE_WM_MAIN_FRAME: Lazy<Regex> = Lazy::new(|| anchored(&format!("mFrame={}.+", RECT)));
pub static RE_WM_FRAMES: Lazy<Regex> =
    Lazy::new(|| anchored(&format!("Frames: containing={} parent={}", RECT, RECT)));
pub static RE_WM_CONTENT_FRAME: Lazy<Regex> =
    Lazy::new(|| anchored(&format!("content={} .+", RECT)));
pub static RE_WM_SURFACE_INSETS: Lazy<Regex> =
    Lazy::new(|| anchored(&format!("Cur insets.+surface={}.+", RECT)));
pub static RE_WM_CONTENT_INSETS: Lazy<Regex> =
    Lazy::new(|| anchored(&format!("Cur insets.+content={}.+", RECT)));
pub static RE_WM_GIVEN_CONTENT_INSETS: Lazy<Regex> =
    Lazy::new(|| anchored(&format!("mGivenContentInsets={}.+", RECT)));
pub static RE_WM_CROP: Lazy<Regex> = Lazy::new(|| anchored(&format!(".+mLastClipRect={}.*", RECT)));
pub static RE_WM_SURFACE: Lazy<Regex> = Lazy::new(|| {
    anchored(
        r"Surface: shown=(\S+) layer=(\d+) alpha=[\d.]+ rect=\([\d.-]+,[\d.-]+\) [\d.]+ x [\d.]+.*",
    )
});
pub static RE_WM_ATTRS: Lazy<Regex> = Lazy::new(|| anchored(r"mAttrs=WM\.LayoutParams\{.*ty=(\d+).*\}"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_match_whole_lines_only() {
        assert!(RE_AM_STACK_ID.is_match("Stack #1:"));
        assert!(!RE_AM_STACK_ID.is_match("Stack #1: extra"));
        assert!(!RE_AM_FOCUSED_ACTIVITY
            .is_match("mResumedActivity: ActivityRecord{a1 u0 app/.Main t10}"));
        assert!(RE_AM_STACK_RESUMED.is_match("mResumedActivity: ActivityRecord{a1 u0 app/.Main t10}"));
    }

    #[test]
    fn focused_app_captures_component() {
        let caps = RE_WM_FOCUSED_APP
            .captures("mFocusedApp=AppWindowToken{8a2d token=Token{3f1 ActivityRecord{d0 u0 app/.Main t10}}}")
            .unwrap();
        assert_eq!(&caps[5], "app/.Main");
    }

    #[test]
    fn window_header_variants_are_distinguishable() {
        let starting = "Window #3 Window{1a2b u0 Starting app/.Main}:";
        let exiting = "Window #3 Window{1a2b u0 app/.Main EXITING}:";
        let debugger = "Window #3 Window{1a2b u0 Waiting For Debugger: app/.Main}:";
        for line in [starting, exiting, debugger] {
            assert!(RE_WM_WINDOW.is_match(line));
        }
        assert!(RE_WM_STARTING_WINDOW.is_match(starting));
        assert!(!RE_WM_STARTING_WINDOW.is_match(exiting));
        assert!(RE_WM_EXITING_WINDOW.is_match(exiting));
        assert!(RE_WM_DEBUGGER_WINDOW.is_match(debugger));
    }

    #[test]
    fn min_size_patterns_ignore_unset_values() {
        assert!(RE_AM_MIN_WIDTH.is_match("mMinWidth=300"));
        assert!(!RE_AM_MIN_WIDTH.is_match("mMinWidth=-1"));
    }
}
