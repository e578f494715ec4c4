//! Window compositor model: displays, stacks → tasks, and the flat window list.
//!
//! Built from `dumpsys window -a` output. The stack hierarchy and the window
//! list are separate sections of that dump; windows point back at their stack
//! through the association line, and tasks list the activity tokens they host.

use regex::{Captures, Regex};
use serde::Serialize;

use crate::geometry::Rect;
use crate::parser::{
    capture_i32, capture_rect, capture_str, match_rect, parse_flag, parse_record, ExitSet,
    LineCursor, LineOutcome, Record,
};
use crate::patterns::*;
use crate::types::{window_name_for_component, WindowKind, DEFAULT_DISPLAY_ID};

/// Handles `mFillsParent=` and `mBounds=` for stacks and tasks.
fn extract_fill(line: &str, fullscreen: &mut bool, bounds: &mut Option<Rect>) -> bool {
    if let Some(captures) = RE_WM_FILLS_PARENT.captures(line) {
        *fullscreen = parse_flag(&captures[1]);
        return true;
    }
    if let Some(rect) = match_rect(&RE_WM_BOUNDS, line) {
        *bounds = Some(rect);
        return true;
    }
    false
}

// ═══════════════════════════════════════════════════════════════════════════════
// Display
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Display {
    pub display_id: i32,
    pub dpi: i32,
    pub display_rect: Rect,
    pub app_rect: Rect,
}

impl Record for Display {
    type Context = ();

    fn header() -> &'static Regex {
        &RE_WM_DISPLAY_ID
    }

    fn open(_line: &str, header: &Captures<'_>, _context: ()) -> Self {
        Self {
            display_id: capture_i32(header, 1).unwrap_or(DEFAULT_DISPLAY_ID),
            dpi: 0,
            display_rect: Rect::default(),
            app_rect: Rect::default(),
        }
    }

    fn apply_line(&mut self, line: &str) -> LineOutcome {
        let Some(captures) = RE_WM_DISPLAY_INFO.captures(line) else {
            return LineOutcome::Dropped;
        };
        let size = |first: usize| -> Option<Rect> {
            Some(Rect::sized(
                capture_i32(&captures, first)?,
                capture_i32(&captures, first + 1)?,
            ))
        };
        self.dpi = capture_i32(&captures, 2).unwrap_or(0);
        self.display_rect = size(3).unwrap_or_default();
        self.app_rect = size(5).unwrap_or_default();
        tracing::debug!(
            display_id = self.display_id,
            dpi = self.dpi,
            display_rect = %self.display_rect,
            "display info"
        );
        // Nothing after the info line is modelled.
        LineOutcome::Finish
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Stacks and Tasks
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowTask {
    pub task_id: i32,
    pub fullscreen: bool,
    pub bounds: Option<Rect>,
    pub temp_inset_bounds: Option<Rect>,
    /// Activity component names hosted by this task, top to bottom.
    pub app_tokens: Vec<String>,
}

impl WindowTask {
    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }
}

impl Record for WindowTask {
    type Context = ();

    fn header() -> &'static Regex {
        &RE_WM_TASK_ID
    }

    fn open(_line: &str, header: &Captures<'_>, _context: ()) -> Self {
        let task_id = capture_i32(header, 1).unwrap_or(-1);
        tracing::debug!(task_id, "compositor task");
        Self {
            task_id,
            fullscreen: false,
            bounds: None,
            temp_inset_bounds: None,
            app_tokens: Vec::new(),
        }
    }

    fn apply_line(&mut self, line: &str) -> LineOutcome {
        if extract_fill(line, &mut self.fullscreen, &mut self.bounds) {
            return LineOutcome::Consumed;
        }
        if let Some(rect) = match_rect(&RE_WM_TEMP_INSET_BOUNDS, line) {
            self.temp_inset_bounds = Some(rect);
            return LineOutcome::Consumed;
        }
        if let Some(token) = RE_WM_APP_TOKEN
            .captures(line)
            .and_then(|captures| capture_str(&captures, 6))
        {
            self.app_tokens.push(token);
            return LineOutcome::Consumed;
        }
        LineOutcome::Dropped
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowStack {
    pub stack_id: i32,
    pub display_id: i32,
    pub fullscreen: bool,
    pub bounds: Option<Rect>,
    pub animation_background_showing: bool,
    pub tasks: Vec<WindowTask>,
}

impl WindowStack {
    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn task(&self, task_id: i32) -> Option<&WindowTask> {
        self.tasks.iter().find(|task| task.task_id == task_id)
    }
}

impl Record for WindowStack {
    type Context = i32;

    fn header() -> &'static Regex {
        &RE_WM_STACK_ID
    }

    fn child_terminators() -> Vec<&'static Regex> {
        vec![&RE_WM_TASK_ID, &RE_WM_ANIMATION_BACKGROUND]
    }

    fn open(_line: &str, header: &Captures<'_>, display_id: i32) -> Self {
        let stack_id = capture_i32(header, 1).unwrap_or(-1);
        tracing::debug!(stack_id, display_id, "compositor stack");
        Self {
            stack_id,
            display_id,
            fullscreen: false,
            bounds: None,
            animation_background_showing: false,
            tasks: Vec::new(),
        }
    }

    fn parse_child(&mut self, cursor: &mut LineCursor<'_>, child_exits: &ExitSet) -> bool {
        match parse_record::<WindowTask>(cursor, child_exits, ()) {
            Some(task) => {
                self.tasks.push(task);
                true
            }
            None => false,
        }
    }

    fn apply_line(&mut self, line: &str) -> LineOutcome {
        if extract_fill(line, &mut self.fullscreen, &mut self.bounds) {
            return LineOutcome::Consumed;
        }
        if RE_WM_ANIMATION_BACKGROUND.is_match(line) {
            self.animation_background_showing = true;
            return LineOutcome::Consumed;
        }
        LineOutcome::Dropped
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Windows
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowRecord {
    pub name: String,
    pub token: String,
    pub kind: WindowKind,
    /// Layout-params window type.
    pub window_type: i32,
    pub display_id: i32,
    pub stack_id: Option<i32>,
    pub layer: i32,
    pub shown: bool,
    pub frame: Option<Rect>,
    pub containing_frame: Option<Rect>,
    pub parent_frame: Option<Rect>,
    pub content_frame: Option<Rect>,
    pub surface_insets: Option<Rect>,
    pub content_insets: Option<Rect>,
    pub given_content_insets: Option<Rect>,
    pub crop: Option<Rect>,
}

impl WindowRecord {
    pub fn classify(line: &str) -> Option<(WindowKind, Captures<'_>)> {
        let generic = RE_WM_WINDOW.captures(line)?;
        let special = [
            (WindowKind::Starting, &*RE_WM_STARTING_WINDOW),
            (WindowKind::Exiting, &*RE_WM_EXITING_WINDOW),
            (WindowKind::Debugger, &*RE_WM_DEBUGGER_WINDOW),
        ];
        for (kind, pattern) in special {
            if let Some(captures) = pattern.captures(line) {
                return Some((kind, captures));
            }
        }
        Some((WindowKind::Normal, generic))
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

impl Record for WindowRecord {
    type Context = ();

    fn header() -> &'static Regex {
        &RE_WM_WINDOW
    }

    fn open(line: &str, header: &Captures<'_>, _context: ()) -> Self {
        let (kind, name, token) = match Self::classify(line) {
            Some((kind, captures)) => (kind, capture_str(&captures, 4), capture_str(&captures, 2)),
            None => (WindowKind::Normal, capture_str(header, 4), capture_str(header, 2)),
        };
        let name = name.unwrap_or_default();
        tracing::debug!(window = %name, ?kind, "window record");
        Self {
            name,
            token: token.unwrap_or_default(),
            kind,
            window_type: 0,
            display_id: DEFAULT_DISPLAY_ID,
            stack_id: None,
            layer: 0,
            shown: false,
            frame: None,
            containing_frame: None,
            parent_frame: None,
            content_frame: None,
            surface_insets: None,
            content_insets: None,
            given_content_insets: None,
            crop: None,
        }
    }

    fn apply_line(&mut self, line: &str) -> LineOutcome {
        if let Some(captures) = RE_WM_WINDOW_ASSOCIATION.captures(line) {
            self.display_id = capture_i32(&captures, 1).unwrap_or(DEFAULT_DISPLAY_ID);
            self.stack_id = capture_i32(&captures, 2);
            return LineOutcome::Consumed;
        }
        if let Some(rect) = match_rect(&RE_WM_MAIN_FRAME, line) {
            self.frame = Some(rect);
            return LineOutcome::Consumed;
        }
        if let Some(captures) = RE_WM_FRAMES.captures(line) {
            self.containing_frame = capture_rect(&captures, 1);
            self.parent_frame = capture_rect(&captures, 5);
            return LineOutcome::Consumed;
        }

        // The remaining fields can share one physical line.
        let mut matched = false;
        if let Some(rect) = match_rect(&RE_WM_CONTENT_FRAME, line) {
            self.content_frame = Some(rect);
            matched = true;
        }
        if let Some(rect) = match_rect(&RE_WM_SURFACE_INSETS, line) {
            self.surface_insets = Some(rect);
            matched = true;
        }
        if let Some(rect) = match_rect(&RE_WM_CONTENT_INSETS, line) {
            self.content_insets = Some(rect);
            matched = true;
        }
        if let Some(rect) = match_rect(&RE_WM_CROP, line) {
            self.crop = Some(rect);
            matched = true;
        }
        if let Some(captures) = RE_WM_SURFACE.captures(line) {
            self.shown = parse_flag(&captures[1]);
            self.layer = capture_i32(&captures, 2).unwrap_or(self.layer);
            matched = true;
        }
        if let Some(window_type) = RE_WM_ATTRS
            .captures(line)
            .and_then(|captures| capture_i32(&captures, 1))
        {
            self.window_type = window_type;
            matched = true;
        }
        if let Some(rect) = match_rect(&RE_WM_GIVEN_CONTENT_INSETS, line) {
            self.given_content_insets = Some(rect);
            matched = true;
        }
        LineOutcome::from_matched(matched)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Compositor State
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CompositorState {
    /// Windows in z-order, front first.
    pub windows: Vec<WindowRecord>,
    /// Stacks in z-order, front first, display by display.
    pub stacks: Vec<WindowStack>,
    pub displays: Vec<Display>,
    pub focused_window: Option<String>,
    pub focused_app: Option<String>,
    pub last_transition: Option<String>,
    pub app_transition_state: Option<String>,
    pub input_method_window_token: Option<String>,
    pub stable_bounds: Option<Rect>,
    pub default_pinned_stack_bounds: Option<Rect>,
    pub pinned_stack_movement_bounds: Option<Rect>,
    pub rotation: i32,
    pub last_orientation: i32,
    pub display_frozen: bool,
    pub docked_stack_minimized: bool,
    /// False when a starting or exiting window cut the parse short.
    pub complete: bool,
    #[serde(skip)]
    pub dropped_lines: usize,
}

impl CompositorState {
    /// Parses one `dumpsys window -a` dump.
    ///
    /// A starting or exiting window means a transition is mid-flight: parsing
    /// stops at that window and the result is marked incomplete.
    pub fn parse(dump: &str) -> Self {
        let mut state = Self {
            complete: true,
            ..Self::default()
        };
        let mut cursor = LineCursor::new(dump);
        let exits = ExitSet::new(&[
            &RE_WM_STACK_ID,
            &RE_WM_WINDOW,
            &RE_WM_STARTING_WINDOW,
            &RE_WM_EXITING_WINDOW,
            &RE_WM_DEBUGGER_WINDOW,
            &RE_WM_FOCUSED_WINDOW,
            &RE_WM_APP_ERROR_FOCUSED_WINDOW,
            &RE_WM_DEBUGGER_FOCUSED_WINDOW,
            &RE_WM_FOCUSED_APP,
            &RE_WM_LAST_TRANSITION,
            &RE_WM_DEFAULT_PINNED_BOUNDS,
            &RE_WM_PINNED_MOVEMENT_BOUNDS,
            &RE_WM_DISPLAY_ID,
            &RE_WM_DOCKED_MINIMIZED,
        ]);
        let mut display_id = DEFAULT_DISPLAY_ID;

        while !cursor.is_empty() {
            if let Some(display) = parse_record::<Display>(&mut cursor, &exits, ()) {
                display_id = display.display_id;
                state.displays.push(display);
                continue;
            }

            if let Some(stack) = parse_record::<WindowStack>(&mut cursor, &exits, display_id) {
                state.stacks.push(stack);
                continue;
            }

            if let Some(window) = parse_record::<WindowRecord>(&mut cursor, &exits, ()) {
                if window.is_transient() {
                    tracing::debug!(
                        window = %window.name,
                        kind = ?window.kind,
                        "transition in flight, abandoning compositor dump"
                    );
                    state.complete = false;
                    state.dropped_lines = cursor.dropped();
                    return state;
                }
                state.windows.push(window);
                continue;
            }

            let Some(line) = cursor.advance() else {
                break;
            };
            if !state.apply_global(line) && !line.is_empty() {
                cursor.note_dropped();
            }
        }

        state.dropped_lines = cursor.dropped();
        state
    }

    fn apply_global(&mut self, line: &str) -> bool {
        for pattern in [
            &*RE_WM_FOCUSED_WINDOW,
            &*RE_WM_APP_ERROR_FOCUSED_WINDOW,
            &*RE_WM_DEBUGGER_FOCUSED_WINDOW,
        ] {
            if let Some(captures) = pattern.captures(line) {
                self.focused_window = capture_str(&captures, 3);
                tracing::debug!(focused_window = ?self.focused_window, "focused window");
                return true;
            }
        }
        if let Some(captures) = RE_WM_FOCUSED_APP.captures(line) {
            self.focused_app = capture_str(&captures, 5);
            tracing::debug!(focused_app = ?self.focused_app, "focused app");
            return true;
        }
        if let Some(captures) = RE_WM_TRANSITION_STATE.captures(line) {
            self.app_transition_state = capture_str(&captures, 1);
            return true;
        }
        if let Some(captures) = RE_WM_LAST_TRANSITION.captures(line) {
            self.last_transition = capture_str(&captures, 1);
            return true;
        }
        if let Some(rect) = match_rect(&RE_WM_STABLE_BOUNDS, line) {
            self.stable_bounds = Some(rect);
            return true;
        }
        if let Some(rect) = match_rect(&RE_WM_DEFAULT_PINNED_BOUNDS, line) {
            self.default_pinned_stack_bounds = Some(rect);
            return true;
        }
        if let Some(rect) = match_rect(&RE_WM_PINNED_MOVEMENT_BOUNDS, line) {
            self.pinned_stack_movement_bounds = Some(rect);
            return true;
        }
        if let Some(captures) = RE_WM_INPUT_METHOD_WINDOW.captures(line) {
            self.input_method_window_token = capture_str(&captures, 1);
            return true;
        }
        if let Some(rotation) = RE_WM_ROTATION
            .captures(line)
            .and_then(|captures| capture_i32(&captures, 1))
        {
            self.rotation = rotation;
            return true;
        }
        if let Some(orientation) = RE_WM_LAST_ORIENTATION
            .captures(line)
            .and_then(|captures| capture_i32(&captures, 1))
        {
            self.last_orientation = orientation;
            return true;
        }
        if let Some(captures) = RE_WM_DISPLAY_FROZEN.captures(line) {
            self.display_frozen = parse_flag(&captures[1]);
            return true;
        }
        if let Some(captures) = RE_WM_DOCKED_MINIMIZED.captures(line) {
            self.docked_stack_minimized = parse_flag(&captures[1]);
            return true;
        }
        false
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// True when the snapshot should be fetched again before use.
    pub fn needs_retry(&self) -> bool {
        !self.complete || self.windows.is_empty() || self.focused_app.is_none()
    }

    pub fn dropped_lines(&self) -> usize {
        self.dropped_lines
    }

    // ─────────────────────────────────────────────────────────────────────
    // Stacks and Displays
    // ─────────────────────────────────────────────────────────────────────

    pub fn stacks(&self) -> &[WindowStack] {
        &self.stacks
    }

    pub fn stack(&self, stack_id: i32) -> Option<&WindowStack> {
        self.stacks.iter().find(|stack| stack.stack_id == stack_id)
    }

    pub fn contains_stack(&self, stack_id: i32) -> bool {
        self.stack(stack_id).is_some()
    }

    pub fn stack_position(&self, stack_id: i32) -> Option<usize> {
        self.stacks.iter().position(|stack| stack.stack_id == stack_id)
    }

    pub fn front_stack_id(&self, display_id: i32) -> Option<i32> {
        self.stacks
            .iter()
            .find(|stack| stack.display_id == display_id)
            .map(|stack| stack.stack_id)
    }

    pub fn display(&self, display_id: i32) -> Option<&Display> {
        self.displays
            .iter()
            .find(|display| display.display_id == display_id)
    }

    pub fn stable_bounds(&self) -> Option<Rect> {
        self.stable_bounds
    }

    pub fn default_pinned_stack_bounds(&self) -> Option<Rect> {
        self.default_pinned_stack_bounds
    }

    pub fn pinned_stack_movement_bounds(&self) -> Option<Rect> {
        self.pinned_stack_movement_bounds
    }

    pub fn rotation(&self) -> i32 {
        self.rotation
    }

    pub fn last_orientation(&self) -> i32 {
        self.last_orientation
    }

    pub fn is_display_frozen(&self) -> bool {
        self.display_frozen
    }

    pub fn is_docked_stack_minimized(&self) -> bool {
        self.docked_stack_minimized
    }

    // ─────────────────────────────────────────────────────────────────────
    // Focus and Transitions
    // ─────────────────────────────────────────────────────────────────────

    pub fn focused_window(&self) -> Option<&str> {
        self.focused_window.as_deref()
    }

    pub fn focused_app(&self) -> Option<&str> {
        self.focused_app.as_deref()
    }

    pub fn last_transition(&self) -> Option<&str> {
        self.last_transition.as_deref()
    }

    pub fn app_transition_state(&self) -> Option<&str> {
        self.app_transition_state.as_deref()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Windows
    // ─────────────────────────────────────────────────────────────────────

    pub fn windows(&self) -> &[WindowRecord] {
        &self.windows
    }

    pub fn front_window(&self) -> Option<&str> {
        self.windows.first().map(|window| window.name.as_str())
    }

    pub fn contains_window(&self, name: &str) -> bool {
        self.windows.iter().any(|window| window.name == name)
    }

    /// True if at least one window with this name is shown.
    pub fn is_window_visible(&self, name: &str) -> bool {
        self.windows
            .iter()
            .any(|window| window.name == name && window.shown)
    }

    /// True if windows with this name exist and every one of them is shown.
    pub fn all_windows_visible(&self, name: &str) -> bool {
        let mut matching = self.windows.iter().filter(|window| window.name == name).peekable();
        matching.peek().is_some() && matching.all(|window| window.shown)
    }

    pub fn matching_window_tokens(&self, name: &str) -> Vec<&str> {
        self.windows
            .iter()
            .filter(|window| window.name == name)
            .map(|window| window.token.as_str())
            .collect()
    }

    pub fn matching_visible_windows(&self, name: &str) -> Vec<&WindowRecord> {
        self.windows
            .iter()
            .filter(|window| window.shown && window.name == name)
            .collect()
    }

    pub fn prefix_matching_visible_windows(&self, prefix: &str) -> Vec<&WindowRecord> {
        self.windows
            .iter()
            .filter(|window| window.shown && window.name.starts_with(prefix))
            .collect()
    }

    pub fn window_by_package_name(&self, package: &str, window_type: i32) -> Option<&WindowRecord> {
        self.windows
            .iter()
            .find(|window| window.name.contains(package) && window.window_type == window_type)
    }

    pub fn windows_by_package_name(
        &self,
        package: &str,
        restrict_to_types: Option<&[i32]>,
    ) -> Vec<&WindowRecord> {
        self.windows
            .iter()
            .filter(|window| window.name.contains(package))
            .filter(|window| restrict_to_types.map_or(true, |types| types.contains(&window.window_type)))
            .collect()
    }

    pub fn window_for_token(&self, token: &str) -> Option<&WindowRecord> {
        self.windows.iter().find(|window| window.token == token)
    }

    pub fn input_method_window(&self) -> Option<&WindowRecord> {
        self.input_method_window_token
            .as_deref()
            .and_then(|token| self.window_for_token(token))
    }

    pub fn first_window_of_type(&self, window_type: i32) -> Option<&WindowRecord> {
        self.windows
            .iter()
            .find(|window| window.window_type == window_type)
    }

    pub fn windows_in_stack(&self, stack_id: i32) -> impl Iterator<Item = &WindowRecord> {
        self.windows
            .iter()
            .filter(move |window| window.stack_id == Some(stack_id))
    }

    /// Windows belonging to the activities a task hosts.
    pub fn windows_in_task<'a>(&'a self, task: &'a WindowTask) -> impl Iterator<Item = &'a WindowRecord> {
        let names: Vec<String> = task
            .app_tokens
            .iter()
            .map(|token| window_name_for_component(token))
            .collect();
        self.windows
            .iter()
            .filter(move |window| names.iter().any(|name| *name == window.name))
    }
}

/// Orders windows by ascending surface layer.
pub fn sort_windows_by_layer(windows: &mut [&WindowRecord]) {
    windows.sort_by_key(|window| window.layer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TYPE_WALLPAPER;

    const DUMP: &str = "\
WINDOW MANAGER DISPLAY CONTENTS (dumpsys window displays)
  Display: mDisplayId=0
    init=1080x1920 420dpi cur=1080x1920 app=1080x1794 rng=1080x1017-1794x1731
    deferred=false mLayoutNeeded=false
  mStackId=1
    mDeferRemoval=false
    mFillsParent=false
    mBounds=[0,0][1080,960]
      taskId=12
        mFillsParent=false
        mBounds=[0,0][1080,960]
        mTempInsetBounds=[0,0][1080,900]
          Activity #0 AppWindowToken{c1 token=Token{c2 ActivityRecord{a1 u0 com.app/.Detail t12}}}
    mWindowAnimationBackgroundSurface:
      mDimSurface=Surface(name=x)
  mStackId=0
    mFillsParent=true
    mBounds=[0,0][1080,1920]
      taskId=2
        mFillsParent=true
WINDOW MANAGER WINDOWS (dumpsys window windows)
  Window #1 Window{7f3 u0 com.app/com.app.Detail}:
    mDisplayId=0 stackId=1 mSession=Session{1 2:u0a55} mClient=android.os.BinderProxy@1
    mAttrs=WM.LayoutParams{(0,0)(fillxfill) sim=#110 ty=1 fl=#81810100}
    mFrame=[0,0][1080,960] last=[0,0][1080,960]
    Frames: containing=[0,0][1080,960] parent=[0,0][1080,960]
    content=[0,63][1080,960] visible=[0,63][1080,960]
    Cur insets: overscan=[0,0][0,0] content=[0,63][0,0] visible=[0,63][0,0] stable=[0,63][0,0] surface=[0,0][0,0] outsets=[0,0][0,0]
    Surface: shown=true layer=21010 alpha=1.0 rect=(0.0,0.0) 1080.0 x 960.0
  Window #0 Window{9a0 u0 com.android.systemui.ImageWallpaper}:
    mDisplayId=0 stackId=0 mSession=Session{2 3:u0a20}
    mAttrs=WM.LayoutParams{(0,0)(fillxfill) ty=2013 fl=#18}
    Surface: shown=false layer=11000 alpha=1.0 rect=(0.0,0.0) 1080.0 x 1920.0
  mCurrentFocus=Window{7f3 u0 com.app/com.app.Detail}
  mFocusedApp=AppWindowToken{c1 token=Token{c2 ActivityRecord{a1 u0 com.app/.Detail t12}}}
  mInputMethodWindow=Window{9a0 u0 InputMethod}
  mStable=(0,63)-(1080,1794)
  mAppTransitionState=APP_STATE_IDLE
  mLastUsedAppTransition=TRANSIT_ACTIVITY_OPEN
  mRotation=1 mAltOrientation=false
  mLastWindowForcedOrientation=-1 mLastOrientation=1
  mDisplayFrozen=false windows=0
  mMinimizedDock=true
  defaultBounds=[816,1362][1038,1487]
  movementBounds=[42,105][1038,1752]
";

    #[test]
    fn parses_display_and_stack_hierarchy() {
        let state = CompositorState::parse(DUMP);
        assert!(state.is_complete());

        let display = state.display(0).expect("display 0");
        assert_eq!(display.dpi, 420);
        assert_eq!(display.display_rect, Rect::sized(1080, 1920));
        assert_eq!(display.app_rect, Rect::sized(1080, 1794));

        assert_eq!(state.stacks().len(), 2);
        let stack = state.stack(1).expect("stack 1");
        assert!(!stack.is_fullscreen());
        assert_eq!(stack.bounds(), Some(Rect::new(0, 0, 1080, 960)));
        assert!(stack.animation_background_showing);

        let task = stack.task(12).expect("task 12");
        assert_eq!(task.temp_inset_bounds, Some(Rect::new(0, 0, 1080, 900)));
        assert_eq!(task.app_tokens, vec!["com.app/.Detail".to_string()]);
        assert_eq!(state.front_stack_id(0), Some(1));
        assert_eq!(state.stack_position(0), Some(1));
    }

    #[test]
    fn parses_window_fields() {
        let state = CompositorState::parse(DUMP);
        assert_eq!(state.windows().len(), 2);
        let window = &state.windows()[0];
        assert_eq!(window.name, "com.app/com.app.Detail");
        assert_eq!(window.token, "7f3");
        assert_eq!(window.kind, WindowKind::Normal);
        assert_eq!(window.stack_id, Some(1));
        assert_eq!(window.window_type, 1);
        assert_eq!(window.frame, Some(Rect::new(0, 0, 1080, 960)));
        assert_eq!(window.containing_frame, Some(Rect::new(0, 0, 1080, 960)));
        assert_eq!(window.content_frame, Some(Rect::new(0, 63, 1080, 897)));
        assert_eq!(window.content_insets, Some(Rect::new(0, 63, 0, -63)));
        assert_eq!(window.surface_insets, Some(Rect::default()));
        assert!(window.shown);
        assert_eq!(window.layer, 21010);
        assert_eq!(window.crop, None);
    }

    #[test]
    fn parses_globals() {
        let state = CompositorState::parse(DUMP);
        assert_eq!(state.focused_window(), Some("com.app/com.app.Detail"));
        assert_eq!(state.focused_app(), Some("com.app/.Detail"));
        assert_eq!(state.app_transition_state(), Some("APP_STATE_IDLE"));
        assert_eq!(state.last_transition(), Some("TRANSIT_ACTIVITY_OPEN"));
        assert_eq!(state.stable_bounds(), Some(Rect::new(0, 63, 1080, 1731)));
        assert_eq!(state.rotation(), 1);
        assert_eq!(state.last_orientation(), 1);
        assert!(!state.is_display_frozen());
        assert!(state.is_docked_stack_minimized());
        assert_eq!(
            state.default_pinned_stack_bounds(),
            Some(Rect::from_ltrb(816, 1362, 1038, 1487))
        );
        assert_eq!(
            state.pinned_stack_movement_bounds(),
            Some(Rect::from_ltrb(42, 105, 1038, 1752))
        );
        assert_eq!(state.input_method_window().map(|w| w.token.as_str()), Some("9a0"));
        assert!(!state.needs_retry());
    }

    #[test]
    fn window_queries() {
        let state = CompositorState::parse(DUMP);
        assert_eq!(state.front_window(), Some("com.app/com.app.Detail"));
        assert!(state.is_window_visible("com.app/com.app.Detail"));
        assert!(state.all_windows_visible("com.app/com.app.Detail"));
        assert!(!state.all_windows_visible("missing"));
        assert_eq!(state.matching_window_tokens("com.app/com.app.Detail"), vec!["7f3"]);
        assert_eq!(state.prefix_matching_visible_windows("com.app/").len(), 1);
        assert_eq!(
            state
                .first_window_of_type(TYPE_WALLPAPER)
                .map(|w| w.name.as_str()),
            Some("com.android.systemui.ImageWallpaper")
        );
        assert!(state.window_by_package_name("com.app", TYPE_WALLPAPER).is_none());
        assert_eq!(state.windows_by_package_name("com.", Some(&[1][..])).len(), 1);
        assert_eq!(state.windows_in_stack(1).count(), 1);

        let task = state.stack(1).and_then(|s| s.task(12)).expect("task 12");
        assert_eq!(state.windows_in_task(task).count(), 1);

        let mut windows: Vec<&WindowRecord> = state.windows().iter().collect();
        sort_windows_by_layer(&mut windows);
        assert_eq!(windows[0].layer, 11000);
    }

    #[test]
    fn starting_window_aborts_parse() {
        let dump = "\
mStackId=1
mFillsParent=true
Window #2 Window{aa u0 com.app/com.app.Main}:
Surface: shown=true layer=1 alpha=1.0 rect=(0.0,0.0) 10.0 x 10.0
Window #1 Window{bb u0 Starting com.app}:
mFocusedApp=AppWindowToken{c1 token=Token{c2 ActivityRecord{a1 u0 com.app/.Main t12}}}";
        let state = CompositorState::parse(dump);
        assert!(!state.is_complete());
        assert!(state.needs_retry());
        assert_eq!(state.windows().len(), 1);
        assert_eq!(state.focused_app(), None);
    }

    #[test]
    fn exiting_window_aborts_parse() {
        let dump = "Window #0 Window{cc u0 com.app/com.app.Main EXITING}:\nmFocusedApp=x";
        let state = CompositorState::parse(dump);
        assert!(!state.is_complete());
        assert!(state.windows().is_empty());
    }

    #[test]
    fn debugger_window_is_kept() {
        let dump = "Window #0 Window{dd u0 Waiting For Debugger: com.app/com.app.Main}:\nmDisplayId=0 stackId=1 x";
        let state = CompositorState::parse(dump);
        assert!(state.is_complete());
        assert_eq!(state.windows()[0].kind, WindowKind::Debugger);
        assert_eq!(state.windows()[0].name, "com.app/com.app.Main");
    }

    #[test]
    fn parsing_is_idempotent() {
        assert_eq!(CompositorState::parse(DUMP), CompositorState::parse(DUMP));
    }
}
