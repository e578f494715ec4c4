//! Activity scheduler model: stacks → tasks → activity records.
//!
//! Built from `dumpsys activity activities` output. Every refresh builds a new
//! [`SchedulerState`]; nothing is patched in place.

use regex::{Captures, Regex};
use serde::Serialize;

use crate::geometry::Rect;
use crate::parser::{
    capture_i32, capture_rect, capture_str, parse_flag, parse_record, ContainerFields, ExitSet,
    LineCursor, LineOutcome, Record,
};
use crate::patterns::*;
use crate::types::{
    ActivityLifecycle, DEFAULT_DISPLAY_ID, HOME_ACTIVITY_TYPE, HOME_STACK_ID,
    RECENTS_ACTIVITY_TYPE, RECENTS_STACK_ID, RESIZE_MODE_RESIZEABLE,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Records
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityRecord {
    pub name: String,
    pub state: Option<ActivityLifecycle>,
    pub visible: bool,
    pub front_of_task: bool,
    pub proc_id: Option<i32>,
}

impl Record for ActivityRecord {
    type Context = ();

    fn header() -> &'static Regex {
        &RE_AM_ACTIVITY
    }

    fn open(_line: &str, header: &Captures<'_>, _context: ()) -> Self {
        let name = capture_str(header, 4).unwrap_or_default();
        tracing::debug!(activity = %name, "activity record");
        Self {
            name,
            state: None,
            visible: false,
            front_of_task: false,
            proc_id: None,
        }
    }

    fn apply_line(&mut self, line: &str) -> LineOutcome {
        // A blank line closes the record.
        if line.is_empty() {
            return LineOutcome::Finish;
        }

        if let Some(captures) = RE_AM_ACTIVITY_VISIBILITY.captures(line) {
            self.visible = parse_flag(&captures[3]);
            return LineOutcome::Consumed;
        }
        if let Some(captures) = RE_AM_ACTIVITY_STATE.captures(line) {
            self.state = Some(ActivityLifecycle::parse(&captures[1]));
            return LineOutcome::Consumed;
        }
        if let Some(captures) = RE_AM_PROCESS_RECORD.captures(line) {
            self.proc_id = capture_i32(&captures, 2);
            return LineOutcome::Consumed;
        }
        if let Some(captures) = RE_AM_FRONT_OF_TASK.captures(line) {
            self.front_of_task = parse_flag(&captures[1]);
            return LineOutcome::Consumed;
        }
        LineOutcome::Dropped
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerTask {
    pub task_id: i32,
    /// Stack id as reported by the task record line; `-1` until seen.
    pub stack_id: i32,
    #[serde(flatten)]
    pub container: ContainerFields,
    pub last_non_fullscreen_bounds: Option<Rect>,
    pub real_activity: Option<String>,
    pub orig_activity: Option<String>,
    pub task_type: i32,
    pub return_to_type: i32,
    pub resize_mode: Option<String>,
    /// Top to bottom.
    pub activities: Vec<ActivityRecord>,
}

impl ContainerTask {
    pub fn bounds(&self) -> Option<Rect> {
        self.container.bounds
    }

    pub fn is_fullscreen(&self) -> bool {
        self.container.fullscreen
    }

    pub fn min_width(&self) -> i32 {
        self.container.min_width
    }

    pub fn min_height(&self) -> i32 {
        self.container.min_height
    }

    pub fn is_resizeable(&self) -> bool {
        self.resize_mode.as_deref() == Some(RESIZE_MODE_RESIZEABLE)
    }

    pub fn contains_activity(&self, name: &str) -> bool {
        self.activities.iter().any(|activity| activity.name == name)
    }

    pub fn bottom_activity(&self) -> Option<&ActivityRecord> {
        self.activities.last()
    }
}

impl Record for ContainerTask {
    type Context = ();

    fn header() -> &'static Regex {
        &RE_AM_TASK_ID
    }

    fn child_terminators() -> Vec<&'static Regex> {
        vec![&RE_AM_ACTIVITY]
    }

    fn open(_line: &str, header: &Captures<'_>, _context: ()) -> Self {
        let task_id = capture_i32(header, 1).unwrap_or(-1);
        tracing::debug!(task_id, "scheduler task");
        Self {
            task_id,
            stack_id: -1,
            container: ContainerFields::default(),
            last_non_fullscreen_bounds: None,
            real_activity: None,
            orig_activity: None,
            task_type: -1,
            return_to_type: -1,
            resize_mode: None,
            activities: Vec::new(),
        }
    }

    fn parse_child(&mut self, cursor: &mut LineCursor<'_>, child_exits: &ExitSet) -> bool {
        match parse_record::<ActivityRecord>(cursor, child_exits, ()) {
            Some(activity) => {
                self.activities.push(activity);
                true
            }
            None => false,
        }
    }

    fn apply_line(&mut self, line: &str) -> LineOutcome {
        if self.container.extract_fullscreen(line)
            || self.container.extract_bounds(line)
            || self.container.extract_min_size(line)
        {
            return LineOutcome::Consumed;
        }

        if let Some(captures) = RE_AM_TASK_RECORD.captures(line) {
            if let Some(stack_id) = capture_i32(&captures, 6) {
                self.stack_id = stack_id;
            }
            return LineOutcome::Consumed;
        }
        if let Some(captures) = RE_AM_LAST_NON_FULLSCREEN_BOUNDS.captures(line) {
            self.last_non_fullscreen_bounds = capture_rect(&captures, 1);
            return LineOutcome::Consumed;
        }
        if let Some(captures) = RE_AM_REAL_ACTIVITY.captures(line) {
            if self.real_activity.is_none() {
                self.real_activity = capture_str(&captures, 1);
            }
            return LineOutcome::Consumed;
        }
        if let Some(captures) = RE_AM_ORIG_ACTIVITY.captures(line) {
            if self.orig_activity.is_none() {
                self.orig_activity = capture_str(&captures, 1);
            }
            return LineOutcome::Consumed;
        }
        if let Some(captures) = RE_AM_TASK_TYPE.captures(line) {
            self.task_type = capture_i32(&captures, 4).unwrap_or(-1);
            self.return_to_type = capture_i32(&captures, 5).unwrap_or(-1);
            return LineOutcome::Consumed;
        }
        if let Some(captures) = RE_AM_RESIZE_MODE.captures(line) {
            self.resize_mode = capture_str(&captures, 1);
            return LineOutcome::Consumed;
        }
        LineOutcome::Dropped
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerStack {
    pub stack_id: i32,
    pub display_id: i32,
    #[serde(flatten)]
    pub container: ContainerFields,
    pub resumed_activity: Option<String>,
    pub sleeping: Option<bool>,
    /// Top to bottom.
    pub tasks: Vec<ContainerTask>,
}

impl ContainerStack {
    pub fn bounds(&self) -> Option<Rect> {
        self.container.bounds
    }

    pub fn is_fullscreen(&self) -> bool {
        self.container.fullscreen
    }

    pub fn task(&self, task_id: i32) -> Option<&ContainerTask> {
        self.tasks.iter().find(|task| task.task_id == task_id)
    }

    pub fn top_task(&self) -> Option<&ContainerTask> {
        self.tasks.first()
    }

    pub fn bottom_task(&self) -> Option<&ContainerTask> {
        self.tasks.last()
    }
}

impl Record for ContainerStack {
    type Context = i32;

    fn header() -> &'static Regex {
        &RE_AM_STACK_ID
    }

    fn child_terminators() -> Vec<&'static Regex> {
        vec![&RE_AM_TASK_ID, &RE_AM_STACK_RESUMED]
    }

    fn open(_line: &str, header: &Captures<'_>, display_id: i32) -> Self {
        let stack_id = capture_i32(header, 1).unwrap_or(-1);
        tracing::debug!(stack_id, display_id, "scheduler stack");
        Self {
            stack_id,
            display_id,
            container: ContainerFields::default(),
            resumed_activity: None,
            sleeping: None,
            tasks: Vec::new(),
        }
    }

    fn parse_child(&mut self, cursor: &mut LineCursor<'_>, child_exits: &ExitSet) -> bool {
        match parse_record::<ContainerTask>(cursor, child_exits, ()) {
            Some(task) => {
                self.tasks.push(task);
                true
            }
            None => false,
        }
    }

    fn apply_line(&mut self, line: &str) -> LineOutcome {
        if self.container.extract_fullscreen(line) || self.container.extract_bounds(line) {
            return LineOutcome::Consumed;
        }
        if let Some(captures) = RE_AM_STACK_RESUMED.captures(line) {
            self.resumed_activity = capture_str(&captures, 3);
            tracing::debug!(stack_id = self.stack_id, resumed = ?self.resumed_activity, "stack resumed activity");
            return LineOutcome::Consumed;
        }
        if let Some(captures) = RE_AM_SLEEPING.captures(line) {
            self.sleeping = Some(&captures[1] == "true");
            return LineOutcome::Consumed;
        }
        LineOutcome::Dropped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct KeyguardControllerState {
    pub showing: bool,
    pub occluded: bool,
}

impl Record for KeyguardControllerState {
    type Context = ();

    fn header() -> &'static Regex {
        &RE_KEYGUARD_CONTROLLER
    }

    fn open(_line: &str, _header: &Captures<'_>, _context: ()) -> Self {
        Self::default()
    }

    fn apply_line(&mut self, line: &str) -> LineOutcome {
        if let Some(captures) = RE_KEYGUARD_SHOWING.captures(line) {
            self.showing = parse_flag(&captures[1]);
            return LineOutcome::Consumed;
        }
        if let Some(captures) = RE_KEYGUARD_OCCLUDED.captures(line) {
            self.occluded = parse_flag(&captures[1]);
            return LineOutcome::Consumed;
        }
        LineOutcome::Dropped
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Scheduler State
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SchedulerState {
    /// All stacks, front to back across displays.
    pub stacks: Vec<ContainerStack>,
    /// Display ids in the order their sections appeared.
    pub displays: Vec<i32>,
    pub focused_stack_id: Option<i32>,
    pub focused_activity: Option<String>,
    /// Per-stack resumed activities, in stack order.
    pub resumed_activities: Vec<String>,
    pub keyguard: Option<KeyguardControllerState>,
    #[serde(skip)]
    pub dropped_lines: usize,
}

impl SchedulerState {
    /// Parses one `dumpsys activity activities` dump. Never fails; lines the
    /// grammar does not know are counted in [`Self::dropped_lines`].
    pub fn parse(dump: &str) -> Self {
        let mut state = Self::default();
        let mut cursor = LineCursor::new(dump);
        let exits = ExitSet::new(&[
            &RE_AM_STACK_ID,
            &RE_AM_FOCUSED_ACTIVITY,
            &RE_AM_FOCUSED_STACK,
            &RE_AM_DISPLAY_ID,
        ]);
        let mut display_id = DEFAULT_DISPLAY_ID;

        while !cursor.is_empty() {
            if let Some(stack) = parse_record::<ContainerStack>(&mut cursor, &exits, display_id) {
                if !state.displays.contains(&display_id) {
                    state.displays.push(display_id);
                }
                if let Some(resumed) = &stack.resumed_activity {
                    state.resumed_activities.push(resumed.clone());
                }
                state.stacks.push(stack);
                continue;
            }

            if let Some(keyguard) =
                parse_record::<KeyguardControllerState>(&mut cursor, &exits, ())
            {
                state.keyguard = Some(keyguard);
                continue;
            }

            let Some(line) = cursor.advance() else {
                break;
            };

            if let Some(captures) = RE_AM_FOCUSED_STACK.captures(line) {
                state.focused_stack_id = capture_i32(&captures, 2);
                tracing::debug!(focused_stack_id = ?state.focused_stack_id, "focused stack");
                continue;
            }
            if let Some(captures) = RE_AM_FOCUSED_ACTIVITY.captures(line) {
                state.focused_activity = capture_str(&captures, 3);
                tracing::debug!(focused_activity = ?state.focused_activity, "focused activity");
                continue;
            }
            if let Some(id) = RE_AM_DISPLAY_ID
                .captures(line)
                .and_then(|captures| capture_i32(&captures, 1))
            {
                display_id = id;
                if !state.displays.contains(&id) {
                    state.displays.push(id);
                }
                continue;
            }
            if !line.is_empty() {
                cursor.note_dropped();
            }
        }

        state.dropped_lines = cursor.dropped();
        state
    }

    /// True when the snapshot is missing something a settled system always
    /// reports, so it should be fetched again.
    pub fn needs_retry(&self) -> bool {
        let keyguard_showing = self.keyguard_showing();
        self.stacks.is_empty()
            || self.focused_stack_id.is_none()
            || ((self.focused_activity.is_none() || self.resumed_activities.is_empty())
                && !keyguard_showing)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Stacks
    // ─────────────────────────────────────────────────────────────────────

    pub fn stacks(&self) -> &[ContainerStack] {
        &self.stacks
    }

    pub fn stack_count(&self) -> usize {
        self.stacks.len()
    }

    pub fn stack_by_id(&self, stack_id: i32) -> Option<&ContainerStack> {
        self.stacks.iter().find(|stack| stack.stack_id == stack_id)
    }

    pub fn contains_stack(&self, stack_id: i32) -> bool {
        self.stack_by_id(stack_id).is_some()
    }

    pub fn stack_position(&self, stack_id: i32) -> Option<usize> {
        self.stacks.iter().position(|stack| stack.stack_id == stack_id)
    }

    pub fn stacks_on_display(&self, display_id: i32) -> impl Iterator<Item = &ContainerStack> {
        self.stacks
            .iter()
            .filter(move |stack| stack.display_id == display_id)
    }

    pub fn front_stack_id(&self, display_id: i32) -> Option<i32> {
        self.stacks_on_display(display_id)
            .next()
            .map(|stack| stack.stack_id)
    }

    pub fn focused_stack_id(&self) -> Option<i32> {
        self.focused_stack_id
    }

    // ─────────────────────────────────────────────────────────────────────
    // Activities
    // ─────────────────────────────────────────────────────────────────────

    pub fn focused_activity(&self) -> Option<&str> {
        self.focused_activity.as_deref()
    }

    /// Resumed activity of the front-most stack that has one.
    pub fn resumed_activity(&self) -> Option<&str> {
        self.resumed_activities.first().map(String::as_str)
    }

    pub fn resumed_activities_count(&self) -> usize {
        self.resumed_activities.len()
    }

    pub fn keyguard(&self) -> Option<&KeyguardControllerState> {
        self.keyguard.as_ref()
    }

    pub fn keyguard_showing(&self) -> bool {
        self.keyguard.map(|keyguard| keyguard.showing).unwrap_or(false)
    }

    pub fn keyguard_occluded(&self) -> bool {
        self.keyguard.map(|keyguard| keyguard.occluded).unwrap_or(false)
    }

    pub fn activities(&self) -> impl Iterator<Item = &ActivityRecord> {
        self.stacks
            .iter()
            .flat_map(|stack| stack.tasks.iter())
            .flat_map(|task| task.activities.iter())
    }

    pub fn activity(&self, name: &str) -> Option<&ActivityRecord> {
        self.activities().find(|activity| activity.name == name)
    }

    pub fn contains_activity(&self, name: &str) -> bool {
        self.activity(name).is_some()
    }

    pub fn is_activity_visible(&self, name: &str) -> bool {
        self.activity(name)
            .map(|activity| activity.visible)
            .unwrap_or(false)
    }

    /// True if any activity is neither stopped nor destroyed.
    pub fn contains_started_activities(&self) -> bool {
        self.activities().any(|activity| {
            !matches!(
                activity.state,
                Some(ActivityLifecycle::Stopped) | Some(ActivityLifecycle::Destroyed)
            )
        })
    }

    pub fn has_activity_state(&self, name: &str, state: &ActivityLifecycle) -> bool {
        self.activity(name)
            .and_then(|activity| activity.state.as_ref())
            .map(|current| current == state)
            .unwrap_or(false)
    }

    pub fn activity_proc_id(&self, name: &str) -> Option<i32> {
        self.activity(name).and_then(|activity| activity.proc_id)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tasks
    // ─────────────────────────────────────────────────────────────────────

    fn task_of_type(&self, stack_id: i32, task_type: i32) -> Option<&ContainerTask> {
        self.stack_by_id(stack_id)?
            .tasks
            .iter()
            .find(|task| task.task_type == task_type)
    }

    pub fn home_task(&self) -> Option<&ContainerTask> {
        self.task_of_type(HOME_STACK_ID, HOME_ACTIVITY_TYPE)
    }

    pub fn recents_task(&self) -> Option<&ContainerTask> {
        self.task_of_type(RECENTS_STACK_ID, RECENTS_ACTIVITY_TYPE)
    }

    pub fn home_activity(&self) -> Option<&ActivityRecord> {
        self.home_task()?.bottom_activity()
    }

    pub fn recents_activity(&self) -> Option<&ActivityRecord> {
        self.recents_task()?.bottom_activity()
    }

    pub fn home_activity_name(&self) -> Option<&str> {
        self.home_activity().map(|activity| activity.name.as_str())
    }

    pub fn is_home_activity_visible(&self) -> bool {
        self.home_activity()
            .map(|activity| activity.visible)
            .unwrap_or(false)
    }

    pub fn is_recents_activity_visible(&self) -> bool {
        self.recents_activity()
            .map(|activity| activity.visible)
            .unwrap_or(false)
    }

    /// Whether the home task declares itself freely resizeable.
    pub fn is_home_stack_resizeable(&self) -> bool {
        self.home_task()
            .map(ContainerTask::is_resizeable)
            .unwrap_or(false)
    }

    /// First task holding `name`, optionally restricted to one stack.
    pub fn task_by_activity_name(&self, name: &str, stack_id: Option<i32>) -> Option<&ContainerTask> {
        self.stacks
            .iter()
            .filter(|stack| stack_id.map_or(true, |id| id == stack.stack_id))
            .flat_map(|stack| stack.tasks.iter())
            .find(|task| task.contains_activity(name))
    }

    pub fn dropped_lines(&self) -> usize {
        self.dropped_lines
    }
}
