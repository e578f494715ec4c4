//! Cross-checks a scheduler snapshot against a compositor snapshot.
//!
//! The two subsystems apply the same resize at different times and with
//! different rounding, so the bounds rules below encode the known legitimate
//! divergences case by case instead of using a tolerance.

use std::fmt;

use crate::compositor::{CompositorState, WindowStack};
use crate::config::MinSizeConfig;
use crate::geometry::Rect;
use crate::scheduler::{ContainerStack, ContainerTask, SchedulerState};
use crate::types::{WaitTarget, DOCKED_STACK_ID, FREEFORM_WORKSPACE_STACK_ID, PINNED_STACK_ID};

/// Which model a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Scheduler,
    Compositor,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Scheduler => f.write_str("scheduler"),
            Side::Compositor => f.write_str("compositor"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    X,
    Y,
    Width,
    Height,
}

impl Dimension {
    fn of(self, rect: Rect) -> i32 {
        match self {
            Dimension::X => rect.x,
            Dimension::Y => rect.y,
            Dimension::Width => rect.width,
            Dimension::Height => rect.height,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::X => f.write_str("x"),
            Dimension::Y => f.write_str("y"),
            Dimension::Width => f.write_str("width"),
            Dimension::Height => f.write_str("height"),
        }
    }
}

fn presence(present: &bool) -> &'static str {
    if *present {
        "must not be in"
    } else {
        "is missing from"
    }
}

fn task_label(task_id: &Option<i32>) -> String {
    match task_id {
        Some(id) => format!(" task {}", id),
        None => String::new(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Violations
// ═══════════════════════════════════════════════════════════════════════════════

/// One failed invariant, naming the containers involved and both values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    // ─────────────────────────────────────────────────────────────────────
    // Container Correspondence
    // ─────────────────────────────────────────────────────────────────────
    #[error("stack {stack_id} is in the {present} but missing from the {missing}")]
    MissingStack {
        stack_id: i32,
        present: Side,
        missing: Side,
    },

    #[error("stack {stack_id} task {task_id} is in the {present} but missing from the {missing}")]
    MissingTask {
        stack_id: i32,
        task_id: i32,
        present: Side,
        missing: Side,
    },

    #[error("display {display_id} not found in the compositor")]
    MissingDisplay { display_id: i32 },

    // ─────────────────────────────────────────────────────────────────────
    // Stack Geometry
    // ─────────────────────────────────────────────────────────────────────
    #[error("stack {stack_id}: fullscreen is {scheduler} in the scheduler but {compositor} in the compositor")]
    StackFullscreenMismatch {
        stack_id: i32,
        scheduler: bool,
        compositor: bool,
    },

    #[error("stack {stack_id}: fullscreen in the scheduler but reports bounds {bounds}")]
    FullscreenStackHasBounds { stack_id: i32, bounds: Rect },

    #[error("stack {stack_id}: bounds are {} in the scheduler but {} in the compositor", describe(.scheduler), describe(.compositor))]
    StackBoundsMismatch {
        stack_id: i32,
        scheduler: Option<Rect>,
        compositor: Option<Rect>,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Task Geometry
    // ─────────────────────────────────────────────────────────────────────
    #[error("stack {stack_id} task {task_id}: fullscreen is {scheduler} in the scheduler but {compositor} in the compositor")]
    TaskFullscreenMismatch {
        stack_id: i32,
        task_id: i32,
        scheduler: bool,
        compositor: bool,
    },

    #[error("stack {stack_id} task {task_id}: fullscreen in the scheduler but reports bounds {bounds}")]
    FullscreenTaskHasBounds {
        stack_id: i32,
        task_id: i32,
        bounds: Rect,
    },

    #[error("stack {stack_id} task {task_id}: bounds are {} in the scheduler but {} in the compositor", describe(.scheduler), describe(.compositor))]
    TaskBoundsMismatch {
        stack_id: i32,
        task_id: i32,
        scheduler: Option<Rect>,
        compositor: Option<Rect>,
    },

    #[error("stack {stack_id} task {task_id}: compositor task bounds {} differ from scheduler stack bounds {}", describe(.task), describe(.stack))]
    TaskStackBoundsMismatch {
        stack_id: i32,
        task_id: i32,
        stack: Option<Rect>,
        task: Option<Rect>,
    },

    #[error("stack {stack_id} task {task_id}: {dimension} expected {expected} but compositor task has {actual}")]
    TaskDimensionMismatch {
        stack_id: i32,
        task_id: i32,
        dimension: Dimension,
        expected: i32,
        actual: i32,
    },

    #[error("stack {stack_id} task {task_id}: compositor task {dimension} {task} must exceed scheduler stack {dimension} {stack}")]
    TaskNotLargerThanStack {
        stack_id: i32,
        task_id: i32,
        dimension: Dimension,
        stack: i32,
        task: i32,
    },

    #[error("stack {stack_id}{}: non-fullscreen container has no bounds in the {side}", task_label(.task_id))]
    MissingBounds {
        stack_id: i32,
        task_id: Option<i32>,
        side: Side,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Sanity
    // ─────────────────────────────────────────────────────────────────────
    #[error("scheduler reports no stacks")]
    NoStacks,

    #[error("expected exactly one resumed activity, found {count}")]
    ResumedActivityCount { count: usize },

    #[error("scheduler reports no focused activity")]
    NoFocusedActivity,

    #[error("stack {stack_id} holds task {task_id} that belongs to stack {task_stack_id}")]
    ForeignTask {
        stack_id: i32,
        task_id: i32,
        task_stack_id: i32,
    },

    #[error("compositor reports no front window")]
    NoFrontWindow,

    #[error("compositor reports no focused window")]
    NoFocusedWindow,

    #[error("compositor reports no focused app")]
    NoFocusedApp,

    #[error("compositor dump stopped at a window still starting")]
    CompositorIncomplete,

    // ─────────────────────────────────────────────────────────────────────
    // Targets
    // ─────────────────────────────────────────────────────────────────────
    #[error("window {window} is not visible in the compositor")]
    WindowNotVisible { window: String },

    #[error("activity {activity} is not visible in the scheduler")]
    ActivityNotVisible { activity: String },

    #[error("window {window} is not in stack {expected_stack}")]
    WindowInWrongStack { window: String, expected_stack: i32 },

    #[error("activities still started: {activities}")]
    StartedActivities { activities: String },

    // ─────────────────────────────────────────────────────────────────────
    // Assertions
    // ─────────────────────────────────────────────────────────────────────
    #[error("{side} {subject}: expected {expected}, found {actual}")]
    Mismatch {
        side: Side,
        subject: &'static str,
        expected: String,
        actual: String,
    },

    #[error("{side} {subject} must not be {value}")]
    UnexpectedValue {
        side: Side,
        subject: &'static str,
        value: String,
    },

    #[error("stack {stack_id} {} the {side}", presence(.present))]
    StackPresence {
        stack_id: i32,
        side: Side,
        present: bool,
    },

    #[error("stack {stack_id}: position is {} in the scheduler but {} in the compositor", describe(.scheduler), describe(.compositor))]
    StackPositionMismatch {
        stack_id: i32,
        scheduler: Option<usize>,
        compositor: Option<usize>,
    },

    #[error("no task in stack {stack_id} holds activity {activity}")]
    MissingActivityTask { stack_id: i32, activity: String },

    #[error("display {display_id}: smallest side {smallest} is below the minimum task size {required}")]
    DisplayTooSmall {
        display_id: i32,
        smallest: i32,
        required: i32,
    },
}

/// Renders an optional value the way assertion messages print it.
pub fn describe<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "none".to_string(),
    }
}

/// All violations found in one check, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViolationList(pub Vec<Violation>);

impl ViolationList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }

    pub fn push(&mut self, violation: Violation) {
        self.0.push(violation);
    }

    pub fn into_result(self) -> Result<(), ViolationList> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ViolationList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invariant violation(s)", self.0.len())?;
        for violation in &self.0 {
            write!(f, "\n  - {}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ViolationList {}

impl From<Violation> for ViolationList {
    fn from(violation: Violation) -> Self {
        ViolationList(vec![violation])
    }
}

impl<'a> IntoIterator for &'a ViolationList {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Bounds Check
// ═══════════════════════════════════════════════════════════════════════════════

/// Checks stack and task correspondence and geometry with default minimum sizes.
pub fn validate(
    scheduler: &SchedulerState,
    compositor: &CompositorState,
    compare_task_and_stack_bounds: bool,
) -> Result<(), ViolationList> {
    BoundsChecker::new(scheduler, compositor, MinSizeConfig::default())
        .check(compare_task_and_stack_bounds)
}

/// Walks every scheduler stack and task and compares it with its compositor twin.
pub struct BoundsChecker<'a> {
    scheduler: &'a SchedulerState,
    compositor: &'a CompositorState,
    min_size: MinSizeConfig,
    home_resizeable: bool,
    violations: ViolationList,
}

impl<'a> BoundsChecker<'a> {
    pub fn new(
        scheduler: &'a SchedulerState,
        compositor: &'a CompositorState,
        min_size: MinSizeConfig,
    ) -> Self {
        Self {
            scheduler,
            compositor,
            min_size,
            home_resizeable: scheduler.is_home_stack_resizeable(),
            violations: ViolationList::default(),
        }
    }

    pub fn check(mut self, compare_task_and_stack_bounds: bool) -> Result<(), ViolationList> {
        for stack in self.scheduler.stacks() {
            self.check_stack(stack, compare_task_and_stack_bounds);
        }
        self.violations.into_result()
    }

    fn report(&mut self, violation: Violation) {
        tracing::debug!(%violation, "invariant violation");
        self.violations.push(violation);
    }

    fn check_stack(&mut self, stack: &ContainerStack, compare: bool) {
        let stack_id = stack.stack_id;
        let Some(window_stack) = self.compositor.stack(stack_id) else {
            self.report(Violation::MissingStack {
                stack_id,
                present: Side::Scheduler,
                missing: Side::Compositor,
            });
            return;
        };

        if stack.is_fullscreen() != window_stack.is_fullscreen() {
            self.report(Violation::StackFullscreenMismatch {
                stack_id,
                scheduler: stack.is_fullscreen(),
                compositor: window_stack.is_fullscreen(),
            });
        }

        if stack.is_fullscreen() {
            if let Some(bounds) = stack.bounds() {
                self.report(Violation::FullscreenStackHasBounds { stack_id, bounds });
            }
        } else if stack.bounds() != window_stack.bounds() {
            self.report(Violation::StackBoundsMismatch {
                stack_id,
                scheduler: stack.bounds(),
                compositor: window_stack.bounds(),
            });
        }

        for task in &stack.tasks {
            self.check_task(stack, window_stack, task, compare);
        }
    }

    fn check_task(
        &mut self,
        stack: &ContainerStack,
        window_stack: &WindowStack,
        task: &ContainerTask,
        compare: bool,
    ) {
        let stack_id = stack.stack_id;
        let task_id = task.task_id;
        let Some(window_task) = window_stack.task(task_id) else {
            self.report(Violation::MissingTask {
                stack_id,
                task_id,
                present: Side::Scheduler,
                missing: Side::Compositor,
            });
            return;
        };

        if task.is_fullscreen() != window_task.is_fullscreen() {
            self.report(Violation::TaskFullscreenMismatch {
                stack_id,
                task_id,
                scheduler: task.is_fullscreen(),
                compositor: window_task.is_fullscreen(),
            });
        }

        if task.is_fullscreen() {
            if let Some(bounds) = task.bounds() {
                self.report(Violation::FullscreenTaskHasBounds {
                    stack_id,
                    task_id,
                    bounds,
                });
            }
            return;
        }

        let landscape = self
            .compositor
            .display(stack.display_id)
            .map(|display| display.display_rect.is_landscape())
            .unwrap_or(false);

        if !self.home_resizeable && self.compositor.is_docked_stack_minimized() && landscape {
            // A non-resizeable launcher shifts the minimized task off-screen
            // horizontally in landscape, so x is not compared.
            self.check_offscreen_minimized(stack, task, window_task.bounds());
            return;
        }

        if task.bounds() != window_task.bounds() {
            self.report(Violation::TaskBoundsMismatch {
                stack_id,
                task_id,
                scheduler: task.bounds(),
                compositor: window_task.bounds(),
            });
        }

        if compare && stack_id != FREEFORM_WORKSPACE_STACK_ID {
            self.check_min_size(stack, window_stack, task, window_task.bounds());
        }
    }

    fn check_offscreen_minimized(
        &mut self,
        stack: &ContainerStack,
        task: &ContainerTask,
        window_task_bounds: Option<Rect>,
    ) {
        let stack_id = stack.stack_id;
        let task_id = task.task_id;
        let (Some(task_bounds), Some(window_bounds), Some(stack_bounds)) =
            (task.bounds(), window_task_bounds, stack.bounds())
        else {
            self.report_missing_bounds(stack, Some(task), window_task_bounds);
            return;
        };

        for reference in [task_bounds, stack_bounds] {
            for dimension in [Dimension::Width, Dimension::Height, Dimension::Y] {
                let expected = dimension.of(reference);
                let actual = dimension.of(window_bounds);
                if expected != actual {
                    self.report(Violation::TaskDimensionMismatch {
                        stack_id,
                        task_id,
                        dimension,
                        expected,
                        actual,
                    });
                }
            }
        }
    }

    fn check_min_size(
        &mut self,
        stack: &ContainerStack,
        window_stack: &WindowStack,
        task: &ContainerTask,
        window_task_bounds: Option<Rect>,
    ) {
        let stack_id = stack.stack_id;
        let task_id = task.task_id;

        let mut min_width = task.min_width();
        let mut min_height = task.min_height();
        if min_width == -1 || min_height == -1 {
            let Some(display) = self.compositor.display(stack.display_id) else {
                self.report(Violation::MissingDisplay {
                    display_id: stack.display_id,
                });
                return;
            };
            let default_size = if stack_id == PINNED_STACK_ID {
                self.min_size.pinned_task_px(display.dpi)
            } else {
                self.min_size.resizeable_task_px(display.dpi)
            };
            if min_width == -1 {
                min_width = default_size;
            }
            if min_height == -1 {
                min_height = default_size;
            }
        }

        let (Some(stack_bounds), Some(window_bounds)) = (stack.bounds(), window_task_bounds) else {
            self.report_missing_bounds(stack, Some(task), window_task_bounds);
            return;
        };

        let fits = stack_bounds.width >= min_width && stack_bounds.height >= min_height;
        if fits || stack_id == PINNED_STACK_ID {
            if stack_bounds != window_bounds {
                self.report(Violation::TaskStackBoundsMismatch {
                    stack_id,
                    task_id,
                    stack: Some(stack_bounds),
                    task: Some(window_bounds),
                });
            }
            return;
        }

        if stack_id == DOCKED_STACK_ID
            && self.home_resizeable
            && self.compositor.is_docked_stack_minimized()
        {
            let portrait = self
                .compositor
                .display(stack.display_id)
                .map(|display| display.display_rect.is_portrait())
                .unwrap_or(false);
            let Some(window_stack_bounds) = window_stack.bounds() else {
                self.report(Violation::MissingBounds {
                    stack_id,
                    task_id: None,
                    side: Side::Compositor,
                });
                return;
            };
            // The minimized side keeps its full size; only the other axis matches.
            let (equal, larger, position) = if portrait {
                (Dimension::Width, Dimension::Height, Dimension::X)
            } else {
                (Dimension::Height, Dimension::Width, Dimension::Y)
            };
            self.expect_dimension(stack_id, task_id, equal, equal.of(stack_bounds), window_bounds);
            if larger.of(stack_bounds) >= larger.of(window_bounds) {
                self.report(Violation::TaskNotLargerThanStack {
                    stack_id,
                    task_id,
                    dimension: larger,
                    stack: larger.of(stack_bounds),
                    task: larger.of(window_bounds),
                });
            }
            self.expect_dimension(
                stack_id,
                task_id,
                position,
                position.of(window_stack_bounds),
                window_bounds,
            );
            return;
        }

        // Minimum size wins over the stack size on each axis.
        self.expect_dimension(
            stack_id,
            task_id,
            Dimension::Width,
            min_width.max(stack_bounds.width),
            window_bounds,
        );
        self.expect_dimension(
            stack_id,
            task_id,
            Dimension::Height,
            min_height.max(stack_bounds.height),
            window_bounds,
        );
    }

    fn expect_dimension(
        &mut self,
        stack_id: i32,
        task_id: i32,
        dimension: Dimension,
        expected: i32,
        bounds: Rect,
    ) {
        let actual = dimension.of(bounds);
        if expected != actual {
            self.report(Violation::TaskDimensionMismatch {
                stack_id,
                task_id,
                dimension,
                expected,
                actual,
            });
        }
    }

    fn report_missing_bounds(
        &mut self,
        stack: &ContainerStack,
        task: Option<&ContainerTask>,
        window_task_bounds: Option<Rect>,
    ) {
        let stack_id = stack.stack_id;
        let task_id = task.map(|task| task.task_id);
        if stack.bounds().is_none() {
            self.report(Violation::MissingBounds {
                stack_id,
                task_id: None,
                side: Side::Scheduler,
            });
        }
        if task.map(|task| task.bounds().is_none()).unwrap_or(false) {
            self.report(Violation::MissingBounds {
                stack_id,
                task_id,
                side: Side::Scheduler,
            });
        }
        if window_task_bounds.is_none() {
            self.report(Violation::MissingBounds {
                stack_id,
                task_id,
                side: Side::Compositor,
            });
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Convergence Checks
// ═══════════════════════════════════════════════════════════════════════════════

/// Stacks and tasks present in one model but not the other, in both directions.
pub fn correspondence_violations(
    scheduler: &SchedulerState,
    compositor: &CompositorState,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    for stack in scheduler.stacks() {
        let stack_id = stack.stack_id;
        let Some(window_stack) = compositor.stack(stack_id) else {
            violations.push(Violation::MissingStack {
                stack_id,
                present: Side::Scheduler,
                missing: Side::Compositor,
            });
            continue;
        };
        for task in stack.tasks.iter().filter(|task| window_stack.task(task.task_id).is_none()) {
            violations.push(Violation::MissingTask {
                stack_id,
                task_id: task.task_id,
                present: Side::Scheduler,
                missing: Side::Compositor,
            });
        }
        for task in window_stack.tasks.iter().filter(|task| stack.task(task.task_id).is_none()) {
            violations.push(Violation::MissingTask {
                stack_id,
                task_id: task.task_id,
                present: Side::Compositor,
                missing: Side::Scheduler,
            });
        }
    }
    for stack in compositor
        .stacks()
        .iter()
        .filter(|stack| !scheduler.contains_stack(stack.stack_id))
    {
        violations.push(Violation::MissingStack {
            stack_id: stack.stack_id,
            present: Side::Compositor,
            missing: Side::Scheduler,
        });
    }
    violations
}

/// Every stack exists on both sides, and every task of each stack too.
pub fn task_lists_match(scheduler: &SchedulerState, compositor: &CompositorState) -> bool {
    correspondence_violations(scheduler, compositor).is_empty()
}

/// What a settled scheduler always reports: stacks, a single resumed
/// activity unless the keyguard is up, and a focused activity.
pub fn liveness_violations(scheduler: &SchedulerState) -> Vec<Violation> {
    let mut violations = Vec::new();
    if scheduler.stack_count() == 0 {
        violations.push(Violation::NoStacks);
    }
    if !scheduler.keyguard_showing() && scheduler.resumed_activities_count() != 1 {
        violations.push(Violation::ResumedActivityCount {
            count: scheduler.resumed_activities_count(),
        });
    }
    if scheduler.focused_activity().is_none() {
        violations.push(Violation::NoFocusedActivity);
    }
    violations
}

/// Windows the compositor always reports once a transition settles.
pub fn window_violations(compositor: &CompositorState) -> Vec<Violation> {
    let mut violations = Vec::new();
    if compositor.front_window().is_none() {
        violations.push(Violation::NoFrontWindow);
    }
    if compositor.focused_window().is_none() {
        violations.push(Violation::NoFocusedWindow);
    }
    if compositor.focused_app().is_none() {
        violations.push(Violation::NoFocusedApp);
    }
    violations
}

/// Structural sanity of one pair of snapshots.
pub fn check_sanity(
    scheduler: &SchedulerState,
    compositor: &CompositorState,
) -> Result<(), ViolationList> {
    let mut violations = ViolationList(liveness_violations(scheduler));
    for stack in scheduler.stacks() {
        for task in &stack.tasks {
            if task.stack_id != stack.stack_id {
                violations.push(Violation::ForeignTask {
                    stack_id: stack.stack_id,
                    task_id: task.task_id,
                    task_stack_id: task.stack_id,
                });
            }
        }
    }
    violations.0.extend(window_violations(compositor));
    violations.into_result()
}

/// Targets that are not yet visible on both sides or sit in the wrong stack.
///
/// `stack_ids`, when given, is indexed like `targets`.
pub fn target_violations(
    scheduler: &SchedulerState,
    compositor: &CompositorState,
    targets: &[WaitTarget],
    stack_ids: Option<&[i32]>,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (index, target) in targets.iter().enumerate() {
        let windows = compositor.matching_visible_windows(&target.window);
        if windows.is_empty() {
            violations.push(Violation::WindowNotVisible {
                window: target.window.clone(),
            });
        } else if !scheduler.is_activity_visible(&target.activity) {
            violations.push(Violation::ActivityNotVisible {
                activity: target.activity.clone(),
            });
        } else if let Some(expected_stack) = stack_ids.and_then(|ids| ids.get(index)).copied() {
            if !windows
                .iter()
                .any(|window| window.stack_id == Some(expected_stack))
            {
                violations.push(Violation::WindowInWrongStack {
                    window: target.window.clone(),
                    expected_stack,
                });
            }
        }
    }
    violations
}
