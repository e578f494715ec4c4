//! Polls both subsystems until their models agree, then asserts on them.
//!
//! Each refresh fetches both dumps sequentially, so the two snapshots are
//! never simultaneous. The reconciler tolerates that by re-fetching until the
//! models converge or the configured attempts run out; only then are
//! mismatches reported.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::compositor::CompositorState;
use crate::config::ReconcilerConfig;
use crate::error::{Result, StateError};
use crate::geometry::Rect;
use crate::scheduler::SchedulerState;
use crate::source::{DumpSource, DumpTarget};
use crate::types::{
    window_name_for_component, ActivityLifecycle, WaitTarget, WindowKind, APP_STATE_IDLE,
    DEFAULT_DISPLAY_ID, DOCKED_STACK_ID,
};
use crate::validate::{
    check_sanity, correspondence_violations, describe, liveness_violations, target_violations,
    window_violations, BoundsChecker, Side, Violation, ViolationList,
};
use crate::wait::{CancelToken, PollOutcome, Poller, Sleeper, ThreadSleeper};

/// When each dump of the latest refresh was requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureTimes {
    pub scheduler: Option<DateTime<Utc>>,
    pub compositor: Option<DateTime<Utc>>,
}

impl CaptureTimes {
    /// Milliseconds between the two captures, once both exist.
    pub fn skew_ms(&self) -> Option<i64> {
        match (self.scheduler, self.compositor) {
            (Some(scheduler), Some(compositor)) => {
                Some(compositor.signed_duration_since(scheduler).num_milliseconds())
            }
            _ => None,
        }
    }
}

pub struct Reconciler<S: DumpSource> {
    source: S,
    config: ReconcilerConfig,
    wait_poller: Poller,
    liveness_poller: Poller,
    stopped_poller: Poller,
    cancel: CancelToken,
    scheduler: SchedulerState,
    compositor: CompositorState,
    captures: CaptureTimes,
}

impl<S: DumpSource> Reconciler<S> {
    pub fn new(source: S, config: ReconcilerConfig) -> Self {
        Self::with_sleeper(source, config, Arc::new(ThreadSleeper), CancelToken::new())
    }

    pub fn with_sleeper(
        source: S,
        config: ReconcilerConfig,
        sleeper: Arc<dyn Sleeper>,
        cancel: CancelToken,
    ) -> Self {
        let wait_poller = Poller::new(config.wait.clone(), sleeper, cancel.clone());
        let liveness_poller = wait_poller.with_config(config.liveness.clone());
        let stopped_poller = wait_poller.with_config(config.stopped.clone());
        Self {
            source,
            config,
            wait_poller,
            liveness_poller,
            stopped_poller,
            cancel,
            scheduler: SchedulerState::default(),
            compositor: CompositorState::default(),
            captures: CaptureTimes::default(),
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Setting the returned token abandons the wait in progress.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn scheduler(&self) -> &SchedulerState {
        &self.scheduler
    }

    pub fn compositor(&self) -> &CompositorState {
        &self.compositor
    }

    pub fn capture_times(&self) -> CaptureTimes {
        self.captures
    }

    /// Expands an activity name using the configured package, if any.
    pub fn target(&self, activity: &str) -> WaitTarget {
        match &self.config.package_name {
            Some(package) if !activity.contains('/') => WaitTarget::component(package, activity),
            _ => WaitTarget::named(activity),
        }
    }

    pub fn targets(&self, activities: &[&str]) -> Vec<WaitTarget> {
        activities.iter().map(|activity| self.target(activity)).collect()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Refresh
    // ═══════════════════════════════════════════════════════════════════════

    fn fetch(&self, target: DumpTarget) -> Result<(String, DateTime<Utc>)> {
        let captured_at = Utc::now();
        let text = self
            .source
            .dump(target)
            .map_err(|details| StateError::fetch(target, details))?;
        Ok((text, captured_at))
    }

    /// Fetches and parses the scheduler dump until it looks settled.
    pub fn refresh_scheduler(&mut self) -> Result<()> {
        let poller = self.liveness_poller.clone();
        let outcome = poller.run("Retrying scheduler dump", |_| {
            let (text, captured_at) = self.fetch(DumpTarget::Scheduler)?;
            self.scheduler = SchedulerState::parse(&text);
            self.captures.scheduler = Some(captured_at);
            Ok(!self.scheduler.needs_retry())
        })?;
        if !outcome.is_satisfied() {
            tracing::warn!(
                attempts = outcome.attempts(),
                stacks = self.scheduler.stack_count(),
                focused_stack = ?self.scheduler.focused_stack_id(),
                "Scheduler dump still incomplete"
            );
        }
        Ok(())
    }

    /// Fetches and parses the compositor dump until no transition is in flight.
    pub fn refresh_compositor(&mut self) -> Result<()> {
        let poller = self.liveness_poller.clone();
        let outcome = poller.run("Retrying compositor dump", |_| {
            let (text, captured_at) = self.fetch(DumpTarget::Compositor)?;
            self.compositor = CompositorState::parse(&text);
            self.captures.compositor = Some(captured_at);
            Ok(!self.compositor.needs_retry())
        })?;
        if !outcome.is_satisfied() {
            tracing::warn!(
                attempts = outcome.attempts(),
                complete = self.compositor.is_complete(),
                windows = self.compositor.windows().len(),
                "Compositor dump still incomplete"
            );
        }
        Ok(())
    }

    /// Refreshes both models, scheduler first.
    pub fn refresh(&mut self) -> Result<()> {
        self.refresh_scheduler()?;
        self.refresh_compositor()?;
        if let Some(skew_ms) = self.captures.skew_ms() {
            tracing::debug!(skew_ms, "Captured both dumps");
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Convergence
    // ═══════════════════════════════════════════════════════════════════════

    /// Everything still keeping the two models from agreeing.
    pub fn convergence_violations(
        &self,
        targets: &[WaitTarget],
        stack_ids: Option<&[i32]>,
        compare_task_and_stack_bounds: bool,
    ) -> ViolationList {
        let mut violations = ViolationList(correspondence_violations(
            &self.scheduler,
            &self.compositor,
        ));
        if !self.compositor.is_complete() {
            violations.push(Violation::CompositorIncomplete);
        }
        if violations.is_empty() {
            if let Err(bounds) = self.bounds_checker().check(compare_task_and_stack_bounds) {
                violations.0.extend(bounds.0);
            }
        }
        violations.0.extend(liveness_violations(&self.scheduler));
        violations.0.extend(target_violations(
            &self.scheduler,
            &self.compositor,
            targets,
            stack_ids,
        ));
        violations.0.extend(window_violations(&self.compositor));
        violations
    }

    fn bounds_checker(&self) -> BoundsChecker<'_> {
        BoundsChecker::new(&self.scheduler, &self.compositor, self.config.min_size)
    }

    /// Polls until both models agree and every target is visible, optionally
    /// in the stack at the same index of `stack_ids`.
    ///
    /// Runs out of attempts into an [`StateError::Invariant`] carrying what
    /// still disagreed on the last attempt.
    pub fn wait_for_valid_state(
        &mut self,
        targets: &[WaitTarget],
        stack_ids: Option<&[i32]>,
        compare_task_and_stack_bounds: bool,
    ) -> Result<()> {
        let poller = self.wait_poller.clone();
        let mut last = ViolationList::default();
        let outcome = poller.run("***Waiting for valid stacks and activities states...", |attempt| {
            self.refresh()?;
            last = self.convergence_violations(targets, stack_ids, compare_task_and_stack_bounds);
            if !last.is_empty() {
                tracing::debug!(attempt, violations = last.len(), "Models not converged");
            }
            Ok(last.is_empty())
        })?;
        match outcome {
            PollOutcome::Satisfied { attempts } => {
                tracing::info!(attempts, "Models converged");
                Ok(())
            }
            PollOutcome::Exhausted { attempts } => {
                tracing::warn!(attempts, violations = last.len(), "Models did not converge");
                Err(StateError::Invariant(last))
            }
        }
    }

    /// Waits for a valid state, then runs the sanity and bounds checks.
    pub fn compute_state(
        &mut self,
        targets: &[WaitTarget],
        compare_task_and_stack_bounds: bool,
    ) -> Result<()> {
        self.wait_for_valid_state(targets, None, compare_task_and_stack_bounds)?;
        self.assert_sanity()?;
        self.assert_valid_bounds(compare_task_and_stack_bounds)
    }

    pub fn assert_sanity(&self) -> Result<()> {
        check_sanity(&self.scheduler, &self.compositor)?;
        Ok(())
    }

    pub fn assert_valid_bounds(&self, compare_task_and_stack_bounds: bool) -> Result<()> {
        self.bounds_checker().check(compare_task_and_stack_bounds)?;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Waits
    // ═══════════════════════════════════════════════════════════════════════

    /// Refreshes both models until `condition` holds. Returns whether it did.
    pub fn wait_for<F>(&mut self, message: &str, mut condition: F) -> Result<bool>
    where
        F: FnMut(&SchedulerState, &CompositorState) -> bool,
    {
        let poller = self.wait_poller.clone();
        let outcome = poller.run(message, |_| {
            self.refresh()?;
            Ok(condition(&self.scheduler, &self.compositor))
        })?;
        Ok(outcome.is_satisfied())
    }

    pub fn wait_for_scheduler<F>(&mut self, message: &str, mut condition: F) -> Result<bool>
    where
        F: FnMut(&SchedulerState) -> bool,
    {
        let poller = self.wait_poller.clone();
        let outcome = poller.run(message, |_| {
            self.refresh_scheduler()?;
            Ok(condition(&self.scheduler))
        })?;
        Ok(outcome.is_satisfied())
    }

    pub fn wait_for_compositor<F>(&mut self, message: &str, mut condition: F) -> Result<bool>
    where
        F: FnMut(&CompositorState) -> bool,
    {
        let poller = self.wait_poller.clone();
        let outcome = poller.run(message, |_| {
            self.refresh_compositor()?;
            Ok(condition(&self.compositor))
        })?;
        Ok(outcome.is_satisfied())
    }

    pub fn wait_for_keyguard_showing_and_not_occluded(&mut self) -> Result<bool> {
        self.wait_for_scheduler("***Waiting for Keyguard showing...", |scheduler| {
            scheduler.keyguard_showing() && !scheduler.keyguard_occluded()
        })
    }

    pub fn wait_for_keyguard_showing_and_occluded(&mut self) -> Result<bool> {
        self.wait_for_scheduler("***Waiting for Keyguard showing and occluded...", |scheduler| {
            scheduler.keyguard_showing() && scheduler.keyguard_occluded()
        })
    }

    pub fn wait_for_keyguard_gone(&mut self) -> Result<bool> {
        self.wait_for_scheduler("***Waiting for Keyguard gone...", |scheduler| {
            !scheduler.keyguard_showing()
        })
    }

    pub fn wait_for_rotation(&mut self, rotation: i32) -> Result<bool> {
        self.wait_for_compositor("***Waiting for Rotation", |compositor| {
            compositor.rotation() == rotation
        })
    }

    pub fn wait_for_display_unfrozen(&mut self) -> Result<bool> {
        self.wait_for_compositor("***Waiting for Display unfrozen", |compositor| {
            !compositor.is_display_frozen()
        })
    }

    /// Waits until `activity` reaches any of `states`.
    pub fn wait_for_activity_state(
        &mut self,
        activity: &str,
        states: &[ActivityLifecycle],
    ) -> Result<bool> {
        let component = self.target(activity).activity;
        self.wait_for_scheduler("***Waiting for Activity State", |scheduler| {
            states
                .iter()
                .any(|state| scheduler.has_activity_state(&component, state))
        })
    }

    pub fn wait_for_focused_stack(&mut self, stack_id: i32) -> Result<bool> {
        self.wait_for_scheduler("***Waiting for focused stack", |scheduler| {
            scheduler.focused_stack_id() == Some(stack_id)
        })
    }

    pub fn wait_for_app_transition_idle(&mut self) -> Result<bool> {
        self.wait_for_compositor("***Waiting for app transition idle...", |compositor| {
            compositor.app_transition_state() == Some(APP_STATE_IDLE)
        })
    }

    pub fn wait_for_recents_activity_visible(&mut self) -> Result<bool> {
        self.wait_for_scheduler("***Waiting for recents activity to be visible...", |scheduler| {
            scheduler.is_recents_activity_visible()
        })
    }

    pub fn wait_for_home_activity_visible(&mut self) -> Result<bool> {
        self.wait_for("***Waiting for home activity to be visible...", |scheduler, compositor| {
            scheduler
                .home_activity_name()
                .map(|home| {
                    scheduler.is_activity_visible(home)
                        && compositor.is_window_visible(&window_name_for_component(home))
                })
                .unwrap_or(false)
        })
    }

    /// Waits until no activity is still started, then asserts it.
    pub fn wait_for_all_stopped_activities(&mut self) -> Result<()> {
        let poller = self.stopped_poller.clone();
        poller.run("***Waiting for Activities to be stopped...", |_| {
            self.refresh_scheduler()?;
            Ok(!self.scheduler.contains_started_activities())
        })?;
        if self.scheduler.contains_started_activities() {
            let activities: Vec<&str> = self
                .scheduler
                .activities()
                .filter(|activity| {
                    !matches!(
                        activity.state,
                        Some(ActivityLifecycle::Stopped) | Some(ActivityLifecycle::Destroyed)
                    )
                })
                .map(|activity| activity.name.as_str())
                .collect();
            return Err(Violation::StartedActivities {
                activities: activities.join(", "),
            }
            .into());
        }
        Ok(())
    }

    /// Waits for the debugger window of `package` and for every activity to be visible.
    pub fn wait_for_debugger_window_visible(
        &mut self,
        package: &str,
        activities: &[&str],
    ) -> Result<bool> {
        let components: Vec<String> = activities
            .iter()
            .map(|activity| self.target(activity).activity)
            .collect();
        self.wait_for("***Waiting for debugger window...", |scheduler, compositor| {
            let debugger_shown = compositor
                .matching_visible_windows(package)
                .iter()
                .any(|window| window.kind == WindowKind::Debugger);
            debugger_shown
                && components
                    .iter()
                    .all(|component| scheduler.is_activity_visible(component))
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Assertions
    // ═══════════════════════════════════════════════════════════════════════

    pub fn assert_contains_stack(&self, stack_id: i32) -> Result<()> {
        self.assert_stack_presence(stack_id, true)
    }

    pub fn assert_does_not_contain_stack(&self, stack_id: i32) -> Result<()> {
        self.assert_stack_presence(stack_id, false)
    }

    fn assert_stack_presence(&self, stack_id: i32, expected: bool) -> Result<()> {
        let mut violations = ViolationList::default();
        let sides = [
            (Side::Scheduler, self.scheduler.contains_stack(stack_id)),
            (Side::Compositor, self.compositor.contains_stack(stack_id)),
        ];
        for (side, present) in sides {
            if present != expected {
                violations.push(Violation::StackPresence {
                    stack_id,
                    side,
                    present,
                });
            }
        }
        Ok(violations.into_result()?)
    }

    /// The front stack of the default display is `stack_id` in both models.
    pub fn assert_front_stack(&self, stack_id: i32) -> Result<()> {
        let mut violations = ViolationList::default();
        let sides = [
            (Side::Scheduler, self.scheduler.front_stack_id(DEFAULT_DISPLAY_ID)),
            (Side::Compositor, self.compositor.front_stack_id(DEFAULT_DISPLAY_ID)),
        ];
        for (side, actual) in sides {
            if actual != Some(stack_id) {
                violations.push(Violation::Mismatch {
                    side,
                    subject: "front stack",
                    expected: stack_id.to_string(),
                    actual: describe(&actual),
                });
            }
        }
        Ok(violations.into_result()?)
    }

    pub fn assert_focused_stack(&self, stack_id: i32) -> Result<()> {
        let actual = self.scheduler.focused_stack_id();
        if actual != Some(stack_id) {
            return Err(Violation::Mismatch {
                side: Side::Scheduler,
                subject: "focused stack",
                expected: stack_id.to_string(),
                actual: describe(&actual),
            }
            .into());
        }
        Ok(())
    }

    pub fn assert_not_focused_stack(&self, stack_id: i32) -> Result<()> {
        if self.scheduler.focused_stack_id() == Some(stack_id) {
            return Err(Violation::UnexpectedValue {
                side: Side::Scheduler,
                subject: "focused stack",
                value: stack_id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Focused activity in the scheduler and focused app in the compositor.
    pub fn assert_focused_activity(&self, activity: &str) -> Result<()> {
        let component = self.target(activity).activity;
        let mut violations = ViolationList::default();
        let sides = [
            (Side::Scheduler, "focused activity", self.scheduler.focused_activity()),
            (Side::Compositor, "focused app", self.compositor.focused_app()),
        ];
        for (side, subject, actual) in sides {
            if actual != Some(component.as_str()) {
                violations.push(Violation::Mismatch {
                    side,
                    subject,
                    expected: component.clone(),
                    actual: describe(&actual),
                });
            }
        }
        Ok(violations.into_result()?)
    }

    pub fn assert_not_focused_activity(&self, activity: &str) -> Result<()> {
        let component = self.target(activity).activity;
        let mut violations = ViolationList::default();
        let sides = [
            (Side::Scheduler, "focused activity", self.scheduler.focused_activity()),
            (Side::Compositor, "focused app", self.compositor.focused_app()),
        ];
        for (side, subject, actual) in sides {
            if actual == Some(component.as_str()) {
                violations.push(Violation::UnexpectedValue {
                    side,
                    subject,
                    value: component.clone(),
                });
            }
        }
        Ok(violations.into_result()?)
    }

    pub fn assert_resumed_activity(&self, activity: &str) -> Result<()> {
        let component = self.target(activity).activity;
        let actual = self.scheduler.resumed_activity();
        if actual != Some(component.as_str()) {
            return Err(Violation::Mismatch {
                side: Side::Scheduler,
                subject: "resumed activity",
                expected: component,
                actual: describe(&actual),
            }
            .into());
        }
        Ok(())
    }

    pub fn assert_not_resumed_activity(&self, activity: &str) -> Result<()> {
        let component = self.target(activity).activity;
        if self.scheduler.resumed_activity() == Some(component.as_str()) {
            return Err(Violation::UnexpectedValue {
                side: Side::Scheduler,
                subject: "resumed activity",
                value: component,
            }
            .into());
        }
        Ok(())
    }

    pub fn assert_focused_window(&self, window: &str) -> Result<()> {
        self.assert_compositor_value("focused window", self.compositor.focused_window(), window)
    }

    pub fn assert_not_focused_window(&self, window: &str) -> Result<()> {
        if self.compositor.focused_window() == Some(window) {
            return Err(Violation::UnexpectedValue {
                side: Side::Compositor,
                subject: "focused window",
                value: window.to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn assert_front_window(&self, window: &str) -> Result<()> {
        self.assert_compositor_value("front window", self.compositor.front_window(), window)
    }

    fn assert_compositor_value(
        &self,
        subject: &'static str,
        actual: Option<&str>,
        expected: &str,
    ) -> Result<()> {
        if actual != Some(expected) {
            return Err(Violation::Mismatch {
                side: Side::Compositor,
                subject,
                expected: expected.to_string(),
                actual: describe(&actual),
            }
            .into());
        }
        Ok(())
    }

    /// The activity and its window are both visible, or both hidden.
    pub fn assert_visibility(&self, activity: &str, visible: bool) -> Result<()> {
        self.assert_target_visibility(&self.target(activity), visible)
    }

    fn assert_target_visibility(&self, target: &WaitTarget, visible: bool) -> Result<()> {
        let mut violations = ViolationList::default();
        let sides = [
            (
                Side::Scheduler,
                "activity visibility",
                self.scheduler.is_activity_visible(&target.activity),
            ),
            (
                Side::Compositor,
                "window visibility",
                self.compositor.is_window_visible(&target.window),
            ),
        ];
        for (side, subject, actual) in sides {
            if actual != visible {
                violations.push(Violation::Mismatch {
                    side,
                    subject,
                    expected: visible.to_string(),
                    actual: actual.to_string(),
                });
            }
        }
        Ok(violations.into_result()?)
    }

    pub fn assert_home_activity_visible(&self, visible: bool) -> Result<()> {
        let Some(home) = self.scheduler.home_activity_name() else {
            return Err(Violation::Mismatch {
                side: Side::Scheduler,
                subject: "home activity",
                expected: "present".to_string(),
                actual: "none".to_string(),
            }
            .into());
        };
        self.assert_target_visibility(&WaitTarget::named(home), visible)
    }

    /// `stack_id` sits at the same z-position in both models.
    pub fn assert_stack_positions_match(&self, stack_id: i32) -> Result<()> {
        let scheduler = self.scheduler.stack_position(stack_id);
        let compositor = self.compositor.stack_position(stack_id);
        if scheduler != compositor {
            return Err(Violation::StackPositionMismatch {
                stack_id,
                scheduler,
                compositor,
            }
            .into());
        }
        Ok(())
    }

    /// The docked task holding `activity` is sized `width`x`height`, each
    /// raised to the display's minimum task size, at the origin.
    pub fn assert_docked_task_bounds(&self, width: i32, height: i32, activity: &str) -> Result<()> {
        let component = self.target(activity).activity;
        let Some(stack) = self.scheduler.stack_by_id(DOCKED_STACK_ID) else {
            return Err(Violation::StackPresence {
                stack_id: DOCKED_STACK_ID,
                side: Side::Scheduler,
                present: false,
            }
            .into());
        };
        let Some(display) = self.compositor.display(stack.display_id) else {
            return Err(Violation::MissingDisplay {
                display_id: stack.display_id,
            }
            .into());
        };
        let min_size = self.config.min_size.resizeable_task_px(display.dpi);
        let expected = Rect::sized(width.max(min_size), height.max(min_size));

        let Some(task) = self
            .scheduler
            .task_by_activity_name(&component, Some(DOCKED_STACK_ID))
        else {
            return Err(Violation::MissingActivityTask {
                stack_id: DOCKED_STACK_ID,
                activity: component,
            }
            .into());
        };
        if task.bounds() != Some(expected) {
            return Err(Violation::TaskBoundsMismatch {
                stack_id: DOCKED_STACK_ID,
                task_id: task.task_id,
                scheduler: task.bounds(),
                compositor: Some(expected),
            }
            .into());
        }
        Ok(())
    }

    /// The default display can hold a task of the default minimum size.
    pub fn assert_device_default_display_size(&self) -> Result<()> {
        let Some(display) = self.compositor.display(DEFAULT_DISPLAY_ID) else {
            return Err(Violation::MissingDisplay {
                display_id: DEFAULT_DISPLAY_ID,
            }
            .into());
        };
        let rect = display.display_rect;
        let smallest = rect.width.min(rect.height);
        let required = self.config.min_size.resizeable_task_px(display.dpi);
        if smallest < required {
            return Err(Violation::DisplayTooSmall {
                display_id: DEFAULT_DISPLAY_ID,
                smallest,
                required,
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollConfig;
    use crate::wait::tests::RecordingSleeper;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    const ACTIVITIES: &str = "\
ACTIVITY MANAGER ACTIVITIES (dumpsys activity activities)
Display #0 (activities from top to bottom):
  Stack #1:
  mFullscreen=true
    Task id #10
    mFullscreen=true
    * TaskRecord{a1 #10 A=app U=0 StackId=1 sz=1}
      * Hist #0: ActivityRecord{b2 u0 app/.Main t10}
          state=RESUMED stopped=false delayedResume=false finishing=false
          keysPaused=false inHistory=true visible=true sleeping=false idle=true mStartingWindowState=STARTING_WINDOW_NOT_SHOWN
          frontOfTask=true task=TaskRecord{a1 #10 A=app U=0 StackId=1 sz=1}

    mResumedActivity: ActivityRecord{b2 u0 app/.Main t10}
  ResumedActivity: ActivityRecord{b2 u0 app/.Main t10}
  mFocusedStack=ActivityStack{c3 stackId=1, 1 tasks} mLastFocusedStack=ActivityStack{c3 stackId=1, 1 tasks}
";

    const WINDOWS: &str = "\
WINDOW MANAGER DISPLAY CONTENTS (dumpsys window displays)
  Display: mDisplayId=0
    init=1080x1920 480dpi cur=1080x1920 app=1080x1794 rng=1080x1017-1794x1731
  mStackId=1
    mFillsParent=true
    mBounds=[0,0][1080,1920]
      taskId=10
        mFillsParent=true
        mBounds=[0,0][1080,1920]
          Activity #0 AppWindowToken{e1 token=Token{e2 ActivityRecord{b2 u0 app/.Main t10}}}
WINDOW MANAGER WINDOWS (dumpsys window windows)
  Window #0 Window{d4 u0 app/app.Main}:
    mDisplayId=0 stackId=1 mSession=Session{e5 123:u0a1} mClient=android.os.BinderProxy@f6
    mAttrs=WM.LayoutParams{(0,0)(fillxfill) ty=1 fl=#81810100}
    Surface: shown=true layer=21010 alpha=1.0 rect=(0.0,0.0) 1080.0 x 1920.0
  mCurrentFocus=Window{d4 u0 app/app.Main}
  mFocusedApp=AppWindowToken{e1 token=Token{e2 ActivityRecord{b2 u0 app/.Main t10}}}
  mAppTransitionState=APP_STATE_IDLE
";

    #[derive(Clone)]
    struct FakeSource {
        scheduler: Arc<Mutex<VecDeque<std::result::Result<String, String>>>>,
        compositor: Arc<Mutex<VecDeque<std::result::Result<String, String>>>>,
        fallback: (String, String),
    }

    impl FakeSource {
        fn steady(scheduler: &str, compositor: &str) -> Self {
            Self {
                scheduler: Arc::default(),
                compositor: Arc::default(),
                fallback: (scheduler.to_string(), compositor.to_string()),
            }
        }

        fn push_scheduler(&self, dump: std::result::Result<String, String>) {
            self.scheduler.lock().expect("lock scheduler").push_back(dump);
        }
    }

    impl DumpSource for FakeSource {
        fn scheduler_dump(&self) -> std::result::Result<String, String> {
            self.scheduler
                .lock()
                .expect("lock scheduler")
                .pop_front()
                .unwrap_or_else(|| Ok(self.fallback.0.clone()))
        }

        fn compositor_dump(&self) -> std::result::Result<String, String> {
            self.compositor
                .lock()
                .expect("lock compositor")
                .pop_front()
                .unwrap_or_else(|| Ok(self.fallback.1.clone()))
        }
    }

    fn reconciler(source: FakeSource) -> (Reconciler<FakeSource>, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::default());
        let config = ReconcilerConfig {
            package_name: Some("app".to_string()),
            ..ReconcilerConfig::default()
        };
        let reconciler =
            Reconciler::with_sleeper(source, config, sleeper.clone(), CancelToken::new());
        (reconciler, sleeper)
    }

    #[test]
    fn compute_state_converges_on_matching_dumps() {
        let (mut reconciler, sleeper) = reconciler(FakeSource::steady(ACTIVITIES, WINDOWS));
        let targets = reconciler.targets(&["Main"]);
        reconciler.compute_state(&targets, false).expect("compute state");
        assert_eq!(reconciler.scheduler().focused_activity(), Some("app/.Main"));
        assert!(sleeper.recorded().is_empty());
        assert!(reconciler.capture_times().skew_ms().is_some());

        reconciler.assert_focused_activity("Main").expect("focused activity");
        reconciler.assert_resumed_activity("Main").expect("resumed activity");
        reconciler.assert_front_stack(1).expect("front stack");
        reconciler.assert_focused_stack(1).expect("focused stack");
        reconciler.assert_contains_stack(1).expect("contains stack");
        reconciler.assert_does_not_contain_stack(3).expect("no docked stack");
        reconciler.assert_visibility("Main", true).expect("visible");
        reconciler.assert_stack_positions_match(1).expect("positions");
        reconciler.assert_device_default_display_size().expect("display size");
    }

    #[test]
    fn incomplete_compositor_never_converges() {
        let (mut reconciler, _) = reconciler(FakeSource::steady(ACTIVITIES, WINDOWS));
        reconciler.refresh().expect("refresh");
        let targets = reconciler.targets(&["Main"]);
        assert!(reconciler.convergence_violations(&targets, None, false).is_empty());

        // Focus lines are present, so only the parse status says it is partial.
        reconciler.compositor.complete = false;
        let violations = reconciler.convergence_violations(&targets, None, false);
        assert_eq!(violations.0, vec![Violation::CompositorIncomplete]);
    }

    #[test]
    fn assertions_report_both_sides() {
        let (mut reconciler, _) = reconciler(FakeSource::steady(ACTIVITIES, WINDOWS));
        reconciler.refresh().expect("refresh");

        let err = reconciler.assert_contains_stack(4).expect_err("no pinned stack");
        let violations = err.violations().expect("invariant");
        assert_eq!(violations.len(), 2);

        let err = reconciler.assert_focused_activity("Other").expect_err("wrong activity");
        assert!(err.to_string().contains("app/.Other"));

        reconciler.assert_not_focused_stack(1).expect_err("stack 1 is focused");
        reconciler.assert_not_focused_activity("Main").expect_err("Main is focused");
    }

    #[test]
    fn fetch_failure_propagates_without_retry() {
        let source = FakeSource::steady(ACTIVITIES, WINDOWS);
        source.push_scheduler(Err("device offline".to_string()));
        let (mut reconciler, sleeper) = reconciler(source);
        let err = reconciler.compute_state(&[], false).expect_err("fetch error");
        match err {
            StateError::Fetch { target, details } => {
                assert_eq!(target, DumpTarget::Scheduler);
                assert_eq!(details, "device offline");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(sleeper.recorded().is_empty());
    }

    #[test]
    fn incomplete_scheduler_dump_is_refetched() {
        let source = FakeSource::steady(ACTIVITIES, WINDOWS);
        source.push_scheduler(Ok("Display #0 (activities from top to bottom):\n".to_string()));
        let (mut reconciler, sleeper) = reconciler(source);
        reconciler.refresh_scheduler().expect("refresh");
        assert_eq!(reconciler.scheduler().stack_count(), 1);
        assert_eq!(sleeper.recorded(), vec![Duration::from_millis(500)]);
    }

    #[test]
    fn wait_for_reports_unmet_condition() {
        let (mut reconciler, sleeper) = reconciler(FakeSource::steady(ACTIVITIES, WINDOWS));
        reconciler.config.wait = PollConfig::fixed(3, 10);
        reconciler.wait_poller = reconciler.wait_poller.with_config(reconciler.config.wait.clone());
        let met = reconciler.wait_for_focused_stack(3).expect("wait");
        assert!(!met);
        assert_eq!(sleeper.recorded().len(), 2);
        assert!(reconciler.wait_for_focused_stack(1).expect("wait"));
    }

    #[test]
    fn stopped_activities_are_asserted_after_waiting() {
        let (mut reconciler, _) = reconciler(FakeSource::steady(ACTIVITIES, WINDOWS));
        let err = reconciler
            .wait_for_all_stopped_activities()
            .expect_err("Main is resumed");
        assert!(err.to_string().contains("app/.Main"));
    }

    #[test]
    fn cancelled_wait_surfaces_as_error() {
        let (mut reconciler, _) = reconciler(FakeSource::steady(ACTIVITIES, WINDOWS));
        reconciler.cancel_token().cancel();
        let err = reconciler.wait_for_valid_state(&[], None, false).expect_err("cancelled");
        assert!(matches!(err, StateError::Cancelled(_)));
    }
}
