use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wmstate_core::{
    CancelToken, CompositorState, DumpSource, PollConfig, Reconciler, ReconcilerConfig,
    SchedulerState, Sleeper, StateError, Violation,
};

const ACTIVITIES: &str = include_str!("fixtures/activities_fullscreen.txt");
const WINDOWS: &str = include_str!("fixtures/windows_fullscreen.txt");
const WINDOWS_SPLIT_STACK: &str = include_str!("fixtures/windows_split_stack.txt");
const WINDOWS_STARTING: &str = include_str!("fixtures/windows_starting.txt");

#[derive(Default)]
struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    fn recorded(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("lock sleeps").clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().expect("lock sleeps").push(duration);
    }
}

/// Serves queued compositor dumps first, then repeats the steady ones.
#[derive(Clone)]
struct ScriptedSource {
    scheduler: String,
    compositor: String,
    queued_compositor: Arc<Mutex<VecDeque<String>>>,
    scheduler_fetches: Arc<Mutex<usize>>,
}

impl ScriptedSource {
    fn new(scheduler: &str, compositor: &str) -> Self {
        Self {
            scheduler: scheduler.to_string(),
            compositor: compositor.to_string(),
            queued_compositor: Arc::default(),
            scheduler_fetches: Arc::default(),
        }
    }

    fn queue_compositor(self, dump: &str) -> Self {
        self.queued_compositor
            .lock()
            .expect("lock queue")
            .push_back(dump.to_string());
        self
    }

    fn scheduler_fetches(&self) -> usize {
        *self.scheduler_fetches.lock().expect("lock count")
    }
}

impl DumpSource for ScriptedSource {
    fn scheduler_dump(&self) -> Result<String, String> {
        *self.scheduler_fetches.lock().expect("lock count") += 1;
        Ok(self.scheduler.clone())
    }

    fn compositor_dump(&self) -> Result<String, String> {
        let queued = self.queued_compositor.lock().expect("lock queue").pop_front();
        Ok(queued.unwrap_or_else(|| self.compositor.clone()))
    }
}

fn reconciler(source: ScriptedSource) -> (Reconciler<ScriptedSource>, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::default());
    let config = ReconcilerConfig {
        wait: PollConfig::fixed(5, 1000),
        package_name: Some("app".to_string()),
        ..ReconcilerConfig::default()
    };
    let reconciler = Reconciler::with_sleeper(source, config, sleeper.clone(), CancelToken::new());
    (reconciler, sleeper)
}

#[test]
fn matching_dumps_converge_on_first_attempt() {
    let (mut reconciler, sleeper) = reconciler(ScriptedSource::new(ACTIVITIES, WINDOWS));
    let targets = reconciler.targets(&["Main"]);

    reconciler
        .compute_state(&targets, false)
        .expect("compute state");

    assert_eq!(reconciler.scheduler().focused_activity(), Some("app/.Main"));
    assert_eq!(reconciler.compositor().focused_app(), Some("app/.Main"));
    assert!(sleeper.recorded().is_empty());

    for stack in reconciler.compositor().stacks() {
        assert!(reconciler.scheduler().contains_stack(stack.stack_id));
    }
    for stack in reconciler.scheduler().stacks() {
        assert!(reconciler.compositor().contains_stack(stack.stack_id));
    }

    reconciler.assert_home_activity_visible(false).expect("home hidden");
    reconciler.assert_front_window("app/app.Main").expect("front window");
    reconciler.assert_focused_window("app/app.Main").expect("focused window");
}

#[test]
fn stack_fullscreen_mismatch_fails_after_every_attempt() {
    let source = ScriptedSource::new(ACTIVITIES, WINDOWS_SPLIT_STACK);
    let (mut reconciler, sleeper) = reconciler(source.clone());

    let err = reconciler
        .compute_state(&[], false)
        .expect_err("stack 1 disagrees");

    let violations = err.violations().expect("invariant violation");
    assert!(violations.iter().any(|violation| *violation
        == Violation::StackFullscreenMismatch {
            stack_id: 1,
            scheduler: true,
            compositor: false,
        }));
    assert!(err.to_string().contains("stack 1"));

    assert_eq!(source.scheduler_fetches(), 5);
    assert_eq!(sleeper.recorded(), vec![Duration::from_millis(1000); 4]);
}

#[test]
fn transition_in_flight_marks_compositor_incomplete() {
    let state = CompositorState::parse(WINDOWS_STARTING);
    assert!(!state.is_complete());
    assert!(state.needs_retry());
    assert!(state.windows().is_empty());

    let source = ScriptedSource::new(ACTIVITIES, WINDOWS).queue_compositor(WINDOWS_STARTING);
    let (mut reconciler, sleeper) = reconciler(source);
    reconciler.refresh().expect("refresh");

    assert!(reconciler.compositor().is_complete());
    assert_eq!(sleeper.recorded(), vec![Duration::from_millis(500)]);
}

#[test]
fn parsing_is_idempotent() {
    assert_eq!(SchedulerState::parse(ACTIVITIES), SchedulerState::parse(ACTIVITIES));
    assert_eq!(CompositorState::parse(WINDOWS), CompositorState::parse(WINDOWS));
}

#[test]
fn scheduler_containers_are_fullscreen_or_bounded() {
    let state = SchedulerState::parse(ACTIVITIES);
    for stack in state.stacks() {
        assert_eq!(stack.is_fullscreen(), stack.bounds().is_none());
        for task in &stack.tasks {
            assert_eq!(task.is_fullscreen(), task.bounds().is_none());
        }
    }
}

#[test]
fn fixture_models_expose_supplementary_fields() {
    let scheduler = SchedulerState::parse(ACTIVITIES);
    assert_eq!(scheduler.activity_proc_id("app/.Main"), Some(4242));
    assert_eq!(scheduler.home_activity_name(), Some("com.launcher/.Home"));
    assert!(!scheduler.is_home_stack_resizeable());
    assert!(scheduler.dropped_lines() > 0);

    let compositor = CompositorState::parse(WINDOWS);
    assert_eq!(compositor.display(0).map(|display| display.dpi), Some(420));
    assert_eq!(compositor.app_transition_state(), Some("APP_STATE_IDLE"));
    assert_eq!(
        compositor.first_window_of_type(2013).map(|window| window.name.as_str()),
        Some("com.android.systemui.ImageWallpaper")
    );
}

#[test]
fn parsed_models_serialize_to_json() {
    let scheduler = SchedulerState::parse(ACTIVITIES);
    let json = serde_json::to_value(&scheduler).expect("serialize scheduler");
    assert_eq!(json["stacks"][0]["stack_id"], 1);
    assert_eq!(json["focused_activity"], "app/.Main");

    let compositor = CompositorState::parse(WINDOWS);
    let json = serde_json::to_value(&compositor).expect("serialize compositor");
    assert_eq!(json["windows"][0]["name"], "app/app.Main");
}

#[test]
fn missing_target_window_is_reported_by_name() {
    let (mut reconciler, _) = reconciler(ScriptedSource::new(ACTIVITIES, WINDOWS));
    let targets = reconciler.targets(&["Settings"]);
    let err = reconciler
        .wait_for_valid_state(&targets, None, false)
        .expect_err("Settings never appears");
    match err {
        StateError::Invariant(list) => assert!(list.iter().any(|violation| matches!(
            violation,
            Violation::WindowNotVisible { window } if window == "app/app.Settings"
        ))),
        other => panic!("unexpected error: {other}"),
    }
}
