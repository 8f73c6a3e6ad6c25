use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use absensi_web::refresh::{
    AutoRefreshController, Indicator, RefreshState, RefreshTimer, HIDDEN_CLASS,
};

/// Element with a class list, like the page's `#liveIndicator`
#[derive(Clone, Default)]
struct FakeBadge {
    classes: Rc<RefCell<Vec<String>>>,
}

impl FakeBadge {
    fn hidden() -> Self {
        let badge = Self::default();
        badge.classes.borrow_mut().push(HIDDEN_CLASS.to_string());
        badge
    }

    fn is_hidden(&self) -> bool {
        self.classes.borrow().iter().any(|c| c == HIDDEN_CLASS)
    }
}

impl Indicator for FakeBadge {
    fn show(&mut self) {
        self.classes.borrow_mut().retain(|c| c != HIDDEN_CLASS);
    }

    fn hide(&mut self) {
        let mut classes = self.classes.borrow_mut();
        if !classes.iter().any(|c| c == HIDDEN_CLASS) {
            classes.push(HIDDEN_CLASS.to_string());
        }
    }
}

#[derive(Default)]
struct Clock {
    now_ms: u64,
    next_id: u64,
    // (id, period, next due time)
    intervals: Vec<(u64, u64, u64)>,
    reloads: usize,
}

/// Fake timers driven by [`FakeTimer::advance`]
#[derive(Clone, Default)]
struct FakeTimer {
    clock: Rc<RefCell<Clock>>,
}

impl FakeTimer {
    fn advance(&self, ms: u64) {
        let mut clock = self.clock.borrow_mut();
        let target = clock.now_ms + ms;
        loop {
            let due = clock
                .intervals
                .iter()
                .map(|(_, _, due)| *due)
                .filter(|due| *due <= target)
                .min();
            let Some(due) = due else { break };
            clock.now_ms = due;
            let mut fired = 0;
            for interval in clock.intervals.iter_mut() {
                if interval.2 == due {
                    interval.2 += interval.1;
                    fired += 1;
                }
            }
            clock.reloads += fired;
        }
        clock.now_ms = target;
    }

    fn reloads(&self) -> usize {
        self.clock.borrow().reloads
    }

    fn active(&self) -> usize {
        self.clock.borrow().intervals.len()
    }
}

impl RefreshTimer for FakeTimer {
    type Handle = u64;

    fn schedule(&mut self, period: Duration) -> u64 {
        let mut clock = self.clock.borrow_mut();
        clock.next_id += 1;
        let id = clock.next_id;
        let period = period.as_millis() as u64;
        let due = clock.now_ms + period;
        clock.intervals.push((id, period, due));
        id
    }

    fn cancel(&mut self, handle: u64) {
        self.clock.borrow_mut().intervals.retain(|(id, _, _)| *id != handle);
    }
}

#[test]
fn test_checking_toggle_shows_badge_and_schedules_reload() {
    let badge = FakeBadge::hidden();
    let timer = FakeTimer::default();
    let mut controller =
        AutoRefreshController::attach(Some(false), Some(badge.clone()), timer.clone()).unwrap();

    assert_eq!(controller.state(), RefreshState::Stopped);
    assert!(badge.is_hidden());

    assert_eq!(controller.on_toggle_change(true), RefreshState::Running);
    assert!(!badge.is_hidden());
    assert_eq!(timer.active(), 1);

    timer.advance(4999);
    assert_eq!(timer.reloads(), 0);
    timer.advance(1);
    assert_eq!(timer.reloads(), 1);
    timer.advance(10_000);
    assert_eq!(timer.reloads(), 3);
}

#[test]
fn test_unchecking_toggle_cancels_reload_and_hides_badge() {
    let badge = FakeBadge::hidden();
    let timer = FakeTimer::default();
    let mut controller =
        AutoRefreshController::attach(Some(false), Some(badge.clone()), timer.clone()).unwrap();

    controller.on_toggle_change(true);
    timer.advance(3000);
    assert_eq!(controller.on_toggle_change(false), RefreshState::Stopped);

    assert!(badge.is_hidden());
    assert_eq!(timer.active(), 0);
    timer.advance(60_000);
    assert_eq!(timer.reloads(), 0);
}

#[test]
fn test_initially_checked_toggle_runs_without_interaction() {
    let badge = FakeBadge::hidden();
    let timer = FakeTimer::default();
    let controller =
        AutoRefreshController::attach(Some(true), Some(badge.clone()), timer.clone()).unwrap();

    assert_eq!(controller.state(), RefreshState::Running);
    assert!(!badge.is_hidden());
    assert_eq!(timer.active(), 1);
    timer.advance(5000);
    assert_eq!(timer.reloads(), 1);
}

#[test]
fn test_missing_indicator_still_refreshes() {
    let timer = FakeTimer::default();
    let mut controller =
        AutoRefreshController::<FakeBadge, _>::attach(Some(false), None, timer.clone()).unwrap();

    controller.on_toggle_change(true);
    timer.advance(5000);
    assert_eq!(timer.reloads(), 1);

    controller.on_toggle_change(false);
    assert_eq!(timer.active(), 0);
}

#[test]
fn test_missing_toggle_does_nothing() {
    let badge = FakeBadge::hidden();
    let timer = FakeTimer::default();
    let controller = AutoRefreshController::attach(None, Some(badge.clone()), timer.clone());

    assert!(controller.is_none());
    assert!(badge.is_hidden());
    assert_eq!(timer.active(), 0);
}

#[test]
fn test_at_most_one_timer_across_repeated_changes() {
    let timer = FakeTimer::default();
    let mut controller =
        AutoRefreshController::attach(Some(true), Some(FakeBadge::hidden()), timer.clone())
            .unwrap();

    for checked in [true, true, false, true, false, false, true] {
        controller.on_toggle_change(checked);
        assert!(timer.active() <= 1);
    }
    assert_eq!(timer.active(), 1);
    timer.advance(5000);
    assert_eq!(timer.reloads(), 1);
}
