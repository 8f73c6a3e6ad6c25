use std::time::Duration;

use super::DEFAULT_REFRESH_PERIOD;

/// Whether the page is currently reloading itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Stopped,
    Running,
}

impl RefreshState {
    /// Map the toggle's checked value to the state it asks for
    pub fn from_checked(checked: bool) -> Self {
        if checked {
            RefreshState::Running
        } else {
            RefreshState::Stopped
        }
    }

    pub fn is_running(self) -> bool {
        self == RefreshState::Running
    }
}

/// Visual "live" badge
pub trait Indicator {
    fn show(&mut self);
    fn hide(&mut self);
}

/// Recurring timer whose every tick reloads the page
pub trait RefreshTimer {
    type Handle;

    /// Start ticking every `period`; the first tick happens after one period
    fn schedule(&mut self, period: Duration) -> Self::Handle;

    fn cancel(&mut self, handle: Self::Handle);
}

/// Keeps the reload timer and the live indicator in step with the toggle
///
/// The running state is not stored separately: the controller is running
/// exactly when it holds a timer handle, so there is never more than one
/// active timer.
pub struct AutoRefreshController<I: Indicator, T: RefreshTimer> {
    indicator: Option<I>,
    timer: T,
    active: Option<T::Handle>,
    period: Duration,
}

impl<I: Indicator, T: RefreshTimer> AutoRefreshController<I, T> {
    /// Create a stopped controller with the default 5 second period
    pub fn new(indicator: Option<I>, timer: T) -> Self {
        Self {
            indicator,
            timer,
            active: None,
            period: DEFAULT_REFRESH_PERIOD,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Bind to the page's toggle
    ///
    /// `toggle_checked` is `None` when the page has no toggle, in which case
    /// there is nothing to control and no controller is returned. When the
    /// toggle starts checked the controller starts running straight away.
    pub fn attach(toggle_checked: Option<bool>, indicator: Option<I>, timer: T) -> Option<Self> {
        Self::attach_with_period(toggle_checked, indicator, timer, DEFAULT_REFRESH_PERIOD)
    }

    /// Like [`attach`](Self::attach) but with a custom period
    pub fn attach_with_period(
        toggle_checked: Option<bool>,
        indicator: Option<I>,
        timer: T,
        period: Duration,
    ) -> Option<Self> {
        let checked = toggle_checked?;
        let mut controller = Self::new(indicator, timer).with_period(period);
        if checked {
            controller.start();
        }
        Some(controller)
    }

    /// Handle a toggle change event
    pub fn on_toggle_change(&mut self, checked: bool) -> RefreshState {
        match RefreshState::from_checked(checked) {
            RefreshState::Running => self.start(),
            RefreshState::Stopped => self.stop(),
        }
        self.state()
    }

    /// Flip the current state, as a click on the toggle would
    pub fn toggle(&mut self) -> RefreshState {
        let checked = !self.state().is_running();
        self.on_toggle_change(checked)
    }

    pub fn start(&mut self) {
        if let Some(indicator) = self.indicator.as_mut() {
            indicator.show();
        }
        if self.active.is_some() {
            tracing::debug!(target: "refresh", "Auto-refresh already running");
            return;
        }
        self.active = Some(self.timer.schedule(self.period));
        tracing::info!(target: "refresh", "Auto-refresh started every {:?}", self.period);
    }

    pub fn stop(&mut self) {
        if let Some(indicator) = self.indicator.as_mut() {
            indicator.hide();
        }
        if let Some(handle) = self.active.take() {
            self.timer.cancel(handle);
            tracing::info!(target: "refresh", "Auto-refresh stopped");
        }
    }

    pub fn state(&self) -> RefreshState {
        if self.active.is_some() {
            RefreshState::Running
        } else {
            RefreshState::Stopped
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn indicator(&self) -> Option<&I> {
        self.indicator.as_ref()
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }
}
