//! The control loop. Everything that fetches, decodes or draws runs here, one
//! action at a time; signal handlers and the button reader only send
//! [`Event`]s.

use std::collections::VecDeque;
use std::time::Duration;

use log::{debug, error, info, warn};
use statuspanel::{DeviceIdentity, Geometry, TruncatedImagePolicy, decode_update};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::{Instant, sleep_until};

use crate::config::Config;
use crate::display::{self, DisplayDriver};
use crate::panel::{FetchFailure, Mode, Panel};
use crate::service::{FetchError, Fetcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Fetch and decode a new update.
    Update,
    /// Bring the panel in line with the requested image.
    Redraw,
    /// Select the next image.
    Toggle,
    /// Stop the daemon.
    Terminate,
    /// Stop the daemon and, if configured, power the device off.
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Update,
    Redraw,
    Toggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Terminated,
    Shutdown,
    /// Every event source went away.
    Disconnected,
}

pub struct Scheduler<F, D> {
    fetcher: F,
    display: D,
    panel: Panel,
    identity: DeviceIdentity,
    geometry: Geometry,
    truncated_images: TruncatedImagePolicy,
    update_interval: Duration,
    retry_interval: Duration,
    events: mpsc::Receiver<Event>,
    queue: VecDeque<Action>,
    alarm: Option<Instant>,
}

impl<F, D> Scheduler<F, D>
where
    F: Fetcher,
    D: DisplayDriver,
{
    pub fn new(
        config: &Config,
        identity: DeviceIdentity,
        fetcher: F,
        display: D,
        events: mpsc::Receiver<Event>,
    ) -> Self {
        Self {
            fetcher,
            display,
            panel: Panel::new(),
            identity,
            geometry: config.geometry(),
            truncated_images: config.truncated_images,
            update_interval: config.update_interval(),
            retry_interval: config.retry_interval(),
            events,
            queue: VecDeque::new(),
            alarm: None,
        }
    }

    pub fn panel(&self) -> Panel {
        self.panel.clone()
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Run until told to stop. Starts with an update; after that, updates
    /// happen when the alarm goes off or an `Update` event arrives.
    pub async fn run(&mut self) -> ExitReason {
        self.queue.push_back(Action::Update);
        loop {
            while let Some(action) = self.queue.pop_front() {
                self.perform(action).await;
                if let Some(reason) = self.collect_pending() {
                    return reason;
                }
            }

            let alarm = self.alarm;
            let event = tokio::select! {
                event = self.events.recv() => event,
                _ = wait_for(alarm) => {
                    self.alarm = None;
                    Some(Event::Update)
                }
            };
            match event {
                Some(event) => {
                    if let Some(reason) = self.enqueue(event) {
                        return reason;
                    }
                }
                None => {
                    warn!("all event sources closed, stopping");
                    return ExitReason::Disconnected;
                }
            }
        }
    }

    /// Move everything already waiting on the channel into the queue.
    fn collect_pending(&mut self) -> Option<ExitReason> {
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    if let Some(reason) = self.enqueue(event) {
                        return Some(reason);
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
            }
        }
    }

    fn enqueue(&mut self, event: Event) -> Option<ExitReason> {
        let action = match event {
            Event::Terminate => {
                info!("received terminate request");
                return Some(ExitReason::Terminated);
            }
            Event::Shutdown => {
                info!("received shutdown request");
                return Some(ExitReason::Shutdown);
            }
            Event::Update => Action::Update,
            Event::Redraw => Action::Redraw,
            Event::Toggle => Action::Toggle,
        };
        self.push(action);
        None
    }

    /// Updates and redraws already waiting would do the same work again, so
    /// they aren't queued twice. Every toggle counts.
    fn push(&mut self, action: Action) {
        if action != Action::Toggle && self.queue.contains(&action) {
            return;
        }
        self.queue.push_back(action);
    }

    async fn perform(&mut self, action: Action) {
        match action {
            Action::Update => self.update().await,
            Action::Redraw => {
                if let Err(e) = self.panel.redraw(&mut self.display).await {
                    error!("failed to draw: {e}");
                }
            }
            Action::Toggle => {
                if self.panel.toggle().await {
                    self.push(Action::Redraw);
                }
            }
        }
    }

    async fn update(&mut self) {
        let data = match self.fetcher.fetch().await {
            Ok(data) => data,
            Err(FetchError::NotFound { status }) => {
                info!("no update available (HTTP {status}), device needs pairing");
                return self.update_failed(FetchFailure::MissingUpdate).await;
            }
            Err(e @ FetchError::Connection(_)) => {
                error!("failed to fetch update: {e}");
                return self.update_failed(FetchFailure::ConnectionError).await;
            }
        };

        match decode_update(&data, &self.identity, self.geometry, self.truncated_images) {
            Ok(update) => {
                debug!("service suggests waking up in {}s", update.wakeup_hint);
                if !update.skipped.is_empty() {
                    warn!(
                        "showing {} images, {} skipped",
                        update.images.len(),
                        update.skipped.len()
                    );
                }
                if self.panel.fetch_succeeded(update.images).await {
                    info!("update changed the requested image");
                }
                self.push(Action::Redraw);
                self.arm(self.update_interval);
            }
            Err(e) => {
                error!("invalid update: {e}");
                self.update_failed(FetchFailure::InvalidUpdate).await;
            }
        }
    }

    async fn update_failed(&mut self, failure: FetchFailure) {
        if self.panel.fetch_failed(failure).await {
            let resolution = self.display.resolution();
            let screen = match self.panel.mode().await {
                Mode::Pairing => {
                    display::pairing_screen(&self.identity.pairing_url(), resolution)
                }
                _ => Ok(display::error_screen(resolution)),
            };
            let shown = match screen {
                Ok(screen) => self.panel.show_screen(&mut self.display, screen).await,
                Err(e) => Err(e),
            };
            if let Err(e) = shown {
                error!("failed to show {failure:?} screen: {e}");
            }
        }
        self.arm(self.retry_interval);
    }

    fn arm(&mut self, after: Duration) {
        debug!("next update in {}s", after.as_secs());
        self.alarm = Some(Instant::now() + after);
    }
}

async fn wait_for(alarm: Option<Instant>) {
    match alarm {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
