//! Reads the panel's buttons from a Linux evdev device.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::scheduler::Event;

/// `struct input_event`: a `struct timeval` followed by u16 type, u16 code
/// and i32 value, all in native byte order.
const TIMEVAL_SIZE: usize = 2 * size_of::<usize>();
pub const INPUT_EVENT_SIZE: usize = TIMEVAL_SIZE + 8;

const EV_KEY: u16 = 0x01;
const KEY_PRESSED: i32 = 1;

const DEBOUNCE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy)]
pub struct KeyBindings {
    pub toggle: u16,
    pub shutdown: u16,
}

/// The key code of a key-down event, or None for anything else (releases,
/// autorepeat, sync and non-key events).
pub fn parse_key_press(record: &[u8; INPUT_EVENT_SIZE]) -> Option<u16> {
    let field = |at: usize| [record[at], record[at + 1]];
    let kind = u16::from_ne_bytes(field(TIMEVAL_SIZE));
    let code = u16::from_ne_bytes(field(TIMEVAL_SIZE + 2));
    let value = i32::from_ne_bytes([
        record[TIMEVAL_SIZE + 4],
        record[TIMEVAL_SIZE + 5],
        record[TIMEVAL_SIZE + 6],
        record[TIMEVAL_SIZE + 7],
    ]);
    (kind == EV_KEY && value == KEY_PRESSED).then_some(code)
}

/// Swallows presses that follow the last accepted one too closely.
#[derive(Debug)]
struct Debouncer {
    window: Duration,
    last: Option<Instant>,
}

impl Debouncer {
    fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    fn accept(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last
            && now.duration_since(last) < self.window
        {
            return false;
        }
        self.last = Some(now);
        true
    }
}

pub fn run_button_reader(
    task_tracker: &TaskTracker,
    path: PathBuf,
    bindings: KeyBindings,
    events: Sender<Event>,
    shutdown_token: CancellationToken,
) {
    task_tracker.spawn(async move {
        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                warn!("button device {} unavailable: {e}", path.display());
                return;
            }
        };
        info!("reading buttons from {}", path.display());

        let mut toggle = Debouncer::new(DEBOUNCE);
        let mut shutdown = Debouncer::new(DEBOUNCE);
        let mut record = [0u8; INPUT_EVENT_SIZE];
        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => break,
                read = file.read_exact(&mut record) => {
                    if let Err(e) = read {
                        warn!("stopped reading {}: {e}", path.display());
                        break;
                    }
                }
            }

            let Some(code) = parse_key_press(&record) else {
                continue;
            };
            let now = Instant::now();
            let event = if code == bindings.toggle && toggle.accept(now) {
                Event::Toggle
            } else if code == bindings.shutdown && shutdown.accept(now) {
                Event::Shutdown
            } else {
                continue;
            };
            debug!("key {code} pressed, sending {event:?}");
            if events.send(event).await.is_err() {
                break;
            }
        }
    });
}
