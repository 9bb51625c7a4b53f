use log::{debug, info, warn};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::scheduler::Event;

/// Turn process signals into scheduler events: SIGALRM asks for an update,
/// SIGUSR1 for a redraw, SIGINT and SIGTERM for a clean exit.
pub fn run_signal_listeners(
    task_tracker: &TaskTracker,
    events: Sender<Event>,
    shutdown_token: CancellationToken,
) -> std::io::Result<()> {
    let bindings = [
        (SignalKind::alarm(), Event::Update, "SIGALRM"),
        (SignalKind::user_defined1(), Event::Redraw, "SIGUSR1"),
        (SignalKind::interrupt(), Event::Terminate, "SIGINT"),
        (SignalKind::terminate(), Event::Terminate, "SIGTERM"),
    ];

    for (kind, event, name) in bindings {
        let mut stream = signal(kind)?;
        let events = events.clone();
        let shutdown_token = shutdown_token.clone();
        task_tracker.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_token.cancelled() => break,
                    received = stream.recv() => {
                        if received.is_none() {
                            break;
                        }
                        debug!("received {name}");
                        if events.send(event).await.is_err() {
                            warn!("dropping {name}, scheduler is gone");
                            break;
                        }
                    }
                }
            }
            info!("{name} listener stopped");
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_listeners_stop_on_cancel() {
        let task_tracker = TaskTracker::new();
        let (tx, _rx) = mpsc::channel(4);
        let token = CancellationToken::new();

        run_signal_listeners(&task_tracker, tx, token.clone()).unwrap();
        assert_eq!(task_tracker.len(), 4);

        token.cancel();
        task_tracker.close();
        tokio::time::timeout(Duration::from_secs(5), task_tracker.wait())
            .await
            .unwrap();
    }
}
