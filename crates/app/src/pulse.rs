//! Relay pulses run off the dispatch path.
//!
//! Each job gets its own blocking task, since the serial exchange is
//! synchronous. Failures go to a dedicated sink and never back into the
//! dispatch loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::controller::{Controller, PulseError};

/// One pulse to perform.
#[derive(Debug, Clone)]
pub struct PulseJob {
    /// Logical device the command was addressed to, for reporting.
    pub device: String,
    pub controller: Arc<Controller>,
    pub relay: u8,
}

/// A pulse that did not complete cleanly.
#[derive(Debug)]
pub struct PulseFailure {
    pub device: String,
    pub controller: String,
    pub relay: u8,
    pub error: PulseError,
}

/// Submits pulse jobs to the blocking pool.
#[derive(Debug, Clone)]
pub struct PulseRunner {
    hold: Duration,
    failures: mpsc::UnboundedSender<PulseFailure>,
}

impl PulseRunner {
    /// Create a runner holding relays for `hold`, and the receiving end of
    /// its failure sink.
    #[must_use]
    pub fn new(hold: Duration) -> (Self, mpsc::UnboundedReceiver<PulseFailure>) {
        let (failures, rx) = mpsc::unbounded_channel();
        (Self { hold, failures }, rx)
    }

    /// Start `job` in the background and return immediately.
    ///
    /// The task is detached from its submitter; dropping the handle does not
    /// cancel it.
    pub fn submit(&self, job: PulseJob) -> JoinHandle<()> {
        let hold = self.hold;
        let failures = self.failures.clone();
        tokio::task::spawn_blocking(move || {
            let PulseJob {
                device,
                controller,
                relay,
            } = job;
            if let Err(error) = controller.pulse(relay, hold) {
                let failure = PulseFailure {
                    device,
                    controller: controller.key().to_string(),
                    relay,
                    error,
                };
                if let Err(unreported) = failures.send(failure) {
                    let failure = unreported.0;
                    tracing::warn!(
                        device = %failure.device,
                        controller = %failure.controller,
                        relay = failure.relay,
                        error = %failure.error,
                        "pulse failed (failure sink closed)"
                    );
                }
            }
        })
    }
}

/// Log every failure delivered to the sink until all runners are dropped.
pub async fn report_failures(mut failures: mpsc::UnboundedReceiver<PulseFailure>) {
    while let Some(failure) = failures.recv().await {
        tracing::warn!(
            device = %failure.device,
            controller = %failure.controller,
            relay = failure.relay,
            error = %failure.error,
            "pulse failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::ScriptedLine;
    use udin2mqtt_domain::protocol::Request;

    fn controller(line: ScriptedLine) -> Arc<Controller> {
        Arc::new(Controller::connect(line).unwrap())
    }

    #[tokio::test]
    async fn should_pulse_in_background() {
        let line = ScriptedLine::new("UDIN-8R", "UDIN-8R");
        let log = Arc::clone(&line.log);
        let (runner, mut failures) = PulseRunner::new(Duration::from_millis(1));

        runner
            .submit(PulseJob {
                device: "blind1".to_string(),
                controller: controller(line),
                relay: 1,
            })
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![Request::Identify, Request::On(1), Request::Off(1)]
        );
        drop(runner);
        assert!(failures.recv().await.is_none());
    }

    #[tokio::test]
    async fn should_deliver_failure_to_sink() {
        let line = ScriptedLine::new("UDIN-8R", "UDIN-8R").failing(Request::On(2));
        let (runner, mut failures) = PulseRunner::new(Duration::from_millis(1));

        runner
            .submit(PulseJob {
                device: "blind1".to_string(),
                controller: controller(line),
                relay: 2,
            })
            .await
            .unwrap();

        let failure = failures.recv().await.unwrap();
        assert_eq!(failure.device, "blind1");
        assert_eq!(failure.controller, "udin_8r");
        assert_eq!(failure.relay, 2);
        assert!(failure.error.on.is_some());
    }

    #[tokio::test]
    async fn should_report_invalid_relay_as_failure() {
        let (runner, mut failures) = PulseRunner::new(Duration::from_millis(1));
        runner
            .submit(PulseJob {
                device: "blind1".to_string(),
                controller: controller(ScriptedLine::new("UDIN-44", "UDIN-44")),
                relay: 7,
            })
            .await
            .unwrap();
        let failure = failures.recv().await.unwrap();
        assert!(failure.error.on.is_some());
        assert!(failure.error.off.is_some());
    }

    #[tokio::test]
    async fn should_stop_reporting_when_runners_dropped() {
        let (runner, failures) = PulseRunner::new(Duration::from_millis(1));
        drop(runner);
        report_failures(failures).await;
    }
}
