use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// One progress update from a research run.
///
/// `report` stays empty on every event except the final one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchEvent {
    pub status: String,
    pub report: String,
    #[serde(skip)]
    done: bool,
}

impl ResearchEvent {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            report: String::new(),
            done: false,
        }
    }

    /// The last event of a run, carrying the report.
    pub fn finished(status: impl Into<String>, report: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            report: report.into(),
            done: true,
        }
    }

    /// A terminal event with no report.
    pub fn terminal(status: impl Into<String>) -> Self {
        Self::finished(status, String::new())
    }

    pub fn is_final(&self) -> bool {
        self.done
    }
}

/// Stream of events for one run. Ends after the final event.
pub type ResearchStream = ReceiverStream<ResearchEvent>;

/// Sending half of a run's event channel.
///
/// A dropped receiver means nobody is listening any more; the run still
/// finishes, so send errors are ignored.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<ResearchEvent>,
}

impl EventSink {
    pub fn channel(capacity: usize) -> (Self, ResearchStream) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, ReceiverStream::new(rx))
    }

    pub async fn emit(&self, event: ResearchEvent) {
        if self.tx.send(event).await.is_err() {
            tracing::trace!("Research event dropped; receiver closed");
        }
    }

    pub async fn status(&self, status: impl Into<String>) {
        self.emit(ResearchEvent::status(status)).await;
    }
}
