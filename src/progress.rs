use serde::Serialize;
use tokio::sync::mpsc;

/// Pipeline stages in the order they occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Images,
    Audio,
    Video,
    Complete,
}

/// One progress update emitted by the pipeline. Progress is a percentage in
/// [0, 100], non-decreasing within a stage.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationProgress {
    pub stage: Stage,
    pub progress: f64,
    pub message: String,
}

/// Sending half of the progress stream. The pipeline emits into it from deep
/// inside the stages; the consumer drains the receiver independently of the
/// pipeline's control flow. Emitting never blocks and never fails the run,
/// even after the consumer has gone away.
#[derive(Clone)]
pub struct ProgressSender {
    tx: Option<mpsc::UnboundedSender<GenerationProgress>>,
}

impl ProgressSender {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<GenerationProgress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sender that drops every event, for callers that don't observe progress.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, stage: Stage, progress: f64, message: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(GenerationProgress {
                stage,
                progress,
                message: message.into(),
            });
        }
    }
}
