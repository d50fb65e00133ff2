use emotrack_core::{
    AnalyticsConfig, Clock, ConfigError, DetectedFace, FrameResult, Session, SessionError,
    SessionSummary, TimelinePoint,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from async callers to the engine thread.
enum EngineRequest {
    Process {
        faces: Vec<DetectedFace>,
        reply: oneshot::Sender<Option<FrameResult>>,
    },
    Calibrate {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    ClearCalibration {
        reply: oneshot::Sender<()>,
    },
    Summary {
        reply: oneshot::Sender<SessionSummary>,
    },
    Timeline {
        window_secs: u64,
        reply: oneshot::Sender<Vec<TimelinePoint>>,
    },
    UpdateConfig {
        config: AnalyticsConfig,
        reply: oneshot::Sender<Result<(), ConfigError>>,
    },
    End {
        reply: oneshot::Sender<SessionSummary>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> EngineRequest,
    ) -> Result<T, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Run one detector frame through the session. `None` once ended.
    pub async fn process(&self, faces: Vec<DetectedFace>) -> Result<Option<FrameResult>, EngineError> {
        self.request(|reply| EngineRequest::Process { faces, reply }).await
    }

    /// Calibrate against the latest primary face.
    pub async fn calibrate(&self) -> Result<(), EngineError> {
        self.request(|reply| EngineRequest::Calibrate { reply })
            .await?
            .map_err(EngineError::from)
    }

    pub async fn clear_calibration(&self) -> Result<(), EngineError> {
        self.request(|reply| EngineRequest::ClearCalibration { reply })
            .await
    }

    pub async fn summary(&self) -> Result<SessionSummary, EngineError> {
        self.request(|reply| EngineRequest::Summary { reply }).await
    }

    pub async fn timeline(&self, window_secs: u64) -> Result<Vec<TimelinePoint>, EngineError> {
        self.request(|reply| EngineRequest::Timeline { window_secs, reply })
            .await
    }

    pub async fn update_config(&self, config: AnalyticsConfig) -> Result<(), EngineError> {
        self.request(|reply| EngineRequest::UpdateConfig { config, reply })
            .await?
            .map_err(EngineError::from)
    }

    /// End the session and return its final summary. The thread keeps
    /// serving queries until every handle is dropped.
    pub async fn end(&self) -> Result<SessionSummary, EngineError> {
        self.request(|reply| EngineRequest::End { reply }).await
    }
}

/// Start `session` on a dedicated OS thread that owns it exclusively.
///
/// Frames are processed strictly in arrival order; the thread exits when
/// the last handle is dropped.
pub fn spawn_engine<C>(mut session: Session<C>) -> Result<EngineHandle, EngineError>
where
    C: Clock + Send + 'static,
{
    session.start();
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(64);

    std::thread::Builder::new()
        .name("emotrack-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Process { faces, reply } => {
                        let _ = reply.send(session.process_frame(&faces));
                    }
                    EngineRequest::Calibrate { reply } => {
                        let _ = reply.send(session.calibrate());
                    }
                    EngineRequest::ClearCalibration { reply } => {
                        session.clear_calibration();
                        let _ = reply.send(());
                    }
                    EngineRequest::Summary { reply } => {
                        let _ = reply.send(session.summary());
                    }
                    EngineRequest::Timeline { window_secs, reply } => {
                        let _ = reply.send(session.timeline(window_secs));
                    }
                    EngineRequest::UpdateConfig { config, reply } => {
                        let _ = reply.send(session.update_config(config));
                    }
                    EngineRequest::End { reply } => {
                        session.end();
                        let _ = reply.send(session.summary());
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx })
}
