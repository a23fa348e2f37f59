// src/proctor.rs

//! Client-side proctoring protocol.
//!
//! `ProctorSession` is a pure state machine: feed it browser-level events and
//! it answers with the effects the client must perform. The only effect that
//! reaches the server is `Effect::SendTerminate`, which `ProctorDriver` fires
//! without waiting for the response.
//!
//! ```text
//! NotStarted -> Starting -> InProgress -> Terminated
//!                                      -> Submitted
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;

/// Notice shown once when a violation ends the exam.
pub const TERMINATION_NOTICE: &str =
    "Your test has been terminated because you left the test window.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProctorState {
    NotStarted,
    Starting,
    InProgress,
    Terminated,
    Submitted,
}

/// Observer firings that end the exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    VisibilityHidden,
    WindowBlur,
    FullscreenExit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProctorEvent {
    Begin,
    FullscreenGranted,
    /// Fullscreen refused or unsupported; the exam continues without it.
    FullscreenDenied,
    Violation(Violation),
    KeyDown(String),
    SubmitRequested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    RequestFullscreen,
    InstallObservers,
    SuppressKey(String),
    RemoveObservers,
    SendTerminate { attempt_id: String },
    SendSubmit { attempt_id: String },
    ExitFullscreen,
    ShowNotice(String),
    NavigateAway,
}

#[derive(Debug, Clone)]
pub struct ProctorSession {
    attempt_id: String,
    state: ProctorState,
    fullscreen_held: bool,
    notice_shown: bool,
}

impl ProctorSession {
    pub fn new(attempt_id: impl Into<String>) -> Self {
        Self {
            attempt_id: attempt_id.into(),
            state: ProctorState::NotStarted,
            fullscreen_held: false,
            notice_shown: false,
        }
    }

    pub fn state(&self) -> ProctorState {
        self.state
    }

    pub fn attempt_id(&self) -> &str {
        &self.attempt_id
    }

    pub fn handle(&mut self, event: ProctorEvent) -> Vec<Effect> {
        match (self.state, event) {
            (ProctorState::NotStarted, ProctorEvent::Begin) => {
                self.state = ProctorState::Starting;
                vec![Effect::RequestFullscreen]
            }
            (ProctorState::Starting, ProctorEvent::FullscreenGranted) => {
                self.fullscreen_held = true;
                self.state = ProctorState::InProgress;
                vec![Effect::InstallObservers]
            }
            (ProctorState::Starting, ProctorEvent::FullscreenDenied) => {
                tracing::warn!(attempt_id = %self.attempt_id, "fullscreen unavailable, continuing");
                self.state = ProctorState::InProgress;
                vec![Effect::InstallObservers]
            }
            (ProctorState::InProgress, ProctorEvent::KeyDown(key))
                if key == "Escape" || key == "F11" =>
            {
                vec![Effect::SuppressKey(key)]
            }
            (ProctorState::InProgress, ProctorEvent::Violation(violation)) => {
                self.terminate(violation)
            }
            (ProctorState::InProgress, ProctorEvent::SubmitRequested) => {
                self.state = ProctorState::Submitted;
                let mut effects = vec![
                    Effect::RemoveObservers,
                    Effect::SendSubmit {
                        attempt_id: self.attempt_id.clone(),
                    },
                ];
                if std::mem::take(&mut self.fullscreen_held) {
                    effects.push(Effect::ExitFullscreen);
                }
                effects
            }
            _ => Vec::new(),
        }
    }

    fn terminate(&mut self, violation: Violation) -> Vec<Effect> {
        tracing::info!(attempt_id = %self.attempt_id, ?violation, "proctoring violation");
        self.state = ProctorState::Terminated;

        let mut effects = vec![
            Effect::RemoveObservers,
            Effect::SendTerminate {
                attempt_id: self.attempt_id.clone(),
            },
        ];
        if std::mem::take(&mut self.fullscreen_held) {
            effects.push(Effect::ExitFullscreen);
        }
        if !std::mem::replace(&mut self.notice_shown, true) {
            effects.push(Effect::ShowNotice(TERMINATION_NOTICE.to_string()));
        }
        effects.push(Effect::NavigateAway);
        effects
    }
}

/// Server-side hook the proctor calls to end an attempt.
#[async_trait]
pub trait AttemptTerminator: Send + Sync + 'static {
    async fn terminate(&self, attempt_id: &str) -> Result<(), AppError>;
}

/// Runs a `ProctorSession`, dispatching `SendTerminate` on a background task.
pub struct ProctorDriver<T: AttemptTerminator> {
    session: ProctorSession,
    terminator: Arc<T>,
}

impl<T: AttemptTerminator> ProctorDriver<T> {
    pub fn new(session: ProctorSession, terminator: Arc<T>) -> Self {
        Self { session, terminator }
    }

    pub fn state(&self) -> ProctorState {
        self.session.state()
    }

    /// Applies `event` and returns the effects left for the UI.
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&mut self, event: ProctorEvent) -> Vec<Effect> {
        let mut ui_effects = Vec::new();
        for effect in self.session.handle(event) {
            match effect {
                Effect::SendTerminate { attempt_id } => {
                    let terminator = Arc::clone(&self.terminator);
                    tokio::spawn(async move {
                        // Already finished is fine here: the client has moved on.
                        if let Err(e) = terminator.terminate(&attempt_id).await {
                            tracing::warn!(%attempt_id, "terminate request failed: {}", e);
                        }
                    });
                }
                other => ui_effects.push(other),
            }
        }
        ui_effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn in_progress(fullscreen: bool) -> ProctorSession {
        let mut session = ProctorSession::new("a1");
        session.handle(ProctorEvent::Begin);
        let grant = if fullscreen {
            ProctorEvent::FullscreenGranted
        } else {
            ProctorEvent::FullscreenDenied
        };
        assert_eq!(session.handle(grant), vec![Effect::InstallObservers]);
        session
    }

    fn terminate_count(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::SendTerminate { .. }))
            .count()
    }

    #[test]
    fn test_begin_requests_fullscreen() {
        let mut session = ProctorSession::new("a1");
        assert_eq!(session.handle(ProctorEvent::Begin), vec![Effect::RequestFullscreen]);
        assert_eq!(session.state(), ProctorState::Starting);
    }

    #[test]
    fn test_fullscreen_denial_still_starts() {
        let session = in_progress(false);
        assert_eq!(session.state(), ProctorState::InProgress);
    }

    #[test]
    fn test_violation_terminates_once() {
        let mut session = in_progress(true);
        let first = session.handle(ProctorEvent::Violation(Violation::VisibilityHidden));
        assert_eq!(
            first,
            vec![
                Effect::RemoveObservers,
                Effect::SendTerminate {
                    attempt_id: "a1".to_string()
                },
                Effect::ExitFullscreen,
                Effect::ShowNotice(TERMINATION_NOTICE.to_string()),
                Effect::NavigateAway,
            ]
        );
        assert_eq!(session.state(), ProctorState::Terminated);

        // blur and fullscreen-exit usually fire right after visibility change
        let second = session.handle(ProctorEvent::Violation(Violation::WindowBlur));
        let third = session.handle(ProctorEvent::Violation(Violation::FullscreenExit));
        assert!(second.is_empty());
        assert!(third.is_empty());
    }

    #[test]
    fn test_no_exit_fullscreen_when_not_held() {
        let mut session = in_progress(false);
        let effects = session.handle(ProctorEvent::Violation(Violation::WindowBlur));
        assert!(!effects.contains(&Effect::ExitFullscreen));
        assert_eq!(terminate_count(&effects), 1);
    }

    #[test]
    fn test_escape_and_f11_are_suppressed() {
        let mut session = in_progress(true);
        assert_eq!(
            session.handle(ProctorEvent::KeyDown("Escape".to_string())),
            vec![Effect::SuppressKey("Escape".to_string())]
        );
        assert_eq!(
            session.handle(ProctorEvent::KeyDown("F11".to_string())),
            vec![Effect::SuppressKey("F11".to_string())]
        );
        assert!(session.handle(ProctorEvent::KeyDown("a".to_string())).is_empty());
        assert_eq!(session.state(), ProctorState::InProgress);
    }

    #[test]
    fn test_violations_before_start_are_ignored() {
        let mut session = ProctorSession::new("a1");
        session.handle(ProctorEvent::Begin);
        assert!(session
            .handle(ProctorEvent::Violation(Violation::WindowBlur))
            .is_empty());
        assert_eq!(session.state(), ProctorState::Starting);
    }

    #[test]
    fn test_submit_is_explicit_and_final() {
        let mut session = in_progress(true);
        let effects = session.handle(ProctorEvent::SubmitRequested);
        assert!(effects.contains(&Effect::SendSubmit {
            attempt_id: "a1".to_string()
        }));
        assert_eq!(session.state(), ProctorState::Submitted);
        assert!(session
            .handle(ProctorEvent::Violation(Violation::VisibilityHidden))
            .is_empty());
    }

    struct RecordingTerminator {
        tx: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl AttemptTerminator for RecordingTerminator {
        async fn terminate(&self, attempt_id: &str) -> Result<(), AppError> {
            let _ = self.tx.send(attempt_id.to_string());
            Err(AppError::InvalidAttemptState("already finished".to_string()))
        }
    }

    #[tokio::test]
    async fn test_driver_fires_terminate_without_blocking() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut driver = ProctorDriver::new(in_progress(true), Arc::new(RecordingTerminator { tx }));

        let effects = driver.dispatch(ProctorEvent::Violation(Violation::FullscreenExit));
        assert_eq!(terminate_count(&effects), 0);
        assert!(effects.contains(&Effect::NavigateAway));
        assert_eq!(driver.state(), ProctorState::Terminated);

        let sent = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(sent.as_deref(), Some("a1"));

        driver.dispatch(ProctorEvent::Violation(Violation::WindowBlur));
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }
}
