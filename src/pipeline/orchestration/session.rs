use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AnalysisError, ErrorNotification};
use crate::pipeline::types::{
    AnalysisRequest, AnalysisResult, AnalysisStatus, Classification, DataType, RequestId,
};

struct Session {
    next_id: u64,
    current: Option<AnalysisRequest>,
    result: AnalysisResult,
    stale_discards: u64,
}

/// The single-writer session record: tracked request, published result and
/// the channels that fan them out.
pub(crate) struct SessionState {
    id: Uuid,
    inner: Mutex<Session>,
    results: watch::Sender<AnalysisResult>,
    notifications: broadcast::Sender<ErrorNotification>,
}

impl SessionState {
    pub(crate) fn new(notification_capacity: usize) -> Self {
        let (results, _) = watch::channel(AnalysisResult::idle());
        let (notifications, _) = broadcast::channel(notification_capacity.max(1));
        Self {
            id: Uuid::new_v4(),
            inner: Mutex::new(Session {
                next_id: 1,
                current: None,
                result: AnalysisResult::idle(),
                stale_discards: 0,
            }),
            results,
            notifications,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn ensure_idle_for_submission(&self) -> Result<(), AnalysisError> {
        if self.lock().result.status == AnalysisStatus::Analyzing {
            return Err(self.reject_busy());
        }
        Ok(())
    }

    /// Allocates the next request and moves the session to `Analyzing`.
    pub(crate) fn begin(&self, data_type: DataType) -> Result<AnalysisRequest, AnalysisError> {
        let mut session = self.lock();
        if session.result.status == AnalysisStatus::Analyzing {
            drop(session);
            return Err(self.reject_busy());
        }

        let request = Self::allocate(&mut session, data_type);
        session.current = Some(request.clone());
        session.result = AnalysisResult::analyzing(&request);
        self.results.send_replace(session.result.clone());

        info!("Submitted {} analysis {}", data_type, request.id);
        Ok(request)
    }

    /// Publishes an `Error` record for an input that never reached a classifier.
    pub(crate) fn fail_before_dispatch(
        &self,
        data_type: DataType,
        error: &AnalysisError,
    ) -> AnalysisRequest {
        let mut session = self.lock();
        let request = Self::allocate(&mut session, data_type);
        session.current = None;
        session.result = AnalysisResult::failed(&request, error);
        self.results.send_replace(session.result.clone());
        drop(session);

        warn!("Rejected {} input {}: {}", data_type, request.id, error);
        self.notify(error);
        request
    }

    /// Applies a classifier outcome unless a reset or newer submission has
    /// superseded the request. Returns whether the outcome was applied.
    pub(crate) fn settle(
        &self,
        request: &AnalysisRequest,
        outcome: Result<Classification, AnalysisError>,
    ) -> bool {
        let mut session = self.lock();
        if session.current.as_ref().map(|r| r.id) != Some(request.id) {
            session.stale_discards += 1;
            debug!("Discarding stale result for request {}", request.id);
            return false;
        }

        session.current = None;
        match outcome {
            Ok(classification) => {
                session.result = AnalysisResult::complete(request, &classification);
                self.results.send_replace(session.result.clone());
                info!(
                    "{} Severity: {}{}",
                    session.result.summary().unwrap_or_default(),
                    session
                        .result
                        .severity
                        .map(|s| s.to_string())
                        .unwrap_or_default(),
                    if classification.low_confidence {
                        " (low confidence: nothing to classify)"
                    } else {
                        ""
                    }
                );
            }
            Err(error) => {
                session.result = AnalysisResult::failed(request, &error);
                self.results.send_replace(session.result.clone());
                drop(session);
                warn!("Analysis {} failed: {}", request.id, error);
                self.notify(&error);
            }
        }
        true
    }

    pub(crate) fn reset(&self) {
        let mut session = self.lock();
        if let Some(request) = session.current.take() {
            info!("Reset abandons in-flight request {}", request.id);
        } else {
            info!("Session reset");
        }
        session.result = AnalysisResult::idle();
        self.results.send_replace(session.result.clone());
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn snapshot(&self) -> AnalysisResult {
        self.lock().result.clone()
    }

    pub(crate) fn current_request(&self) -> Option<AnalysisRequest> {
        self.lock().current.clone()
    }

    pub(crate) fn stale_discards(&self) -> u64 {
        self.lock().stale_discards
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<AnalysisResult> {
        self.results.subscribe()
    }

    pub(crate) fn notifications(&self) -> broadcast::Receiver<ErrorNotification> {
        self.notifications.subscribe()
    }

    fn allocate(session: &mut Session, data_type: DataType) -> AnalysisRequest {
        let id = RequestId(session.next_id);
        session.next_id += 1;
        AnalysisRequest::new(id, data_type)
    }

    fn reject_busy(&self) -> AnalysisError {
        let error = AnalysisError::Busy;
        warn!("Submission rejected: {}", error);
        self.notify(&error);
        error
    }

    fn notify(&self, error: &AnalysisError) {
        // no subscribers is fine
        let _ = self.notifications.send(ErrorNotification::from(error));
    }
}
