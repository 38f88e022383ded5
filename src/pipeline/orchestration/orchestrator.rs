use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, watch};
use tower::ServiceExt;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use super::classifier_step::ClassifierStep;
use super::service::classifier_service::{
    into_analysis_error, BoxedClassifier, ClassificationJob, ClassifierServiceBuilder,
};
use super::session::SessionState;
use super::step::surface_analyzer::SurfaceAnalyzer;
use crate::config::{OrchestratorConfig, Settings};
use crate::error::{AnalysisError, ErrorNotification};
use crate::intake::{InputAdapter, Upload};
use crate::pipeline::types::{AnalysisRequest, AnalysisResult, DataType, RawInput, RequestId};

/// Runs one analysis session: at most one classification in flight, and
/// the most recent submission always wins.
///
/// Submissions and resets never block; classification runs on a spawned task
/// and its outcome is applied only while its request is still the tracked one.
/// Must be used from within a tokio runtime.
pub struct AnalysisOrchestrator {
    session: Arc<SessionState>,
    classifier: BoxedClassifier,
    adapter: InputAdapter,
    timeout: Option<Duration>,
}

impl AnalysisOrchestrator {
    pub fn builder() -> AnalysisOrchestratorBuilder {
        AnalysisOrchestratorBuilder::new()
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::builder().settings(settings).build()
    }

    /// Starts classifying `input` as `data_type` and returns the new request id.
    pub fn submit(&self, input: RawInput, data_type: DataType) -> Result<RequestId, AnalysisError> {
        let request = self.session.begin(data_type)?;
        let id = request.id;
        self.dispatch(request, PendingInput::Decoded(input));
        Ok(id)
    }

    /// Submits an upload. Format and size are checked here; a rejection is
    /// published as an `Error` record for the declared data type. Decoding
    /// happens on the classification task, so decode failures settle later.
    pub fn submit_upload(
        &self,
        upload: Upload,
        data_type: DataType,
    ) -> Result<RequestId, AnalysisError> {
        self.session.ensure_idle_for_submission()?;

        if let Err(error) = self.adapter.check(&upload, data_type) {
            self.session.fail_before_dispatch(data_type, &error);
            return Err(error);
        }

        let request = self.session.begin(data_type)?;
        let id = request.id;
        self.dispatch(
            request,
            PendingInput::Upload {
                adapter: self.adapter.clone(),
                upload,
            },
        );
        Ok(id)
    }

    pub fn reset(&self) {
        self.session.reset();
    }

    pub fn session_id(&self) -> Uuid {
        self.session.id()
    }

    pub fn snapshot(&self) -> AnalysisResult {
        self.session.snapshot()
    }

    pub fn current_request(&self) -> Option<AnalysisRequest> {
        self.session.current_request()
    }

    /// Number of completions dropped because their request had been superseded.
    pub fn stale_discards(&self) -> u64 {
        self.session.stale_discards()
    }

    pub fn subscribe(&self) -> watch::Receiver<AnalysisResult> {
        self.session.subscribe()
    }

    pub fn notifications(&self) -> broadcast::Receiver<ErrorNotification> {
        self.session.notifications()
    }

    /// Waits until the session leaves `Analyzing` and returns that record.
    pub async fn wait_for_settled(&self) -> AnalysisResult {
        let mut results = self.subscribe();
        let settled = match results.wait_for(|result| !result.is_analyzing()).await {
            Ok(result) => result.clone(),
            Err(_) => self.snapshot(),
        };
        settled
    }

    fn dispatch(&self, request: AnalysisRequest, pending: PendingInput) {
        let session = Arc::clone(&self.session);
        let classifier = self.classifier.clone();
        let timeout = self.timeout;
        let span = info_span!(
            "analysis",
            session_id = %self.session.id(),
            request_id = request.id.0,
            data_type = %request.data_type
        );

        tokio::spawn(
            async move {
                let started = Instant::now();
                let outcome = match pending.resolve(request.data_type).await {
                    Ok(input) => {
                        let job = ClassificationJob {
                            request: request.clone(),
                            input,
                        };
                        classifier
                            .oneshot(job)
                            .await
                            .map_err(|e| into_analysis_error(e, timeout))
                    }
                    Err(error) => Err(error),
                };
                debug!("Analysis returned after {:?}", started.elapsed());
                session.settle(&request, outcome);
            }
            .instrument(span),
        );
    }
}

/// Input for a dispatched request, decoded or still raw.
enum PendingInput {
    Decoded(RawInput),
    Upload { adapter: InputAdapter, upload: Upload },
}

impl PendingInput {
    async fn resolve(self, data_type: DataType) -> Result<RawInput, AnalysisError> {
        match self {
            PendingInput::Decoded(input) => Ok(input),
            PendingInput::Upload { adapter, upload } => {
                tokio::task::spawn_blocking(move || adapter.decode(&upload, data_type))
                    .await
                    .map_err(|e| AnalysisError::DecodeFailure(format!("decode task failed: {e}")))?
            }
        }
    }
}

pub struct AnalysisOrchestratorBuilder {
    classifier: Option<Box<dyn ClassifierStep>>,
    adapter: InputAdapter,
    orchestrator: OrchestratorConfig,
}

impl AnalysisOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            classifier: None,
            adapter: InputAdapter::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }

    /// Takes the adapter, classifiers and timeout from loaded settings.
    pub fn settings(mut self, settings: &Settings) -> Self {
        self.classifier = Some(Box::new(SurfaceAnalyzer::from_settings(settings)));
        self.adapter = InputAdapter::new(settings.intake.clone())
            .with_default_nominal_thickness(settings.thickness.default_nominal_thickness);
        self.orchestrator = settings.orchestrator.clone();
        self
    }

    // Replaces the classifier, this will override the settings.
    pub fn classifier(mut self, classifier: Box<dyn ClassifierStep>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn adapter(mut self, adapter: InputAdapter) -> Self {
        self.adapter = adapter;
        self
    }

    // Sets the classification bound in milliseconds, 0 disables it.
    pub fn classification_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.orchestrator.classification_timeout_ms = timeout_ms;
        self
    }

    pub fn notification_capacity(mut self, capacity: usize) -> Self {
        self.orchestrator.notification_capacity = capacity;
        self
    }

    pub fn build(self) -> AnalysisOrchestrator {
        let timeout = self.orchestrator.classification_timeout();
        let classifier = self
            .classifier
            .unwrap_or_else(|| Box::new(SurfaceAnalyzer::default()));

        AnalysisOrchestrator {
            session: Arc::new(SessionState::new(self.orchestrator.notification_capacity)),
            classifier: ClassifierServiceBuilder::new(classifier)
                .timeout(timeout)
                .build(),
            adapter: self.adapter,
            timeout,
        }
    }
}

impl Default for AnalysisOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline::services::Severity;
    use crate::pipeline::types::{
        AnalysisStatus, CScanGrid, ClassCounts, Classification, SampleCounts,
    };
    use async_trait::async_trait;
    use image::{ImageBuffer, Rgb};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    type Gate = oneshot::Sender<Result<Classification, AnalysisError>>;

    /// Each call waits for the test to release the matching gate.
    struct GatedClassifier {
        gates: Arc<Mutex<VecDeque<oneshot::Receiver<Result<Classification, AnalysisError>>>>>,
    }

    impl GatedClassifier {
        fn with_gates(count: usize) -> (Self, Vec<Gate>) {
            let mut senders = Vec::new();
            let mut receivers = VecDeque::new();
            for _ in 0..count {
                let (tx, rx) = oneshot::channel();
                senders.push(tx);
                receivers.push_back(rx);
            }
            let classifier = Self {
                gates: Arc::new(Mutex::new(receivers)),
            };
            (classifier, senders)
        }
    }

    #[async_trait]
    impl ClassifierStep for GatedClassifier {
        async fn classify(
            &self,
            _input: RawInput,
            _data_type: DataType,
        ) -> Result<Classification, AnalysisError> {
            let gate = self.gates.lock().unwrap().pop_front();
            match gate {
                Some(gate) => gate.await.unwrap_or_else(|_| {
                    Err(AnalysisError::ClassificationFailure("gate dropped".into()))
                }),
                None => Err(AnalysisError::ClassificationFailure("no gate".into())),
            }
        }

        fn name(&self) -> &'static str {
            "GatedClassifier"
        }
    }

    fn samples(corroded: u64, healthy: u64) -> Classification {
        Classification::from_counts(ClassCounts::Samples(SampleCounts {
            corroded,
            healthy,
            missing: 0,
        }))
    }

    fn grid_input() -> RawInput {
        RawInput::cscan(CScanGrid::new(1, 4, vec![10.0, 10.0, 10.0, 5.0], 10.0).unwrap())
    }

    fn gated(count: usize) -> (AnalysisOrchestrator, Vec<Gate>) {
        let (classifier, gates) = GatedClassifier::with_gates(count);
        let orchestrator = AnalysisOrchestrator::builder()
            .classifier(Box::new(classifier))
            .build();
        (orchestrator, gates)
    }

    async fn wait_for_discards(orchestrator: &AnalysisOrchestrator, expected: u64) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while orchestrator.stale_discards() < expected {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("stale completion was never observed");
    }

    #[tokio::test]
    async fn starts_idle_without_data_type() {
        let orchestrator = AnalysisOrchestrator::builder().build();
        assert_eq!(orchestrator.snapshot(), AnalysisResult::idle());
        assert!(orchestrator.current_request().is_none());
    }

    #[tokio::test]
    async fn image_submission_completes_with_severity() {
        let orchestrator = AnalysisOrchestrator::from_settings(&Settings::default());
        let image = ImageBuffer::from_fn(10, 10, |x, _| {
            if x < 3 {
                Rgb([220, 200, 40])
            } else {
                Rgb([40, 180, 60])
            }
        });

        let id = orchestrator
            .submit(RawInput::image(image), DataType::Image)
            .unwrap();
        let result = orchestrator.wait_for_settled().await;

        assert_eq!(result.request_id, Some(id));
        assert_eq!(result.status, AnalysisStatus::Complete);
        assert_eq!(result.data_type, Some(DataType::Image));
        assert!((result.corrosion_percentage - 30.0).abs() < 1e-9);
        assert_eq!(result.severity, Some(Severity::Moderate));
        assert!(orchestrator.current_request().is_none());
    }

    #[tokio::test]
    async fn cscan_upload_completes() {
        let orchestrator = AnalysisOrchestrator::from_settings(&Settings::default());
        let upload = Upload::new("plate.csv", b"# nominal = 10\n10,9.5\n8,7\n".to_vec())
            .with_mime("text/csv");

        orchestrator.submit_upload(upload, DataType::CScan).unwrap();
        let result = orchestrator.wait_for_settled().await;

        assert_eq!(result.status, AnalysisStatus::Complete);
        assert_eq!(result.data_type, Some(DataType::CScan));
        assert_eq!(result.corrosion_percentage, 50.0);
        assert_eq!(result.severity, Some(Severity::High));
    }

    #[tokio::test]
    async fn rejected_upload_publishes_tagged_error() {
        let orchestrator = AnalysisOrchestrator::builder().build();
        let mut notifications = orchestrator.notifications();
        let upload = Upload::new("plate.docx", vec![0; 4]);

        let err = orchestrator
            .submit_upload(upload, DataType::CScan)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidFormat(_)));

        let result = orchestrator.snapshot();
        assert_eq!(result.status, AnalysisStatus::Error);
        assert_eq!(result.data_type, Some(DataType::CScan));
        assert_eq!(result.corrosion_percentage, 0.0);
        assert!(result.severity.is_none());
        assert_eq!(
            notifications.recv().await.unwrap().kind,
            ErrorKind::InvalidFormat
        );
    }

    #[tokio::test]
    async fn upload_decodes_after_submission_returns() {
        let orchestrator = AnalysisOrchestrator::builder().build();
        let mut notifications = orchestrator.notifications();
        let upload = Upload::new("surface.png", b"not a png".to_vec()).with_mime("image/png");

        // accepted: only the classification task discovers the bad container
        let id = orchestrator.submit_upload(upload, DataType::Image).unwrap();
        let pending = orchestrator.snapshot();
        assert_eq!(pending.status, AnalysisStatus::Analyzing);
        assert_eq!(pending.request_id, Some(id));

        let result = orchestrator.wait_for_settled().await;
        assert_eq!(result.status, AnalysisStatus::Error);
        assert_eq!(result.request_id, Some(id));
        assert_eq!(result.data_type, Some(DataType::Image));
        assert_eq!(
            notifications.recv().await.unwrap().kind,
            ErrorKind::DecodeFailure
        );
    }

    #[tokio::test]
    async fn upload_decoded_after_reset_is_discarded() {
        let orchestrator = AnalysisOrchestrator::builder().build();
        let upload = Upload::new("plate.csv", b"10,9\n8,7\n".to_vec());

        orchestrator.submit_upload(upload, DataType::CScan).unwrap();
        orchestrator.reset();

        wait_for_discards(&orchestrator, 1).await;
        assert_eq!(orchestrator.snapshot(), AnalysisResult::idle());
    }

    #[tokio::test]
    async fn classifier_failure_publishes_error() {
        let orchestrator = AnalysisOrchestrator::builder().build();
        let mut notifications = orchestrator.notifications();
        let grid = CScanGrid::new(1, 1, vec![4.0], 0.0).unwrap();

        orchestrator
            .submit(RawInput::cscan(grid), DataType::CScan)
            .unwrap();
        let result = orchestrator.wait_for_settled().await;

        assert_eq!(result.status, AnalysisStatus::Error);
        assert!(result.error.unwrap().contains("Classification failure"));
        assert_eq!(
            notifications.recv().await.unwrap().kind,
            ErrorKind::ClassificationFailure
        );
    }

    #[tokio::test]
    async fn submit_while_analyzing_is_busy() {
        let (orchestrator, mut gates) = gated(2);
        let mut notifications = orchestrator.notifications();

        let first = orchestrator.submit(grid_input(), DataType::CScan).unwrap();
        let before = orchestrator.snapshot();
        let err = orchestrator
            .submit(grid_input(), DataType::Image)
            .unwrap_err();

        assert_eq!(err, AnalysisError::Busy);
        assert_eq!(notifications.recv().await.unwrap().kind, ErrorKind::Busy);
        assert_eq!(orchestrator.snapshot(), before);
        assert_eq!(orchestrator.current_request().map(|r| r.id), Some(first));

        gates.remove(0).send(Ok(samples(1, 3))).unwrap();
        let result = orchestrator.wait_for_settled().await;
        assert_eq!(result.request_id, Some(first));
        assert_eq!(result.data_type, Some(DataType::CScan));
        assert_eq!(result.corrosion_percentage, 25.0);
    }

    #[tokio::test]
    async fn busy_upload_is_rejected_before_decoding() {
        let (orchestrator, _gates) = gated(1);
        orchestrator.submit(grid_input(), DataType::CScan).unwrap();

        let upload = Upload::new("plate.docx", vec![]);
        let err = orchestrator
            .submit_upload(upload, DataType::CScan)
            .unwrap_err();
        assert_eq!(err, AnalysisError::Busy);
        assert_eq!(orchestrator.snapshot().status, AnalysisStatus::Analyzing);
    }

    #[tokio::test]
    async fn reset_from_complete_and_error_returns_idle_baseline() {
        let (orchestrator, mut gates) = gated(2);

        orchestrator.submit(grid_input(), DataType::CScan).unwrap();
        gates.remove(0).send(Ok(samples(2, 2))).unwrap();
        assert_eq!(
            orchestrator.wait_for_settled().await.status,
            AnalysisStatus::Complete
        );
        orchestrator.reset();
        assert_eq!(orchestrator.snapshot(), AnalysisResult::idle());

        orchestrator.submit(grid_input(), DataType::CScan).unwrap();
        gates
            .remove(0)
            .send(Err(AnalysisError::DecodeFailure("bad".into())))
            .unwrap();
        assert_eq!(
            orchestrator.wait_for_settled().await.status,
            AnalysisStatus::Error
        );
        orchestrator.reset();

        let idle = orchestrator.snapshot();
        assert_eq!(idle.status, AnalysisStatus::Idle);
        assert_eq!(idle.corrosion_percentage, 0.0);
        assert!(idle.data_type.is_none());
    }

    #[tokio::test]
    async fn completion_after_reset_is_discarded() {
        let (orchestrator, mut gates) = gated(1);

        orchestrator.submit(grid_input(), DataType::CScan).unwrap();
        orchestrator.reset();
        assert!(orchestrator.current_request().is_none());

        gates.remove(0).send(Ok(samples(4, 0))).unwrap();
        wait_for_discards(&orchestrator, 1).await;

        assert_eq!(orchestrator.snapshot(), AnalysisResult::idle());
    }

    #[tokio::test]
    async fn superseded_completion_never_overwrites_newer_result() {
        let (orchestrator, mut gates) = gated(2);
        let gate_a = gates.remove(0);
        let gate_b = gates.remove(0);

        let a = orchestrator.submit(grid_input(), DataType::CScan).unwrap();
        orchestrator.reset();
        let b = orchestrator.submit(grid_input(), DataType::CScan).unwrap();
        assert!(b > a);

        // A finishes while B is still running
        gate_a.send(Ok(samples(9, 1))).unwrap();
        wait_for_discards(&orchestrator, 1).await;
        let pending = orchestrator.snapshot();
        assert_eq!(pending.status, AnalysisStatus::Analyzing);
        assert_eq!(pending.request_id, Some(b));

        gate_b.send(Ok(samples(1, 9))).unwrap();
        let result = orchestrator.wait_for_settled().await;
        assert_eq!(result.request_id, Some(b));
        assert_eq!(result.corrosion_percentage, 10.0);
        assert_eq!(result.severity, Some(Severity::Low));
    }

    #[tokio::test]
    async fn late_completion_after_newer_result_is_discarded() {
        let (orchestrator, mut gates) = gated(2);
        let gate_a = gates.remove(0);
        let gate_b = gates.remove(0);

        orchestrator.submit(grid_input(), DataType::CScan).unwrap();
        orchestrator.reset();
        let b = orchestrator.submit(grid_input(), DataType::Image).unwrap();

        gate_b
            .send(Err(AnalysisError::ClassificationFailure("b failed".into())))
            .unwrap();
        let settled = orchestrator.wait_for_settled().await;
        assert_eq!(settled.status, AnalysisStatus::Error);

        gate_a.send(Ok(samples(10, 0))).unwrap();
        wait_for_discards(&orchestrator, 1).await;

        let result = orchestrator.snapshot();
        assert_eq!(result, settled);
        assert_eq!(result.request_id, Some(b));
        assert_eq!(result.data_type, Some(DataType::Image));
    }

    #[tokio::test]
    async fn stuck_classification_surfaces_timeout() {
        let (classifier, _gates) = GatedClassifier::with_gates(1);
        let orchestrator = AnalysisOrchestrator::builder()
            .classifier(Box::new(classifier))
            .classification_timeout_ms(25)
            .build();
        let mut notifications = orchestrator.notifications();

        orchestrator.submit(grid_input(), DataType::CScan).unwrap();
        let result = orchestrator.wait_for_settled().await;

        assert_eq!(result.status, AnalysisStatus::Error);
        assert_eq!(notifications.recv().await.unwrap().kind, ErrorKind::Timeout);

        // the session accepts a fresh submission afterwards
        assert!(orchestrator.submit(grid_input(), DataType::CScan).is_ok());
    }

    #[tokio::test]
    async fn shared_orchestrator_resets_from_another_thread() {
        let (orchestrator, _gates) = gated(1);
        let orchestrator = Arc::new(orchestrator);
        orchestrator.submit(grid_input(), DataType::CScan).unwrap();

        let waiter = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.wait_for_settled().await })
        };
        let resetter = {
            let orchestrator = Arc::clone(&orchestrator);
            std::thread::spawn(move || orchestrator.reset())
        };
        resetter.join().unwrap();

        assert_eq!(waiter.await.unwrap(), AnalysisResult::idle());
    }

    #[tokio::test]
    async fn request_ids_increase_monotonically() {
        let (orchestrator, mut gates) = gated(2);

        let first = orchestrator.submit(grid_input(), DataType::CScan).unwrap();
        gates.remove(0).send(Ok(samples(0, 1))).unwrap();
        orchestrator.wait_for_settled().await;

        let second = orchestrator.submit(grid_input(), DataType::CScan).unwrap();
        assert!(second > first);
        let request = orchestrator.current_request().unwrap();
        assert_eq!(request.id, second);
        assert_eq!(request.data_type, DataType::CScan);
    }
}
