use std::sync::Arc;
use std::time::Duration;

use crate::error::AnalysisError;
use crate::pipeline::orchestration::classifier_step::ClassifierStep;
use crate::pipeline::types::{AnalysisRequest, Classification, RawInput};
use futures::future::BoxFuture;
use futures::task::{Context, Poll};
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower::util::BoxCloneSyncService;
use tower::{BoxError, Service, ServiceBuilder};

/// One unit of classification work.
pub struct ClassificationJob {
    pub request: AnalysisRequest,
    pub input: RawInput,
}

pub type BoxedClassifier = BoxCloneSyncService<ClassificationJob, Classification, BoxError>;

#[derive(Clone)]
pub struct ClassifierService {
    inner: Arc<dyn ClassifierStep>,
}

impl ClassifierService {
    pub fn new(inner: Box<dyn ClassifierStep>) -> Self {
        Self {
            inner: Arc::from(inner),
        }
    }
}

impl Service<ClassificationJob> for ClassifierService {
    type Response = Classification;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, job: ClassificationJob) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move {
            tracing::debug!("{} classifying request {}", inner.name(), job.request.id);
            inner
                .classify(job.input, job.request.data_type)
                .await
                .map_err(BoxError::from)
        })
    }
}

pub struct ClassifierServiceBuilder {
    classifier: Box<dyn ClassifierStep>,
    timeout: Option<Duration>,
}

impl ClassifierServiceBuilder {
    pub fn new(classifier: Box<dyn ClassifierStep>) -> Self {
        Self {
            classifier,
            timeout: None,
        }
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> BoxedClassifier {
        let service = ServiceBuilder::new()
            .option_layer(self.timeout.map(TimeoutLayer::new))
            .service(ClassifierService::new(self.classifier));

        BoxCloneSyncService::new(service)
    }
}

/// Recovers the taxonomy error from whatever the service stack returned.
pub fn into_analysis_error(error: BoxError, timeout: Option<Duration>) -> AnalysisError {
    if error.is::<Elapsed>() {
        let millis = timeout.map(|t| t.as_millis() as u64).unwrap_or_default();
        return AnalysisError::Timeout(millis);
    }

    match error.downcast::<AnalysisError>() {
        Ok(error) => *error,
        Err(other) => AnalysisError::ClassificationFailure(other.to_string()),
    }
}
