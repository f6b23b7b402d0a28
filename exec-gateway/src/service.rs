use piston_client::PistonClient;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    config::GatewayConfig,
    error::Error,
    executor::{RemoteExecutor, RetryingExecutor},
    health::{HealthProber, HealthReport},
    languages::LanguageRegistry,
    normalizer::{failure, normalize},
    rate_limit::{Admission, FixedWindowLimiter, Quota, RateLimiter},
    types::{ExecutionRequest, NormalizedResponse},
    validator::{validate, RequestLimits},
};

/// Outcome of an admitted, validated execution
#[derive(Debug, Clone)]
pub struct Executed {
    pub response: NormalizedResponse,
    pub quota: Quota,
}

/// The execution gateway: one instance owns all state and is shared by handle
#[derive(Clone)]
pub struct ExecutionGateway {
    registry: Arc<LanguageRegistry>,
    limiter: Arc<dyn RateLimiter>,
    executor: Arc<RetryingExecutor>,
    prober: Arc<HealthProber>,
    limits: RequestLimits,
    shutdown: CancellationToken,
}

impl ExecutionGateway {
    /// Build a gateway talking to the configured Piston service
    pub fn new(config: GatewayConfig) -> Result<Self, Error> {
        config.validate()?;
        let client = PistonClient::new(config.piston_config())
            .map_err(|e| Error::Configuration(e.to_string()))?;
        Self::with_remote(config, Arc::new(client))
    }

    /// Build a gateway over any remote executor
    pub fn with_remote(config: GatewayConfig, remote: Arc<dyn RemoteExecutor>) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            registry: Arc::new(LanguageRegistry::default()),
            limiter: Arc::new(FixedWindowLimiter::new(config.rate_limit)),
            executor: Arc::new(RetryingExecutor::new(remote.clone(), config.retry_policy())),
            prober: Arc::new(HealthProber::new(remote, config.health_timeout)),
            limits: config.limits,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn with_registry(mut self, registry: LanguageRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    pub fn rate_limiter(&self) -> Arc<dyn RateLimiter> {
        self.limiter.clone()
    }

    /// Cancelling this token abandons every in-flight execution
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Admit, validate, execute and normalize one request.
    ///
    /// Caller errors (`RateLimited`, `InvalidInput`) come back as `Err`.
    /// Anything that fails after validation is folded into a failure
    /// [`NormalizedResponse`] and logged with its internal cause.
    pub async fn execute(&self, request: ExecutionRequest) -> Result<Executed, Error> {
        let span = info_span!(
            "execution",
            id = %Uuid::new_v4(),
            requester = %request.requester,
            language = %request.language,
        );
        self.execute_inner(request).instrument(span).await
    }

    async fn execute_inner(&self, request: ExecutionRequest) -> Result<Executed, Error> {
        let received = Instant::now();
        let quota = match self.limiter.admit(&request.requester) {
            Admission::Admitted(quota) => quota,
            Admission::Rejected { limit, retry_after } => {
                warn!(
                    retry_after_ms = retry_after.as_millis() as u64,
                    elapsed_ms = received.elapsed().as_millis() as u64,
                    "rate limit exceeded"
                );
                return Err(Error::RateLimited { limit, retry_after });
            }
        };

        let started = Instant::now();

        if let Err(e) = validate(&request, &self.registry, &self.limits) {
            warn!(
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "rejected invalid request"
            );
            return Err(e);
        }

        let profile = match self.registry.resolve(&request.language) {
            Ok(profile) => profile,
            Err(e) => {
                let fault = Error::Internal(format!("validated language did not resolve: {}", e));
                let elapsed = started.elapsed();
                error!(error = %fault, elapsed_ms = elapsed.as_millis() as u64, "code execution error");
                return Ok(Executed {
                    response: failure(&fault, elapsed),
                    quota,
                });
            }
        };

        let cancel = self.shutdown.child_token();
        let outcome = self
            .executor
            .execute(profile, &request.code, request.stdin(), &cancel)
            .await;
        let elapsed = started.elapsed();

        match &outcome {
            Ok(_) => info!(elapsed_ms = elapsed.as_millis() as u64, "code execution completed"),
            Err(e) => error!(
                error = %e,
                elapsed_ms = elapsed.as_millis() as u64,
                "code execution error"
            ),
        }

        Ok(Executed {
            response: normalize(outcome, profile, elapsed),
            quota,
        })
    }

    /// Probe the remote executor; independent of rate limits and executions
    pub async fn health(&self) -> HealthReport {
        let status = self.prober.probe().await;
        let languages = self
            .registry
            .language_ids()
            .into_iter()
            .map(str::to_string)
            .collect();
        HealthReport::new(&status, languages)
    }
}
