use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crate::{
    error::{AppError, AppResult, EMPTY_QUERY_MESSAGE},
    models::{
        Catalog, Product, Recommendation, RecommendationSource, Transition, WidgetEvent,
        WidgetState,
    },
    services::{
        heuristic,
        scoring::{ScoringError, ScoringProvider},
    },
};

/// Advisory attached to results when the scoring reply had an unexpected shape
pub const MALFORMED_ADVISORY: &str =
    "Scoring service returned an unexpected shape, falling back to local filter.";

/// Chooses between remote scoring and the local heuristic filter
///
/// Owns the widget state. Each submission is issued a fresh token; a
/// completion whose token has been superseded is returned to its caller but
/// never replaces the displayed result. The lock is never held across an
/// await.
pub struct RecommendationResolver {
    catalog: Arc<Catalog>,
    provider: Arc<dyn ScoringProvider>,
    timeout: Duration,
    state: Mutex<WidgetState>,
}

impl RecommendationResolver {
    pub fn new(catalog: Arc<Catalog>, provider: Arc<dyn ScoringProvider>, timeout: Duration) -> Self {
        tracing::info!(
            provider = provider.name(),
            products = catalog.len(),
            timeout_ms = timeout.as_millis() as u64,
            "Recommendation resolver ready"
        );

        Self {
            catalog,
            provider,
            timeout,
            state: Mutex::new(WidgetState::new()),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Copy of the current widget state
    pub fn snapshot(&self) -> WidgetState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, WidgetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, event: WidgetEvent) -> Transition {
        self.lock().apply(event)
    }

    /// Resolves recommendations for a user preference
    ///
    /// Blank input is rejected without contacting the scoring service. Every
    /// remote failure is recovered with the local filter; only a reply of the
    /// wrong shape adds an advisory.
    pub async fn submit(&self, raw_query: &str) -> AppResult<Recommendation> {
        let query = raw_query.trim();
        if query.is_empty() {
            self.apply(WidgetEvent::Rejected {
                message: EMPTY_QUERY_MESSAGE.to_string(),
            });
            return Err(AppError::EmptyQuery);
        }

        let token = match self.apply(WidgetEvent::Submit {
            query: query.to_string(),
        }) {
            Transition::Started(token) => token,
            other => {
                return Err(AppError::Internal(format!(
                    "submission produced {:?} instead of a new token",
                    other
                )))
            }
        };
        let _busy = BusyGuard {
            resolver: self,
            token,
        };

        tracing::info!(token, query = %query, "Resolving recommendations");

        let remote = tokio::time::timeout(self.timeout, self.provider.score(query, self.catalog.products()))
            .await
            .unwrap_or(Err(ScoringError::Timeout(self.timeout)));

        let recommendation = match remote {
            Ok(reply) => {
                let products = self.lookup(&reply.recommended_ids);
                let transition = self.apply(WidgetEvent::RemoteResolved {
                    token,
                    products: products.clone(),
                    reason: reply.reason.clone(),
                });

                Recommendation {
                    products,
                    reason: reply.reason,
                    source: RecommendationSource::Remote,
                    advisory: None,
                    superseded: transition == Transition::Stale,
                }
            }
            Err(err) => self.fall_back(token, query, err),
        };

        tracing::info!(
            token,
            source = ?recommendation.source,
            result_count = recommendation.products.len(),
            superseded = recommendation.superseded,
            "Recommendations resolved"
        );

        Ok(recommendation)
    }

    fn fall_back(&self, token: u64, query: &str, err: ScoringError) -> Recommendation {
        let advisory = err.is_malformed().then(|| MALFORMED_ADVISORY.to_string());
        tracing::warn!(
            token,
            error = %err,
            advisory = advisory.is_some(),
            "Remote scoring failed, using local filter"
        );

        let failed = self.apply(WidgetEvent::RemoteFailed {
            token,
            advisory: advisory.clone(),
        });
        let products = heuristic::local_recommendations(query, self.catalog.products());
        let completed = self.apply(WidgetEvent::LocalFilterComplete {
            token,
            products: products.clone(),
        });

        Recommendation {
            products,
            reason: None,
            source: RecommendationSource::Local,
            advisory,
            superseded: failed == Transition::Stale || completed == Transition::Stale,
        }
    }

    /// Maps ids to catalog products in the given order, dropping unknown ids
    fn lookup(&self, ids: &[String]) -> Vec<Product> {
        let products: Vec<Product> = ids
            .iter()
            .filter_map(|id| self.catalog.get(id))
            .cloned()
            .collect();

        if products.len() < ids.len() {
            tracing::debug!(
                requested = ids.len(),
                known = products.len(),
                "Dropped unknown product ids from scoring reply"
            );
        }

        products
    }
}

/// Returns the widget to idle if a submission ends without completing
struct BusyGuard<'a> {
    resolver: &'a RecommendationResolver,
    token: u64,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let token = self.token;
        if self.resolver.apply(WidgetEvent::Abandoned { token }) == Transition::Applied {
            tracing::debug!(token, "Resolution abandoned before completion");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{ScoringResponse, WidgetStatus},
        services::scoring::MockScoringProvider,
    };
    use tokio::sync::Notify;
    use tokio_test::{assert_err, assert_ok};

    fn mock_provider() -> MockScoringProvider {
        let mut mock = MockScoringProvider::new();
        mock.expect_name().return_const("mock");
        mock
    }

    fn resolver(provider: impl ScoringProvider + 'static) -> RecommendationResolver {
        RecommendationResolver::new(
            Arc::new(Catalog::builtin()),
            Arc::new(provider),
            Duration::from_secs(5),
        )
    }

    fn reply(ids: &[&str], reason: Option<&str>) -> ScoringResponse {
        ScoringResponse {
            recommended_ids: ids.iter().map(|id| id.to_string()).collect(),
            reason: reason.map(str::to_string),
        }
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.id.as_str()).collect()
    }

    fn local(query: &str) -> Vec<Product> {
        heuristic::local_recommendations(query, Catalog::builtin().products())
    }

    #[tokio::test]
    async fn test_remote_success_preserves_service_order() {
        let mut mock = mock_provider();
        mock.expect_score().times(1).returning(|query, products| {
            assert_eq!(query, "phone under 500");
            assert_eq!(products.len(), 6);
            Ok(reply(&["p3", "p1"], Some("cheap phones")))
        });
        let resolver = resolver(mock);

        let result = assert_ok!(resolver.submit("  phone under 500 ").await);

        assert_eq!(ids(&result.products), vec!["p3", "p1"]);
        assert_eq!(result.reason.as_deref(), Some("cheap phones"));
        assert_eq!(result.source, RecommendationSource::Remote);
        assert_eq!(result.advisory, None);
        assert!(!result.superseded);

        let state = resolver.snapshot();
        assert_eq!(state.status, WidgetStatus::Idle);
        assert_eq!(state.query, "phone under 500");
        assert_eq!(ids(&state.products), vec!["p3", "p1"]);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_dropped() {
        let mut mock = mock_provider();
        mock.expect_score()
            .returning(|_, _| Ok(reply(&["p9", "p2", "nope"], None)));
        let resolver = resolver(mock);

        let result = assert_ok!(resolver.submit("anything").await);
        assert_eq!(ids(&result.products), vec!["p2"]);
    }

    #[tokio::test]
    async fn test_remote_may_return_nothing() {
        let mut mock = mock_provider();
        mock.expect_score().returning(|_, _| Ok(reply(&[], None)));
        let resolver = resolver(mock);

        let result = assert_ok!(resolver.submit("phone").await);
        assert!(result.products.is_empty());
        assert_eq!(result.source, RecommendationSource::Remote);
    }

    #[tokio::test]
    async fn test_transport_failure_falls_back_silently() {
        let mut mock = mock_provider();
        mock.expect_score()
            .returning(|_, _| Err(ScoringError::Transport("connection refused".to_string())));
        let resolver = resolver(mock);

        let result = assert_ok!(resolver.submit("phone under 500").await);

        assert_eq!(result.products, local("phone under 500"));
        assert_eq!(result.source, RecommendationSource::Local);
        assert_eq!(result.advisory, None);

        let state = resolver.snapshot();
        assert_eq!(state.status, WidgetStatus::Idle);
        assert!(!state.busy());
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn test_status_failure_falls_back_silently() {
        let mut mock = mock_provider();
        mock.expect_score()
            .returning(|_, _| Err(ScoringError::Status(reqwest::StatusCode::BAD_GATEWAY)));
        let resolver = resolver(mock);

        let result = assert_ok!(resolver.submit("earbuds").await);
        assert_eq!(ids(&result.products), vec!["p6"]);
        assert_eq!(result.advisory, None);
    }

    #[tokio::test]
    async fn test_malformed_reply_adds_advisory() {
        let mut mock = mock_provider();
        mock.expect_score()
            .returning(|_, _| Err(ScoringError::Malformed("missing recommended_ids array".to_string())));
        let resolver = resolver(mock);

        let result = assert_ok!(resolver.submit("under $200").await);

        assert_eq!(result.products, local("under $200"));
        assert_eq!(result.advisory.as_deref(), Some(MALFORMED_ADVISORY));

        let state = resolver.snapshot();
        assert!(!state.busy());
        assert_eq!(state.error.as_deref(), Some(MALFORMED_ADVISORY));
        assert_eq!(state.source, Some(RecommendationSource::Local));
    }

    #[tokio::test]
    async fn test_empty_query_rejected_without_remote_call() {
        let mut mock = mock_provider();
        mock.expect_score().never();
        let resolver = resolver(mock);

        let err = assert_err!(resolver.submit("   ").await);
        assert!(matches!(err, AppError::EmptyQuery));

        let state = resolver.snapshot();
        assert_eq!(state.error.as_deref(), Some(EMPTY_QUERY_MESSAGE));
        assert_eq!(state.generation, 0);
        assert!(!state.busy());
    }

    #[tokio::test]
    async fn test_next_submission_clears_previous_error() {
        let mut mock = mock_provider();
        mock.expect_score().returning(|_, _| Ok(reply(&["p1"], None)));
        let resolver = resolver(mock);

        assert_err!(resolver.submit("").await);
        assert_ok!(resolver.submit("phone").await);

        assert_eq!(resolver.snapshot().error, None);
    }

    struct SlowProvider;

    #[async_trait::async_trait]
    impl ScoringProvider for SlowProvider {
        async fn score(&self, _: &str, _: &[Product]) -> Result<ScoringResponse, ScoringError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(reply(&["p4"], None))
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_timeout_is_transport_failure() {
        let resolver = RecommendationResolver::new(
            Arc::new(Catalog::builtin()),
            Arc::new(SlowProvider),
            Duration::from_millis(50),
        );

        let result = assert_ok!(resolver.submit("tablet").await);

        assert_eq!(ids(&result.products), vec!["p5"]);
        assert_eq!(result.source, RecommendationSource::Local);
        assert_eq!(result.advisory, None);
        assert!(!resolver.snapshot().busy());
    }

    /// Holds any query mentioning "camera" until released
    struct GatedProvider {
        gate: Arc<Notify>,
    }

    #[async_trait::async_trait]
    impl ScoringProvider for GatedProvider {
        async fn score(&self, query: &str, _: &[Product]) -> Result<ScoringResponse, ScoringError> {
            if query.contains("camera") {
                self.gate.notified().await;
                Ok(reply(&["p4"], Some("stale")))
            } else {
                Ok(reply(&["p1"], Some("fresh")))
            }
        }

        fn name(&self) -> &'static str {
            "gated"
        }
    }

    async fn wait_for_generation(resolver: &RecommendationResolver, generation: u64) {
        while resolver.snapshot().generation < generation {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_stale_response_does_not_overwrite_newer_result() {
        let gate = Arc::new(Notify::new());
        let resolver = Arc::new(resolver(GatedProvider { gate: gate.clone() }));

        let first = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.submit("camera").await }
        });
        wait_for_generation(&resolver, 1).await;

        let second = assert_ok!(resolver.submit("phone").await);
        gate.notify_one();
        let first = assert_ok!(first.await.unwrap());

        assert!(!second.superseded);
        assert!(first.superseded);
        assert_eq!(ids(&first.products), vec!["p4"]);

        let state = resolver.snapshot();
        assert_eq!(state.status, WidgetStatus::Idle);
        assert_eq!(state.query, "phone");
        assert_eq!(ids(&state.products), vec!["p1"]);
        assert_eq!(state.reason.as_deref(), Some("fresh"));
        assert_eq!(state.generation, 2);
    }

    #[tokio::test]
    async fn test_cancelled_submission_clears_busy_indicator() {
        let gate = Arc::new(Notify::new());
        let resolver = Arc::new(resolver(GatedProvider { gate }));

        let pending = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.submit("camera").await }
        });
        wait_for_generation(&resolver, 1).await;
        assert!(resolver.snapshot().busy());

        pending.abort();
        assert!(pending.await.unwrap_err().is_cancelled());

        let state = resolver.snapshot();
        assert!(!state.busy());
        assert_eq!(state.status, WidgetStatus::Idle);
    }
}
