//! Deterministic gateway with fixed latencies, for exercising the harness
//! without a real decision engine.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use super::{AuthorizationRequest, Decision, DecisionEngine, EngineError, EngineGateway, IndexStrategy};

/// Lifecycle counters shared between a [`StubGateway`] and its engines.
#[derive(Debug, Default)]
pub struct StubCounters {
    constructed: AtomicUsize,
    disposed: AtomicUsize,
    decisions: AtomicUsize,
}

impl StubCounters {
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn decisions(&self) -> usize {
        self.decisions.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct StubGateway {
    construct_delay: Duration,
    decide_delay: Duration,
    decision: Decision,
    fail_namespace: Option<String>,
    no_decision: bool,
    counters: Arc<StubCounters>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self {
            construct_delay: Duration::ZERO,
            decide_delay: Duration::ZERO,
            decision: Decision::Permit,
            fail_namespace: None,
            no_decision: false,
            counters: Arc::new(StubCounters::default()),
        }
    }

    pub fn with_construct_delay(mut self, delay: Duration) -> Self {
        self.construct_delay = delay;
        self
    }

    pub fn with_decide_delay(mut self, delay: Duration) -> Self {
        self.decide_delay = delay;
        self
    }

    pub fn with_decision(mut self, decision: Decision) -> Self {
        self.decision = decision;
        self
    }

    /// Fail construction for the namespace whose directory name is `name`.
    pub fn failing_construct_for(mut self, name: impl Into<String>) -> Self {
        self.fail_namespace = Some(name.into());
        self
    }

    /// Make every engine answer without a decision.
    pub fn without_decisions(mut self) -> Self {
        self.no_decision = true;
        self
    }

    pub fn counters(&self) -> Arc<StubCounters> {
        Arc::clone(&self.counters)
    }
}

impl Default for StubGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineGateway for StubGateway {
    fn construct(
        &self,
        namespace: &Path,
        _index: IndexStrategy,
    ) -> Result<Box<dyn DecisionEngine>, EngineError> {
        thread::sleep(self.construct_delay);

        let name = namespace.file_name().and_then(|n| n.to_str());
        if let (Some(fail), Some(name)) = (self.fail_namespace.as_deref(), name) {
            if fail == name {
                return Err(EngineError::Configuration(format!(
                    "stub refuses to build namespace {name}"
                )));
            }
        }

        self.counters.constructed.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubEngine {
            decide_delay: self.decide_delay,
            decision: (!self.no_decision).then_some(self.decision),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct StubEngine {
    decide_delay: Duration,
    decision: Option<Decision>,
    counters: Arc<StubCounters>,
}

impl DecisionEngine for StubEngine {
    fn decide(&mut self, _request: &AuthorizationRequest) -> Result<Option<Decision>, EngineError> {
        thread::sleep(self.decide_delay);
        self.counters.decisions.fetch_add(1, Ordering::SeqCst);
        Ok(self.decision)
    }
}

impl Drop for StubEngine {
    fn drop(&mut self) {
        self.counters.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_stub_counts_lifecycle() {
        let gateway = StubGateway::new().with_decision(Decision::Deny);
        let counters = gateway.counters();

        let mut engine = gateway
            .construct(&PathBuf::from("/tmp/A"), IndexStrategy::Fast)
            .unwrap();
        let request = AuthorizationRequest::new("s", "a", "r");
        assert_eq!(engine.decide(&request).unwrap(), Some(Decision::Deny));
        assert_eq!(counters.constructed(), 1);
        assert_eq!(counters.disposed(), 0);

        drop(engine);
        assert_eq!(counters.disposed(), 1);
        assert_eq!(counters.decisions(), 1);
    }

    #[test]
    fn test_stub_fails_for_named_namespace() {
        let gateway = StubGateway::new().failing_construct_for("B");
        assert!(gateway.construct(&PathBuf::from("/tmp/A"), IndexStrategy::Simple).is_ok());
        assert!(gateway.construct(&PathBuf::from("/tmp/B"), IndexStrategy::Simple).is_err());
        assert_eq!(gateway.counters().constructed(), 1);
    }

    #[test]
    fn test_stub_without_decisions() {
        let gateway = StubGateway::new().without_decisions();
        let mut engine = gateway
            .construct(&PathBuf::from("/tmp/A"), IndexStrategy::Improved)
            .unwrap();
        let request = AuthorizationRequest::new("s", "a", "r");
        assert_eq!(engine.decide(&request).unwrap(), None);
    }
}
