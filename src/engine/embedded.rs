//! Filesystem-backed decision engine.
//!
//! Construction reads the namespace's `pdp.json` and every `*.policy.json`
//! document (in file-name order), then builds the policy index selected by
//! the [`IndexStrategy`]. Evaluation looks up the candidate policies through
//! the index, keeps the ones whose target matches and combines their effects.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::policy::{
    CombiningAlgorithm, EngineSettings, POLICY_SUFFIX, PolicyDocument, SETTINGS_FILE,
};
use super::{AuthorizationRequest, Decision, DecisionEngine, EngineError, EngineGateway, IndexStrategy};

/// Gateway constructing [`EmbeddedEngine`] instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedGateway;

impl EngineGateway for EmbeddedGateway {
    fn construct(
        &self,
        namespace: &Path,
        index: IndexStrategy,
    ) -> Result<Box<dyn DecisionEngine>, EngineError> {
        Ok(Box::new(EmbeddedEngine::load(namespace, index)?))
    }
}

#[derive(Debug)]
pub struct EmbeddedEngine {
    algorithm: CombiningAlgorithm,
    policies: Vec<PolicyDocument>,
    index: PolicyIndex,
}

impl EmbeddedEngine {
    pub fn load(namespace: &Path, strategy: IndexStrategy) -> Result<Self, EngineError> {
        let settings = load_settings(&namespace.join(SETTINGS_FILE))?;
        let policies = load_policies(namespace)?;
        debug!(
            namespace = %namespace.display(),
            policies = policies.len(),
            index = %strategy,
            "Loaded policy namespace"
        );
        Ok(Self::new(settings.algorithm, policies, strategy))
    }

    pub fn new(
        algorithm: CombiningAlgorithm,
        policies: Vec<PolicyDocument>,
        strategy: IndexStrategy,
    ) -> Self {
        let index = PolicyIndex::build(&policies, strategy);
        Self {
            algorithm,
            policies,
            index,
        }
    }

    pub fn policy_count(&self) -> usize {
        self.policies.len()
    }

    pub fn evaluate(&self, request: &AuthorizationRequest) -> Decision {
        let effects = self
            .index
            .candidates(request)
            .into_iter()
            .map(|i| &self.policies[i])
            .filter(|policy| policy.target.matches(request))
            .map(|policy| policy.effect);
        self.algorithm.combine(effects)
    }
}

impl DecisionEngine for EmbeddedEngine {
    fn decide(&mut self, request: &AuthorizationRequest) -> Result<Option<Decision>, EngineError> {
        Ok(Some(self.evaluate(request)))
    }
}

fn load_settings(path: &Path) -> Result<EngineSettings, EngineError> {
    let raw = fs::read_to_string(path).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw)
        .map_err(|e| EngineError::Configuration(format!("{}: {e}", path.display())))
}

fn load_policies(namespace: &Path) -> Result<Vec<PolicyDocument>, EngineError> {
    let io_err = |source| EngineError::Io {
        path: namespace.to_path_buf(),
        source,
    };

    let mut paths: Vec<PathBuf> = fs::read_dir(namespace)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()
        .map_err(io_err)?;
    paths.retain(|p| {
        p.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(POLICY_SUFFIX))
    });
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let raw = fs::read_to_string(&path).map_err(|source| EngineError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&raw).map_err(|e| EngineError::Policy {
                path,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Candidate lookup structure. Every variant returns policy positions in
/// ascending order so that document order is kept for first-applicable.
#[derive(Debug)]
enum PolicyIndex {
    Scan {
        len: usize,
    },
    ByAction {
        keyed: HashMap<String, Vec<usize>>,
        unkeyed: Vec<usize>,
    },
    ByActionResource {
        both: HashMap<(String, String), Vec<usize>>,
        action_only: HashMap<String, Vec<usize>>,
        resource_only: HashMap<String, Vec<usize>>,
        unkeyed: Vec<usize>,
    },
}

impl PolicyIndex {
    fn build(policies: &[PolicyDocument], strategy: IndexStrategy) -> Self {
        match strategy {
            IndexStrategy::Simple => PolicyIndex::Scan {
                len: policies.len(),
            },
            IndexStrategy::Fast => {
                let mut keyed: HashMap<String, Vec<usize>> = HashMap::new();
                let mut unkeyed = Vec::new();
                for (i, policy) in policies.iter().enumerate() {
                    match &policy.target.action {
                        Some(action) => keyed.entry(action.clone()).or_default().push(i),
                        None => unkeyed.push(i),
                    }
                }
                PolicyIndex::ByAction { keyed, unkeyed }
            }
            IndexStrategy::Improved => {
                let mut both: HashMap<(String, String), Vec<usize>> = HashMap::new();
                let mut action_only: HashMap<String, Vec<usize>> = HashMap::new();
                let mut resource_only: HashMap<String, Vec<usize>> = HashMap::new();
                let mut unkeyed = Vec::new();
                for (i, policy) in policies.iter().enumerate() {
                    let target = &policy.target;
                    match (&target.action, &target.resource) {
                        (Some(a), Some(r)) => both.entry((a.clone(), r.clone())).or_default().push(i),
                        (Some(a), None) => action_only.entry(a.clone()).or_default().push(i),
                        (None, Some(r)) => resource_only.entry(r.clone()).or_default().push(i),
                        (None, None) => unkeyed.push(i),
                    }
                }
                PolicyIndex::ByActionResource {
                    both,
                    action_only,
                    resource_only,
                    unkeyed,
                }
            }
        }
    }

    fn candidates(&self, request: &AuthorizationRequest) -> Vec<usize> {
        let mut out = match self {
            PolicyIndex::Scan { len } => return (0..*len).collect(),
            PolicyIndex::ByAction { keyed, unkeyed } => {
                let mut out = unkeyed.clone();
                if let Some(hits) = keyed.get(&request.action) {
                    out.extend_from_slice(hits);
                }
                out
            }
            PolicyIndex::ByActionResource {
                both,
                action_only,
                resource_only,
                unkeyed,
            } => {
                let mut out = unkeyed.clone();
                let key = (request.action.clone(), request.resource.clone());
                for hits in [
                    both.get(&key),
                    action_only.get(&request.action),
                    resource_only.get(&request.resource),
                ]
                .into_iter()
                .flatten()
                {
                    out.extend_from_slice(hits);
                }
                out
            }
        };
        out.sort_unstable();
        out
    }
}
