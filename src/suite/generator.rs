//! Seeded generation of policy sets and authorization requests.

use std::fs;
use std::io;
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::WorkloadParams;
use crate::engine::AuthorizationRequest;
use crate::engine::policy::{Effect, POLICY_SUFFIX, PolicyDocument, Target};

const ACTIONS: [&str; 6] = ["read", "write", "delete", "create", "share", "admin"];

/// Request streams use a different seed than the policy set they run
/// against.
const REQUEST_SEED_SALT: u64 = 0x5eed_5eed;

pub struct PolicyGenerator {
    params: WorkloadParams,
    requests: ChaCha8Rng,
}

impl PolicyGenerator {
    pub fn new(params: &WorkloadParams) -> Self {
        Self {
            params: params.clone(),
            requests: ChaCha8Rng::seed_from_u64(params.seed ^ REQUEST_SEED_SALT),
        }
    }

    /// The policy set described by the parameters. Same seed, same set.
    pub fn policies(&self) -> Vec<PolicyDocument> {
        let p = &self.params;
        let mut rng = ChaCha8Rng::seed_from_u64(p.seed);
        (0..p.policy_count)
            .map(|i| {
                let effect = if rng.gen_bool(p.deny_probability) {
                    Effect::Deny
                } else {
                    Effect::Permit
                };
                let mut attr = |pool: usize, render: fn(usize) -> String| {
                    if rng.gen_bool(p.wildcard_probability) {
                        None
                    } else {
                        Some(render(rng.gen_range(0..pool)))
                    }
                };
                let target = Target {
                    subject: attr(p.subject_pool, subject),
                    action: attr(p.action_pool, action),
                    resource: attr(p.resource_pool, resource),
                };
                PolicyDocument {
                    name: format!("policy_{i}"),
                    effect,
                    target,
                }
            })
            .collect()
    }

    /// Write the policy set into `namespace`, replacing any policy documents
    /// already there. Returns the number of documents written.
    pub fn generate_policies(&self, namespace: &Path) -> io::Result<usize> {
        fs::create_dir_all(namespace)?;
        for entry in fs::read_dir(namespace)? {
            let path = entry?.path();
            let is_policy = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(POLICY_SUFFIX));
            if is_policy {
                fs::remove_file(&path)?;
            }
        }

        let policies = self.policies();
        for policy in &policies {
            let json = serde_json::to_string_pretty(policy)?;
            fs::write(namespace.join(format!("{}{POLICY_SUFFIX}", policy.name)), json)?;
        }
        debug!(namespace = %namespace.display(), policies = policies.len(), "Materialized policies");
        Ok(policies.len())
    }

    /// Next request of the seeded request stream.
    pub fn create_request(&mut self) -> AuthorizationRequest {
        let p = &self.params;
        AuthorizationRequest {
            subject: subject(self.requests.gen_range(0..p.subject_pool)),
            action: action(self.requests.gen_range(0..p.action_pool)),
            resource: resource(self.requests.gen_range(0..p.resource_pool)),
        }
    }
}

fn subject(i: usize) -> String {
    format!("subject{i}")
}

fn action(i: usize) -> String {
    ACTIONS
        .get(i)
        .map(|a| a.to_string())
        .unwrap_or_else(|| format!("action{i}"))
}

fn resource(i: usize) -> String {
    format!("resource{i}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(seed: u64) -> WorkloadParams {
        WorkloadParams {
            policy_count: 25,
            seed,
            ..WorkloadParams::default()
        }
    }

    #[test]
    fn test_policies_are_deterministic() {
        let a = PolicyGenerator::new(&params(1)).policies();
        let b = PolicyGenerator::new(&params(1)).policies();
        let c = PolicyGenerator::new(&params(2)).policies();
        assert_eq!(a.len(), 25);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_requests_stay_in_pools() {
        let p = WorkloadParams {
            subject_pool: 2,
            action_pool: 8,
            resource_pool: 3,
            ..params(5)
        };
        let mut generator = PolicyGenerator::new(&p);
        for _ in 0..100 {
            let r = generator.create_request();
            assert!(["subject0", "subject1"].contains(&r.subject.as_str()));
            assert!(["resource0", "resource1", "resource2"].contains(&r.resource.as_str()));
            assert!(ACTIONS.contains(&r.action.as_str()) || r.action.starts_with("action"));
        }
    }

    #[test]
    fn test_request_stream_is_reproducible() {
        let mut a = PolicyGenerator::new(&params(9));
        let mut b = PolicyGenerator::new(&params(9));
        for _ in 0..10 {
            assert_eq!(a.create_request(), b.create_request());
        }
    }

    #[test]
    fn test_generate_policies_replaces_previous_set() {
        let dir = tempfile::tempdir().unwrap();
        let ns = dir.path().join("ns");

        let written = PolicyGenerator::new(&params(1)).generate_policies(&ns).unwrap();
        assert_eq!(written, 25);

        let smaller = WorkloadParams {
            policy_count: 3,
            ..params(1)
        };
        PolicyGenerator::new(&smaller).generate_policies(&ns).unwrap();
        let count = fs::read_dir(&ns).unwrap().count();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_extreme_probabilities() {
        let p = WorkloadParams {
            wildcard_probability: 1.0,
            deny_probability: 1.0,
            ..params(3)
        };
        let policies = PolicyGenerator::new(&p).policies();
        assert!(policies.iter().all(|p| p.effect == Effect::Deny));
        assert!(policies.iter().all(|p| p.target == Target::default()));
    }
}
