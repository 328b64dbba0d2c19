//! Path-based label policy and its reconciler.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::torrent_client::{Item, LabelSet, TorrentClient};

use super::apply::apply_mutation;
use super::{MutationKind, ReconcileError, ReconcileOutcome};

/// A torrent carries `label` while its download directory is under `prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelRule {
    pub label: String,
    pub prefix: String,
}

impl LabelRule {
    pub fn new(label: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            prefix: prefix.into(),
        }
    }

    /// Whether `path` falls under this rule's prefix.
    ///
    /// A separator is appended to `path` first, so the prefix `/data/anime`
    /// matches the directory `/data/anime` itself.
    pub fn matches(&self, path: &str) -> bool {
        format!("{}/", path).starts_with(&self.prefix)
    }
}

/// The set of label rules, fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct LabelPolicy {
    rules: Vec<LabelRule>,
    managed: LabelSet,
}

impl LabelPolicy {
    pub fn new(rules: impl IntoIterator<Item = LabelRule>) -> Self {
        let rules: Vec<LabelRule> = rules.into_iter().collect();
        let managed = rules.iter().map(|rule| rule.label.clone()).collect();
        Self { rules, managed }
    }

    /// Build a policy from the `[labels]` table (label name to prefix).
    pub fn from_config(labels: &BTreeMap<String, String>) -> Self {
        Self::new(
            labels
                .iter()
                .map(|(label, prefix)| LabelRule::new(label.clone(), prefix.clone())),
        )
    }

    pub fn rules(&self) -> &[LabelRule] {
        &self.rules
    }

    /// Labels this policy owns. Anything else on a torrent is left alone.
    pub fn managed(&self) -> &LabelSet {
        &self.managed
    }

    /// Labels the rules assign to `path`.
    pub fn wanted(&self, path: &str) -> LabelSet {
        self.rules
            .iter()
            .filter(|rule| rule.matches(path))
            .map(|rule| rule.label.clone())
            .collect()
    }

    /// Full label set a torrent should carry: the policy labels for `path`
    /// plus every unmanaged label it already has.
    pub fn desired(&self, current: &LabelSet, path: &str) -> LabelSet {
        let mut labels = self.wanted(path);
        labels.extend(current.difference(&self.managed).cloned());
        labels
    }
}

/// Replaces a torrent's labels when its managed labels drift from policy.
pub struct LabelReconciler {
    client: Arc<dyn TorrentClient>,
    policy: Arc<LabelPolicy>,
    timeout: Duration,
}

impl LabelReconciler {
    pub fn new(client: Arc<dyn TorrentClient>, policy: Arc<LabelPolicy>, timeout: Duration) -> Self {
        Self {
            client,
            policy,
            timeout,
        }
    }

    /// Bring `item`'s labels in line with the policy.
    ///
    /// Sends one set-labels call with the whole desired set when it differs
    /// from the current set, nothing otherwise.
    pub async fn reconcile(&self, item: &Item) -> Result<ReconcileOutcome, ReconcileError> {
        let desired = self.policy.desired(&item.labels, &item.download_dir);
        if desired == item.labels {
            debug!(hash = %item.hash, "Labels already compliant");
            return Ok(ReconcileOutcome::Compliant);
        }

        let payload: Vec<String> = desired.into_iter().collect();
        apply_mutation(
            MutationKind::SetLabels,
            item,
            payload.clone(),
            self.timeout,
            self.client.set_labels(item.id, &payload),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockTorrentClient, RecordedCall};

    fn labels<const N: usize>(names: [&str; N]) -> LabelSet {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn anime_policy() -> LabelPolicy {
        LabelPolicy::new([LabelRule::new("anime", "/data/anime")])
    }

    fn reconciler(client: &Arc<MockTorrentClient>, policy: LabelPolicy) -> LabelReconciler {
        LabelReconciler::new(client.clone(), Arc::new(policy), Duration::from_secs(1))
    }

    #[test]
    fn test_rule_matches_directory_itself() {
        let rule = LabelRule::new("anime", "/data/anime/");
        assert!(rule.matches("/data/anime"));
        assert!(rule.matches("/data/anime/show1"));
        assert!(!rule.matches("/data/animels"));
    }

    #[test]
    fn test_wanted_collects_every_matching_rule() {
        let policy = LabelPolicy::new([
            LabelRule::new("media", "/data"),
            LabelRule::new("anime", "/data/anime"),
            LabelRule::new("movies", "/data/movies"),
        ]);

        assert_eq!(policy.wanted("/data/anime/show1"), labels(["anime", "media"]));
        assert_eq!(policy.wanted("/data/movies"), labels(["media", "movies"]));
        assert!(policy.wanted("/srv").is_empty());
    }

    #[test]
    fn test_from_config() {
        let mut map = BTreeMap::new();
        map.insert("anime".to_string(), "/data/anime".to_string());
        map.insert("tv".to_string(), "/data/tv".to_string());

        let policy = LabelPolicy::from_config(&map);
        assert_eq!(policy.rules().len(), 2);
        assert_eq!(policy.managed(), &labels(["anime", "tv"]));
    }

    #[test]
    fn test_desired_keeps_foreign_labels() {
        let policy = anime_policy();
        let current = labels(["anime", "manual-review"]);

        assert_eq!(
            policy.desired(&current, "/data/anime/show1"),
            labels(["anime", "manual-review"])
        );
        assert_eq!(
            policy.desired(&current, "/data/movies/show1"),
            labels(["manual-review"])
        );
    }

    #[test]
    fn test_desired_empty_when_nothing_applies() {
        let policy = anime_policy();
        assert!(policy
            .desired(&labels(["anime"]), "/data/movies/x")
            .is_empty());
    }

    #[tokio::test]
    async fn test_compliant_item_sends_nothing() {
        let item = fixtures::item(1, "/data/anime/show1").with_labels(["anime", "manual-review"]);
        let client = Arc::new(MockTorrentClient::with_items(vec![item.clone()]));

        let outcome = reconciler(&client, anime_policy())
            .reconcile(&item)
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Compliant);
        assert!(client.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_moved_item_loses_managed_label() {
        let item =
            fixtures::item(1, "/data/movies/show1").with_labels(["anime", "manual-review"]);
        let client = Arc::new(MockTorrentClient::with_items(vec![item.clone()]));

        let outcome = reconciler(&client, anime_policy())
            .reconcile(&item)
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Applied);
        assert_eq!(
            client.recorded_calls().await,
            vec![RecordedCall::SetLabels {
                id: 1,
                labels: vec!["manual-review".to_string()],
            }]
        );
    }

    #[tokio::test]
    async fn test_stale_label_cleared_to_empty_set() {
        let item = fixtures::item(2, "/data/other").with_labels(["anime"]);
        let client = Arc::new(MockTorrentClient::with_items(vec![item.clone()]));

        reconciler(&client, anime_policy())
            .reconcile(&item)
            .await
            .unwrap();

        assert_eq!(
            client.recorded_calls().await,
            vec![RecordedCall::SetLabels {
                id: 2,
                labels: vec![],
            }]
        );
    }

    #[tokio::test]
    async fn test_empty_policy_never_mutates() {
        let item = fixtures::item(1, "/data/anime").with_labels(["whatever"]);
        let client = Arc::new(MockTorrentClient::with_items(vec![item.clone()]));

        let outcome = reconciler(&client, LabelPolicy::default())
            .reconcile(&item)
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Compliant);
    }
}
