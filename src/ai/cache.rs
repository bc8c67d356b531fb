//! TTL + LRU-bounded cache for AI market analyses.
//!
//! Keyed by market (condition) id. An entry is a hit only while younger than
//! the TTL. The cache is bounded: inserting beyond capacity evicts exactly
//! the oldest entry, and a periodic sweep drops entries past their TTL.
//!
//! Callers pass `now` explicitly so the cache carries no hidden clock.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::types::AiAnalysis;

#[derive(Debug, Clone)]
struct CacheEntry {
    analysis: AiAnalysis,
    inserted_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct AnalysisCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
    capacity: usize,
}

impl AnalysisCache {
    pub fn new(ttl_secs: u64, capacity: usize) -> Self {
        AnalysisCache {
            entries: HashMap::new(),
            ttl: Duration::seconds(ttl_secs as i64),
            capacity: capacity.max(1),
        }
    }

    /// Look up an unexpired analysis for a market.
    pub fn get(&self, condition_id: &str, now: DateTime<Utc>) -> Option<&AiAnalysis> {
        self.entries.get(condition_id).and_then(|entry| {
            if now - entry.inserted_at < self.ttl {
                Some(&entry.analysis)
            } else {
                None
            }
        })
    }

    /// Insert an analysis, evicting the oldest entry when full.
    ///
    /// Re-inserting an existing key refreshes its timestamp without
    /// triggering an eviction.
    pub fn insert(&mut self, condition_id: String, analysis: AiAnalysis, now: DateTime<Utc>) {
        if !self.entries.contains_key(&condition_id) && self.entries.len() >= self.capacity {
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.clone())
            {
                debug!("Analysis cache full, evicting oldest entry {}", oldest);
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(
            condition_id,
            CacheEntry {
                analysis,
                inserted_at: now,
            },
        );
    }

    /// Remove entries past their TTL. Returns the number removed.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, e| now - e.inserted_at < ttl);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("Analysis cache sweep removed {} expired entries", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RiskLevel;

    fn analysis(reasoning: &str) -> AiAnalysis {
        AiAnalysis {
            should_trade: true,
            confidence: 0.8,
            attractiveness: 0.7,
            estimated_probability: Some(0.75),
            risk_level: RiskLevel::Low,
            recommended_action: None,
            reasoning: reasoning.into(),
            sources: vec![],
        }
    }

    #[test]
    fn test_hit_before_ttl_miss_after() {
        let mut cache = AnalysisCache::new(60, 10);
        let t0 = Utc::now();
        cache.insert("m1".into(), analysis("a"), t0);
        assert!(cache.get("m1", t0 + Duration::seconds(59)).is_some());
        assert!(cache.get("m1", t0 + Duration::seconds(60)).is_none());
    }

    #[test]
    fn test_overflow_evicts_exactly_the_oldest() {
        let mut cache = AnalysisCache::new(600, 3);
        let t0 = Utc::now();
        cache.insert("m1".into(), analysis("a"), t0);
        cache.insert("m2".into(), analysis("b"), t0 + Duration::seconds(1));
        cache.insert("m3".into(), analysis("c"), t0 + Duration::seconds(2));
        cache.insert("m4".into(), analysis("d"), t0 + Duration::seconds(3));

        assert_eq!(cache.len(), 3);
        assert!(cache.get("m1", t0 + Duration::seconds(4)).is_none());
        assert!(cache.get("m2", t0 + Duration::seconds(4)).is_some());
        assert!(cache.get("m4", t0 + Duration::seconds(4)).is_some());
    }

    #[test]
    fn test_size_never_exceeds_bound() {
        let mut cache = AnalysisCache::new(600, 5);
        let t0 = Utc::now();
        for i in 0..50 {
            cache.insert(format!("m{}", i), analysis("x"), t0 + Duration::seconds(i));
            assert!(cache.len() <= 5);
        }
    }

    #[test]
    fn test_reinsert_refreshes_without_eviction() {
        let mut cache = AnalysisCache::new(60, 2);
        let t0 = Utc::now();
        cache.insert("m1".into(), analysis("a"), t0);
        cache.insert("m2".into(), analysis("b"), t0 + Duration::seconds(1));
        cache.insert("m1".into(), analysis("a2"), t0 + Duration::seconds(30));

        assert_eq!(cache.len(), 2);
        // m1 now lives from t0+30
        assert!(cache
            .get("m1", t0 + Duration::seconds(80))
            .is_some());
        assert!(cache.get("m2", t0 + Duration::seconds(80)).is_none());
    }

    #[test]
    fn test_sweep_removes_expired_entries() {
        let mut cache = AnalysisCache::new(60, 10);
        let t0 = Utc::now();
        cache.insert("m1".into(), analysis("a"), t0);
        cache.insert("m2".into(), analysis("b"), t0 + Duration::seconds(45));
        let removed = cache.sweep_expired(t0 + Duration::seconds(70));
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("m2", t0 + Duration::seconds(70)).is_some());
    }
}
