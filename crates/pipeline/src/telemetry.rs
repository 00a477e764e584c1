use feedback_classifier::Tier;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const DEFAULT_CAPACITY: usize = 10_000;
const STATS_TTL: Duration = Duration::from_secs(60);
const MIN_SAMPLE: usize = 10;

/// One chain transition: a tier attempt and how it ended.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryEntry {
    pub timestamp_ms: u64,
    pub tier: Tier,
    pub latency_ms: u64,
    pub confidence: f32,
    /// Stable error kind when the attempt failed, `None` on success.
    pub error_kind: Option<String>,
    pub embeddings_used: bool,
    /// Input length in chars, for correlating latency with size.
    pub text_length: usize,
}

impl TelemetryEntry {
    pub fn success(tier: Tier, latency_ms: u64, confidence: f32, embeddings_used: bool) -> Self {
        Self {
            timestamp_ms: now_ms(),
            tier,
            latency_ms,
            confidence,
            error_kind: None,
            embeddings_used,
            text_length: 0,
        }
    }

    pub fn failure(tier: Tier, latency_ms: u64, error_kind: &str) -> Self {
        Self {
            timestamp_ms: now_ms(),
            tier,
            latency_ms,
            confidence: 0.0,
            error_kind: Some(error_kind.to_string()),
            embeddings_used: false,
            text_length: 0,
        }
    }

    pub fn with_text_length(mut self, text_length: usize) -> Self {
        self.text_length = text_length;
        self
    }

    pub fn is_success(&self) -> bool {
        self.error_kind.is_none()
    }
}

/// Aggregated view over the retained window.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerStats {
    pub total: usize,
    /// Share of successful attempts, 0..=100.
    pub success_rate: f32,
    pub avg_latency_ms: f32,
    /// Mean confidence over successful attempts.
    pub avg_confidence: f32,
    /// Per-tier share of successful classifications, 0..=100.
    pub tier_rates: HashMap<String, f32>,
    pub error_kinds: HashMap<String, usize>,
    /// Share of successes that used embedding-based candidates.
    pub embeddings_usage_rate: f32,
}

impl LedgerStats {
    fn empty() -> Self {
        Self {
            total: 0,
            success_rate: 0.0,
            avg_latency_ms: 0.0,
            avg_confidence: 0.0,
            tier_rates: HashMap::new(),
            error_kinds: HashMap::new(),
            embeddings_usage_rate: 0.0,
        }
    }
}

struct Inner {
    entries: VecDeque<(Instant, TelemetryEntry)>,
    cached_stats: Option<(Instant, LedgerStats)>,
}

/// Capacity-bounded in-memory ring of chain transitions.
///
/// `stats()` is cached for a short TTL and invalidated on write, so a
/// dashboard polling every few seconds never rescans an unchanged
/// window.
pub struct TelemetryLedger {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl TelemetryLedger {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: VecDeque::new(),
                cached_stats: None,
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, entry: TelemetryEntry) {
        let mut inner = self.lock();
        if inner.entries.len() == self.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back((Instant::now(), entry));
        inner.cached_stats = None;
    }

    pub fn stats(&self) -> LedgerStats {
        let mut inner = self.lock();
        if let Some((computed_at, stats)) = &inner.cached_stats {
            if computed_at.elapsed() < STATS_TTL {
                return stats.clone();
            }
        }
        let stats = Self::compute_stats(&inner.entries);
        inner.cached_stats = Some((Instant::now(), stats.clone()));
        stats
    }

    /// Health warnings over the retained window. Silent below the
    /// minimum sample so a cold start never alarms.
    pub fn detect_issues(&self) -> Vec<String> {
        let stats = self.stats();
        if stats.total < MIN_SAMPLE {
            return Vec::new();
        }

        let mut warnings = Vec::new();
        if stats.success_rate < 80.0 {
            warnings.push(format!(
                "Success rate below 80%: {:.1}%",
                stats.success_rate
            ));
        }
        if stats.avg_latency_ms > 5_000.0 {
            warnings.push(format!(
                "Average latency above 5000ms: {:.0}ms",
                stats.avg_latency_ms
            ));
        }
        let emergency_rate = stats
            .tier_rates
            .get(Tier::Emergency.as_str())
            .copied()
            .unwrap_or(0.0);
        if emergency_rate > 5.0 {
            warnings.push(format!(
                "Emergency tier rate above 5%: {emergency_rate:.1}%"
            ));
        }
        if stats.avg_confidence < 0.6 {
            warnings.push(format!(
                "Average confidence below 0.6: {:.2}",
                stats.avg_confidence
            ));
        }
        if stats.embeddings_usage_rate < 50.0 {
            warnings.push(format!(
                "Embeddings usage below 50%: {:.1}%",
                stats.embeddings_usage_rate
            ));
        }
        warnings
    }

    /// Purge entries older than `max_age`, independent of capacity.
    pub fn cleanup(&self, max_age: Duration) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner
            .entries
            .retain(|(recorded_at, _)| recorded_at.elapsed() < max_age);
        let removed = before - inner.entries.len();
        if removed > 0 {
            inner.cached_stats = None;
            log::debug!("Telemetry cleanup removed {removed} entries");
        }
        removed
    }

    /// Most recent `n` entries, newest first.
    pub fn recent(&self, n: usize) -> Vec<TelemetryEntry> {
        let inner = self.lock();
        inner
            .entries
            .iter()
            .rev()
            .take(n)
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    /// Full window plus aggregates as a JSON document.
    pub fn export(&self) -> serde_json::Result<String> {
        let stats = self.stats();
        let entries: Vec<TelemetryEntry> = {
            let inner = self.lock();
            inner.entries.iter().map(|(_, e)| e.clone()).collect()
        };
        serde_json::to_string_pretty(&serde_json::json!({
            "stats": stats,
            "entries": entries,
        }))
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn compute_stats(entries: &VecDeque<(Instant, TelemetryEntry)>) -> LedgerStats {
        if entries.is_empty() {
            return LedgerStats::empty();
        }

        let total = entries.len();
        let successes: Vec<&TelemetryEntry> = entries
            .iter()
            .map(|(_, e)| e)
            .filter(|e| e.is_success())
            .collect();

        let mut tier_counts: HashMap<String, usize> = HashMap::new();
        let mut error_kinds: HashMap<String, usize> = HashMap::new();
        let mut latency_sum = 0u64;
        for (_, entry) in entries {
            latency_sum += entry.latency_ms;
            if let Some(kind) = &entry.error_kind {
                *error_kinds.entry(kind.clone()).or_default() += 1;
            } else {
                *tier_counts.entry(entry.tier.as_str().to_string()).or_default() += 1;
            }
        }

        let success_count = successes.len();
        let tier_rates = tier_counts
            .into_iter()
            .map(|(tier, count)| {
                (tier, count as f32 / success_count.max(1) as f32 * 100.0)
            })
            .collect();

        let avg_confidence = if success_count > 0 {
            successes.iter().map(|e| e.confidence).sum::<f32>() / success_count as f32
        } else {
            0.0
        };
        let embeddings_usage_rate = if success_count > 0 {
            successes.iter().filter(|e| e.embeddings_used).count() as f32
                / success_count as f32
                * 100.0
        } else {
            0.0
        };

        LedgerStats {
            total,
            success_rate: success_count as f32 / total as f32 * 100.0,
            avg_latency_ms: latency_sum as f32 / total as f32,
            avg_confidence,
            tier_rates,
            error_kinds,
            embeddings_usage_rate,
        }
    }
}

impl Default for TelemetryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn success(tier: Tier, confidence: f32) -> TelemetryEntry {
        TelemetryEntry::success(tier, 100, confidence, true)
    }

    #[test]
    fn ring_drops_oldest_beyond_capacity() {
        let ledger = TelemetryLedger::with_capacity(3);
        for i in 0..5 {
            ledger.record(TelemetryEntry::success(Tier::Primary, i, 0.9, true));
        }
        assert_eq!(ledger.len(), 3);
        let recent = ledger.recent(10);
        assert_eq!(recent[0].latency_ms, 4);
        assert_eq!(recent[2].latency_ms, 2);
    }

    #[test]
    fn stats_aggregate_successes_and_failures() {
        let ledger = TelemetryLedger::new();
        for _ in 0..8 {
            ledger.record(success(Tier::Primary, 0.9));
        }
        ledger.record(TelemetryEntry::failure(Tier::Primary, 200, "rate_limit"));
        ledger.record(success(Tier::Textual, 0.6));

        let stats = ledger.stats();
        assert_eq!(stats.total, 10);
        assert_eq!(stats.success_rate, 90.0);
        assert_eq!(stats.error_kinds.get("rate_limit"), Some(&1));
        let primary_rate = stats.tier_rates.get("primary").copied().unwrap();
        assert!((primary_rate - 88.888_89).abs() < 0.01);
    }

    #[test]
    fn stats_cache_is_invalidated_on_write() {
        let ledger = TelemetryLedger::new();
        ledger.record(success(Tier::Primary, 0.9));
        assert_eq!(ledger.stats().total, 1);
        ledger.record(success(Tier::Primary, 0.9));
        assert_eq!(ledger.stats().total, 2);
    }

    #[test]
    fn detect_issues_silent_below_minimum_sample() {
        let ledger = TelemetryLedger::new();
        for _ in 0..9 {
            ledger.record(TelemetryEntry::failure(Tier::Emergency, 9_000, "timeout"));
        }
        assert!(ledger.detect_issues().is_empty());
    }

    #[test]
    fn detect_issues_flags_degraded_window() {
        let ledger = TelemetryLedger::new();
        for _ in 0..6 {
            ledger.record(success(Tier::Primary, 0.9));
        }
        for _ in 0..6 {
            ledger.record(TelemetryEntry::failure(Tier::Primary, 12_000, "timeout"));
        }

        let warnings = ledger.detect_issues();
        assert!(warnings.iter().any(|w| w.contains("Success rate")));
        assert!(warnings.iter().any(|w| w.contains("latency")));
    }

    #[test]
    fn detect_issues_flags_emergency_rate() {
        let ledger = TelemetryLedger::new();
        for _ in 0..18 {
            ledger.record(success(Tier::Primary, 0.9));
        }
        for _ in 0..2 {
            ledger.record(TelemetryEntry::success(Tier::Emergency, 10, 0.0, false));
        }
        let warnings = ledger.detect_issues();
        assert!(warnings.iter().any(|w| w.contains("Emergency")));
    }

    #[test]
    fn cleanup_purges_old_entries() {
        let ledger = TelemetryLedger::new();
        ledger.record(success(Tier::Primary, 0.9));
        assert_eq!(ledger.cleanup(Duration::from_secs(3600)), 0);
        assert_eq!(ledger.cleanup(Duration::ZERO), 1);
        assert!(ledger.is_empty());
    }

    #[test]
    fn export_includes_stats_and_entries() {
        let ledger = TelemetryLedger::new();
        ledger.record(success(Tier::Primary, 0.9));
        let json = ledger.export().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["stats"]["total"], 1);
        assert_eq!(parsed["entries"].as_array().unwrap().len(), 1);
    }
}
