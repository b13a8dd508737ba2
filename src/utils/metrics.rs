use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationStats {
    pub requests: u64,
    pub failures: u64,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
}

/// Per-operation request counters and latency, shared across services.
#[derive(Debug, Default)]
pub struct ServingStats {
    operations: DashMap<&'static str, OperationStats>,
}

impl ServingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, operation: &'static str, latency: Duration, succeeded: bool) {
        let latency_us = latency.as_micros() as u64;
        let mut stats = self.operations.entry(operation).or_default();

        stats.requests += 1;
        if !succeeded {
            stats.failures += 1;
        }

        // Simple moving average for latency
        let count = stats.requests;
        stats.avg_latency_us = if count == 1 {
            latency_us
        } else {
            (stats.avg_latency_us * (count - 1) + latency_us) / count
        };

        if latency_us > stats.max_latency_us {
            stats.max_latency_us = latency_us;
        }
    }

    pub fn get(&self, operation: &str) -> Option<OperationStats> {
        self.operations.get(operation).map(|entry| entry.value().clone())
    }

    pub fn snapshot(&self) -> BTreeMap<String, OperationStats> {
        self.operations
            .iter()
            .map(|entry| (entry.key().to_string(), entry.value().clone()))
            .collect()
    }
}
