//! Replay statistics.

use std::collections::BTreeMap;
use std::time::Duration;

use contracts::SubmitOutcome;
use dispatcher::ShutdownReport;
use observability::DeliverySummary;

/// Statistics from a replay run
#[derive(Debug, Clone, Default)]
pub struct ReplayStats {
    /// Records handed to the relay
    pub submitted: u64,

    /// Submission outcomes by label
    pub outcomes: BTreeMap<&'static str, u64>,

    /// Lines skipped as malformed
    pub malformed: u64,

    /// Wall time from first submission to drained shutdown
    pub duration: Duration,

    /// Final dispatcher report
    pub shutdown: Option<ShutdownReport>,

    /// Worker-side delivery results
    pub delivery: DeliverySummary,
}

impl ReplayStats {
    pub fn record(&mut self, outcome: SubmitOutcome) {
        self.submitted += 1;
        *self.outcomes.entry(outcome.as_str()).or_default() += 1;
    }

    pub fn count(&self, outcome: SubmitOutcome) -> u64 {
        self.outcomes.get(outcome.as_str()).copied().unwrap_or(0)
    }

    /// Submissions that never reached a worker
    pub fn dropped(&self) -> u64 {
        self.submitted - self.count(SubmitOutcome::Enqueued)
    }

    /// Submissions per second
    pub fn rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.submitted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Replay Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Submitted: {}", self.submitted);
        println!("   ├─ Rate: {:.2} / s", self.rate());
        println!("   ├─ Malformed lines: {}", self.malformed);
        println!("   └─ Dropped at submit: {}", self.dropped());

        if !self.outcomes.is_empty() {
            println!("\nSubmit outcomes");
            let last = self.outcomes.len() - 1;
            for (i, (label, count)) in self.outcomes.iter().enumerate() {
                let prefix = if i == last { "└─" } else { "├─" };
                println!("   {} {}: {}", prefix, label, count);
            }
        }

        if let Some(report) = &self.shutdown {
            println!("\nShutdown");
            println!("   ├─ Cancelled in queue: {}", report.cancelled);
            println!("   └─ Abandoned workers: {}", report.abandoned_workers);
        }

        println!("\n{}", self.delivery);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_counts() {
        let mut stats = ReplayStats::default();
        for _ in 0..10 {
            stats.record(SubmitOutcome::Enqueued);
        }
        for _ in 0..5 {
            stats.record(SubmitOutcome::Denied);
        }
        stats.duration = Duration::from_secs(5);

        assert_eq!(stats.submitted, 15);
        assert_eq!(stats.count(SubmitOutcome::Denied), 5);
        assert_eq!(stats.count(SubmitOutcome::QueueFull), 0);
        assert_eq!(stats.dropped(), 5);
        assert!((stats.rate() - 3.0).abs() < f64::EPSILON);
    }
}
