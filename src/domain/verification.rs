// src/domain/verification.rs

use crate::domain::property::FailureReason;
use serde::Serialize;

/// The result of checking one property; lives until the status updater writes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub property_id: String,
    pub verified: bool,
    pub failure_reason: Option<FailureReason>,
}

impl VerificationOutcome {
    pub fn verified(property_id: impl Into<String>) -> Self {
        Self {
            property_id: property_id.into(),
            verified: true,
            failure_reason: None,
        }
    }

    pub fn failed(property_id: impl Into<String>, reason: FailureReason) -> Self {
        Self {
            property_id: property_id.into(),
            verified: false,
            failure_reason: Some(reason),
        }
    }
}

/// Cumulative counters reported to the dashboard after every batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VerificationCounts {
    pub processed: u64,
    pub verified: u64,
    pub failed: u64,
    pub api_error: u64,
    pub square_footage: u64,
    pub not_interested: u64,
    pub no_address: u64,
}

impl VerificationCounts {
    pub fn record(&mut self, outcome: &VerificationOutcome) {
        self.processed += 1;
        if outcome.verified {
            self.verified += 1;
            return;
        }

        self.failed += 1;
        match outcome.failure_reason {
            Some(FailureReason::ApiError) => self.api_error += 1,
            Some(FailureReason::SquareFootage) => self.square_footage += 1,
            Some(FailureReason::NotInterested) => self.not_interested += 1,
            Some(FailureReason::NoAddress) => self.no_address += 1,
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_break_failures_down_by_reason() {
        let mut counts = VerificationCounts::default();
        counts.record(&VerificationOutcome::verified("a"));
        counts.record(&VerificationOutcome::failed("b", FailureReason::ApiError));
        counts.record(&VerificationOutcome::failed("c", FailureReason::NoAddress));

        assert_eq!(counts.processed, 3);
        assert_eq!(counts.verified, 1);
        assert_eq!(counts.failed, 2);
        assert_eq!(counts.api_error, 1);
        assert_eq!(counts.no_address, 1);
        assert_eq!(counts.square_footage, 0);
    }
}
