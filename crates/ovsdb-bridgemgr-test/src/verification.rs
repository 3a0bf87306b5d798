//! Verification helpers for testing bridge orchestration
//!
//! Provides assertion helpers over the calls captured by a mock network

use thiserror::Error;

use crate::fixtures::{Call, MockOp};

/// Verification error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Expected call {op:?} on '{target}' not found in {actual:?}")]
    CallNotFound {
        op: MockOp,
        target: String,
        actual: Vec<String>,
    },

    #[error("Unexpected call {op:?} on '{target}'")]
    UnexpectedCall { op: MockOp, target: String },

    #[error("Expected {expected} calls, found {actual}: {calls:?}")]
    CallCountMismatch {
        expected: usize,
        actual: usize,
        calls: Vec<String>,
    },

    #[error("Expected call order {expected:?}, got {actual:?}")]
    OrderMismatch {
        expected: Vec<MockOp>,
        actual: Vec<MockOp>,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Capability call verifier
pub struct CallVerifier {
    calls: Vec<Call>,
}

impl CallVerifier {
    /// Create a new call verifier
    pub fn new(calls: Vec<Call>) -> Self {
        Self { calls }
    }

    fn summary(&self) -> Vec<String> {
        self.calls
            .iter()
            .map(|c| format!("{:?} {} {}", c.op, c.device, c.target))
            .collect()
    }

    fn mutations(&self) -> impl Iterator<Item = &Call> {
        self.calls.iter().filter(|c| c.op.is_mutation())
    }

    /// Verify that `op` was called with `target`
    pub fn assert_called(&self, op: MockOp, target: &str) -> VerifyResult<()> {
        if self.calls.iter().any(|c| c.op == op && c.target == target) {
            Ok(())
        } else {
            Err(VerificationError::CallNotFound {
                op,
                target: target.to_string(),
                actual: self.summary(),
            })
        }
    }

    /// Verify that `op` was never called
    pub fn assert_not_called(&self, op: MockOp) -> VerifyResult<()> {
        match self.calls.iter().find(|c| c.op == op) {
            Some(call) => Err(VerificationError::UnexpectedCall {
                op,
                target: call.target.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Verify that nothing changed switch or inventory state
    pub fn assert_no_mutations(&self) -> VerifyResult<()> {
        match self.mutations().next() {
            Some(call) => Err(VerificationError::UnexpectedCall {
                op: call.op,
                target: call.target.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Verify the number of calls recorded
    pub fn assert_call_count(&self, expected: usize) -> VerifyResult<()> {
        let actual = self.calls.len();
        if actual != expected {
            Err(VerificationError::CallCountMismatch {
                expected,
                actual,
                calls: self.summary(),
            })
        } else {
            Ok(())
        }
    }

    /// Verify the exact sequence of mutating calls
    pub fn assert_mutation_order(&self, expected: &[MockOp]) -> VerifyResult<()> {
        let actual: Vec<MockOp> = self.mutations().map(|c| c.op).collect();
        if actual != expected {
            Err(VerificationError::OrderMismatch {
                expected: expected.to_vec(),
                actual,
            })
        } else {
            Ok(())
        }
    }

    /// Get all captured calls
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }
}
