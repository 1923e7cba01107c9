//! Tensor session abstraction shared by the enhancement engines

use crate::error::{Result, UpscaleError};
use ndarray::{Array4, ArrayD, Ix4};
use std::sync::Arc;

/// A loaded model graph: one NCHW tensor in, all graph outputs out
///
/// Implementations serialize concurrent callers internally if their runtime
/// needs exclusive access.
pub trait ModelSession: Send + Sync {
    /// Short name used in logs and error messages
    fn name(&self) -> &str;

    /// Run the graph on one input tensor
    ///
    /// # Errors
    /// - Runtime failures (shape mismatch, out of memory, poisoned lock)
    /// - Outputs that are not `f32` tensors
    fn run(&self, input: Array4<f32>) -> Result<Vec<ArrayD<f32>>>;
}

/// Session handle shared between engines
pub type SharedSession = Arc<dyn ModelSession>;

/// Run a session and return its first output as a 4D tensor
///
/// # Errors
/// - Session failure
/// - Missing output or an output that is not 4D
pub fn run_single(session: &dyn ModelSession, input: Array4<f32>) -> Result<Array4<f32>> {
    let outputs = session.run(input)?;
    let first = outputs.into_iter().next().ok_or_else(|| {
        UpscaleError::inference(format!("{} returned no output tensors", session.name()))
    })?;

    let ndim = first.ndim();
    first.into_dimensionality::<Ix4>().map_err(|_| {
        UpscaleError::inference(format!(
            "{}: expected 4D output tensor, got {ndim}D",
            session.name()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::{FailingSession, NearestUpscaleSession};

    #[test]
    fn test_run_single_returns_first_output() {
        let session = NearestUpscaleSession::new(4);
        let output = run_single(&session, Array4::zeros((1, 3, 2, 3))).unwrap();
        assert_eq!(output.dim(), (1, 3, 8, 12));
        assert_eq!(session.call_count(), 1);
    }

    #[test]
    fn test_run_single_propagates_failure() {
        let session = FailingSession::new("boom");
        let err = run_single(&session, Array4::zeros((1, 3, 2, 2))).unwrap_err();
        assert!(matches!(err, UpscaleError::Inference(_)));
        assert!(err.to_string().contains("boom"));
    }
}
