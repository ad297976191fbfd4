//! Determinism verification for chart generation.
//!
//! Given the same inputs and seed, a chart must be byte-identical across
//! runs.

use std::fmt;

/// Result of a determinism verification.
#[derive(Debug, Clone)]
pub struct DeterminismResult {
    /// Whether all runs produced identical output.
    pub is_deterministic: bool,
    /// Number of runs performed.
    pub runs: usize,
    /// BLAKE3 hash of the first run's output.
    pub hash: String,
    /// First differing byte offset and run, if any.
    pub first_difference: Option<(usize, usize)>,
}

impl fmt::Display for DeterminismResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.first_difference {
            None => write!(f, "deterministic over {} runs ({})", self.runs, self.hash),
            Some((offset, run)) => write!(
                f,
                "run {} differs from run 0 at byte {} over {} runs",
                run, offset, self.runs
            ),
        }
    }
}

/// Runs `generate` `runs` times and compares the outputs byte for byte.
pub fn verify_determinism<F>(mut generate: F, runs: usize) -> DeterminismResult
where
    F: FnMut() -> Vec<u8>,
{
    let runs = runs.max(2);
    let first = generate();
    let hash = blake3::hash(&first).to_hex().to_string();

    for run in 1..runs {
        let output = generate();
        let offset = first
            .iter()
            .zip(output.iter())
            .position(|(a, b)| a != b)
            .or_else(|| (first.len() != output.len()).then(|| first.len().min(output.len())));
        if let Some(offset) = offset {
            return DeterminismResult {
                is_deterministic: false,
                runs,
                hash,
                first_difference: Some((offset, run)),
            };
        }
    }

    DeterminismResult {
        is_deterministic: true,
        runs,
        hash,
        first_difference: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_difference() {
        let mut counter = 0u8;
        let result = verify_determinism(
            || {
                counter += 1;
                vec![0, counter]
            },
            3,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.first_difference, Some((1, 1)));
    }

    #[test]
    fn test_detects_length_difference() {
        let mut len = 1;
        let result = verify_determinism(
            || {
                len += 1;
                vec![7; len]
            },
            2,
        );
        assert_eq!(result.first_difference, Some((2, 1)));
    }

    #[test]
    fn test_stable_output() {
        let result = verify_determinism(|| b"3.00,2,5,6,1,,5\n".to_vec(), 4);
        assert!(result.is_deterministic);
        assert_eq!(result.runs, 4);
        assert_eq!(result.hash.len(), 64);
    }
}
