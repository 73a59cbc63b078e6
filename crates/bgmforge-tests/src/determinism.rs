//! Determinism checks for encoded assets.
//!
//! Encoding the same document must always produce the same bytes: the
//! external patcher compares BLAKE3 hashes of rebuilt assets, and a stray
//! iteration-order dependency would show up as a spurious change.
//!
//! # Example
//!
//! ```
//! use bgmforge_codec::encode;
//! use bgmforge_tests::{fixtures, verify_determinism};
//!
//! let doc = bgmforge_codec::decode(&fixtures::two_track_song().bytes).unwrap();
//! let result = verify_determinism(|| encode(&doc).unwrap(), 3);
//! assert!(result.is_deterministic);
//! ```

use std::fmt;

/// Result of a determinism verification.
#[derive(Debug, Clone)]
pub struct DeterminismResult {
    /// Whether all runs produced identical output.
    pub is_deterministic: bool,
    /// Number of runs performed.
    pub runs: usize,
    /// Size of the first output in bytes.
    pub output_size: usize,
    /// BLAKE3 hash of the first output.
    pub hash: String,
    /// The first difference found, if any.
    pub diff_info: Option<DiffInfo>,
}

/// The first byte difference between two runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffInfo {
    /// Byte offset of the difference; the shorter length when sizes differ.
    pub offset: usize,
    /// Byte from the first run, if it has one at `offset`.
    pub expected: Option<u8>,
    /// Byte from the differing run, if it has one at `offset`.
    pub actual: Option<u8>,
    /// Which run (0-indexed) differed.
    pub run_index: usize,
    /// Up to 8 bytes of the first run before the difference.
    pub before: Vec<u8>,
}

fn hex(byte: Option<u8>) -> String {
    byte.map_or_else(|| "--".to_string(), |b| format!("{:02X}", b))
}

impl fmt::Display for DiffInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Difference at byte {:#06x}: expected {}, got {} (run {})",
            self.offset,
            hex(self.expected),
            hex(self.actual),
            self.run_index
        )?;
        if !self.before.is_empty() {
            write!(f, "\n  Context: ")?;
            for b in &self.before {
                write!(f, "{:02X} ", b)?;
            }
            write!(f, "[{}]", hex(self.expected))?;
        }
        Ok(())
    }
}

impl DeterminismResult {
    /// Panic with a detailed message if not deterministic.
    pub fn assert_deterministic(&self) {
        if let Some(diff) = &self.diff_info {
            panic!(
                "Non-deterministic output detected!\n\
                 Runs: {}\n\
                 Output size: {} bytes\n\
                 Hash: {}\n\
                 {}",
                self.runs, self.output_size, self.hash, diff
            );
        }
    }
}

/// Find the first difference between two outputs.
pub fn first_difference(expected: &[u8], actual: &[u8], run_index: usize) -> Option<DiffInfo> {
    let offset = expected
        .iter()
        .zip(actual)
        .position(|(e, a)| e != a)
        .or_else(|| (expected.len() != actual.len()).then(|| expected.len().min(actual.len())))?;
    Some(DiffInfo {
        offset,
        expected: expected.get(offset).copied(),
        actual: actual.get(offset).copied(),
        run_index,
        before: expected[offset.saturating_sub(8)..offset.min(expected.len())].to_vec(),
    })
}

/// Run `generate_fn` `runs` times and compare every output with the first.
pub fn verify_determinism<F, O>(generate_fn: F, runs: usize) -> DeterminismResult
where
    F: Fn() -> O,
    O: AsRef<[u8]>,
{
    assert!(runs >= 2, "Must run at least 2 times to verify determinism");

    let reference = generate_fn();
    let reference = reference.as_ref();
    let hash = compute_hash(reference);

    let diff_info = (1..runs).find_map(|run_index| {
        let output = generate_fn();
        first_difference(reference, output.as_ref(), run_index)
    });

    DeterminismResult {
        is_deterministic: diff_info.is_none(),
        runs,
        output_size: reference.len(),
        hash,
        diff_info,
    }
}

/// Verify and panic on any difference.
pub fn assert_deterministic<F, O>(generate_fn: F, runs: usize) -> String
where
    F: Fn() -> O,
    O: AsRef<[u8]>,
{
    let result = verify_determinism(generate_fn, runs);
    result.assert_deterministic();
    result.hash
}

/// Compute the BLAKE3 hash of data, hex encoded.
pub fn compute_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}
