//! Shannon-entropy fingerprinting of raw source text.
//!
//! Symbols are Unicode scalar values. For a text of `length` symbols with
//! `distinct` different symbols, the reading carries
//! `H = -Σ p·log2(p)`, the reference `log2(distinct)` and their ratio.
//!
//! Degenerate inputs are pinned: empty or whitespace-only text reads `0.0`,
//! a single repeated symbol reads `1.0`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The measured entropy shape of one text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntropyReading {
    /// `entropy / reference_entropy`, or the pinned value for degenerate text.
    pub ratio: f64,
    /// Shannon entropy in bits per symbol.
    pub entropy: f64,
    /// `log2(distinct)`, or `0.0` when fewer than two symbols occur.
    pub reference_entropy: f64,
    /// Symbol count.
    pub length: usize,
    pub distinct: usize,
}

impl EntropyReading {
    const BLANK: EntropyReading = EntropyReading {
        ratio: 0.0,
        entropy: 0.0,
        reference_entropy: 0.0,
        length: 0,
        distinct: 0,
    };

    /// True when the ratio strictly exceeds `threshold`.
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.ratio > threshold
    }
}

/// Measures the entropy shape of `text`.
pub fn entropy_fingerprint(text: &str) -> EntropyReading {
    if text.trim().is_empty() {
        return EntropyReading::BLANK;
    }

    // Ordered histogram keeps the floating-point summation order fixed.
    let mut histogram: BTreeMap<char, usize> = BTreeMap::new();
    let mut length = 0usize;
    for symbol in text.chars() {
        *histogram.entry(symbol).or_insert(0) += 1;
        length += 1;
    }

    let distinct = histogram.len();
    let total = length as f64;
    let entropy = -histogram
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            p * p.log2()
        })
        .sum::<f64>();

    let reference_entropy = if distinct > 1 { (distinct as f64).log2() } else { 0.0 };
    let ratio = if reference_entropy > 0.0 { entropy / reference_entropy } else { 1.0 };

    EntropyReading {
        ratio,
        entropy,
        reference_entropy,
        length,
        distinct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_read_zero() {
        for text in ["", "   ", "\n\t  \r\n"] {
            let reading = entropy_fingerprint(text);
            assert_eq!(reading.ratio, 0.0);
            assert!(!reading.exceeds(1.05));
        }
    }

    #[test]
    fn single_symbol_reads_one() {
        let reading = entropy_fingerprint("aaaaaaaa");
        assert_eq!(reading.ratio, 1.0);
        assert_eq!(reading.distinct, 1);
        assert_eq!(reading.length, 8);
        assert!(!reading.exceeds(1.05));
    }

    #[test]
    fn uniform_alphabet_reads_one() {
        let text = "abcdefgh".repeat(16);
        let reading = entropy_fingerprint(&text);
        assert!((reading.ratio - 1.0).abs() < 1e-12);
        assert!((reading.entropy - 3.0).abs() < 1e-12);
    }

    #[test]
    fn skewed_text_reads_below_one() {
        let text = format!("{}{}", "=".repeat(200), "QmFzZTY0IGJsb2I");
        let reading = entropy_fingerprint(&text);
        assert!(reading.ratio > 0.0 && reading.ratio < 1.0);
    }

    #[test]
    fn symbols_are_chars_not_bytes() {
        let reading = entropy_fingerprint("λλΦΦ");
        assert_eq!(reading.length, 4);
        assert_eq!(reading.distinct, 2);
        assert!((reading.ratio - 1.0).abs() < 1e-12);
    }
}
