//! Property tests for the entropy reading and the ingestion gate.

use proptest::prelude::*;

use ueg_check::{entropy_fingerprint, GateConfig, IngestionGate};

proptest! {
    #[test]
    fn ratio_is_bounded(text in ".{0,200}") {
        let reading = entropy_fingerprint(&text);
        prop_assert!(reading.ratio >= 0.0);
        prop_assert!(reading.ratio <= 1.0 + 1e-9);
    }

    #[test]
    fn reading_is_deterministic(text in ".{0,200}") {
        prop_assert_eq!(entropy_fingerprint(&text), entropy_fingerprint(&text));
    }

    #[test]
    fn single_symbol_is_benign(symbol in any::<char>().prop_filter("visible", |c| !c.is_whitespace()), n in 1usize..300) {
        let text: String = std::iter::repeat(symbol).take(n).collect();
        let reading = entropy_fingerprint(&text);
        prop_assert_eq!(reading.ratio, 1.0);
        prop_assert!(IngestionGate::default().admit(&text, "any").is_ok());
    }

    #[test]
    fn uniform_alphabet_is_never_flagged(width in 2usize..64, repeats in 1usize..20) {
        let alphabet: String = ('a'..).take(width).collect();
        let text = alphabet.repeat(repeats);
        let reading = entropy_fingerprint(&text);
        prop_assert!((reading.ratio - 1.0).abs() < 1e-9);
        prop_assert!(IngestionGate::default().admit(&text, "python").is_ok());
    }

    #[test]
    fn whitespace_reads_zero(text in "[ \t\r\n]{0,50}") {
        let reading = entropy_fingerprint(&text);
        prop_assert_eq!(reading.ratio, 0.0);
    }
}

#[test]
fn padded_high_entropy_blob_under_default_threshold() {
    // The ratio never exceeds 1.0, so the default 1.05 threshold admits this.
    let text = format!("{}{}", "A".repeat(64), "q8Zk3+Xy/7Lm0PwR9aTbVc2NdHe4GfJu");
    let reading = entropy_fingerprint(&text);
    assert!(reading.ratio < 1.0);
    assert!(IngestionGate::default().admit(&text, "solidity").is_ok());
}

#[test]
fn strict_threshold_rejects_near_uniform_blob() {
    let gate = IngestionGate::new(GateConfig { threshold: 0.92 });
    let blob = "q8Zk3+Xy/7Lm0PwR9aTbVc2NdHe4GfJu".repeat(3);
    let rejection = gate.admit(&blob, "solidity").unwrap_err();
    assert!(rejection.ratio > 0.92);
    assert_eq!(rejection.language, "solidity");
    assert!(rejection.to_string().contains("solidity source rejected"));
}
