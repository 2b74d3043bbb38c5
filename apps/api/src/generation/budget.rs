//! Token budget estimation. Pure functions; every result is clamped to the provider ceiling.

use crate::llm_client::ProviderLimits;

/// `min(round(target_words × tokens_per_word), max_tokens_per_call)`.
pub fn estimate_tokens(target_words: u32, limits: &ProviderLimits) -> u32 {
    words_to_tokens(target_words, limits).min(limits.max_tokens_per_call)
}

/// Budget for the first call of a request. A zero estimate (no length requirement)
/// falls back to the full per-call ceiling.
pub fn call_budget(target_words: u32, limits: &ProviderLimits) -> u32 {
    match estimate_tokens(target_words, limits) {
        0 => limits.max_tokens_per_call,
        tokens => tokens,
    }
}

/// Budget for an expansion call: the larger of the full-target estimate and the
/// shortfall estimate, never above the ceiling.
pub fn expansion_budget(target_words: u32, shortfall_words: u32, limits: &ProviderLimits) -> u32 {
    estimate_tokens(target_words, limits)
        .max(words_to_tokens(shortfall_words, limits))
        .min(limits.max_tokens_per_call)
}

fn words_to_tokens(words: u32, limits: &ProviderLimits) -> u32 {
    let tokens = (words as f64 * limits.tokens_per_word as f64).round();
    if tokens >= u32::MAX as f64 {
        u32::MAX
    } else {
        tokens as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::ProviderKind;

    fn standard() -> ProviderLimits {
        ProviderKind::Standard.limits()
    }

    #[test]
    fn test_estimate_scales_by_ratio() {
        // 1000 words × 1.6 = 1600
        assert_eq!(estimate_tokens(1000, &standard()), 1600);
    }

    #[test]
    fn test_estimate_rounds_to_nearest() {
        // 3 × 1.6 = 4.8 → 5
        assert_eq!(estimate_tokens(3, &standard()), 5);
    }

    #[test]
    fn test_estimate_clamped_to_standard_ceiling() {
        // 4000 × 1.6 = 6400 fits; 5000 × 1.6 = 8000 does not
        assert_eq!(estimate_tokens(4000, &standard()), 6400);
        assert_eq!(estimate_tokens(5000, &standard()), 7800);
    }

    #[test]
    fn test_estimate_clamped_to_high_context_ceiling() {
        let limits = ProviderKind::HighContext.limits();
        assert_eq!(estimate_tokens(10_000, &limits), 16_000);
        assert_eq!(estimate_tokens(40_000, &limits), 50_000);
    }

    #[test]
    fn test_estimate_never_exceeds_ceiling_for_any_target() {
        let custom = ProviderLimits {
            max_tokens_per_call: 123,
            tokens_per_word: 7.3,
            context_window: 1_000,
        };
        for limits in [standard(), ProviderKind::HighContext.limits(), custom] {
            for target in [0, 1, 17, 999, 4_875, 31_249, 1_000_000, u32::MAX] {
                assert!(estimate_tokens(target, &limits) <= limits.max_tokens_per_call);
            }
        }
    }

    #[test]
    fn test_estimate_is_deterministic() {
        assert_eq!(
            estimate_tokens(2345, &standard()),
            estimate_tokens(2345, &standard())
        );
    }

    #[test]
    fn test_call_budget_zero_target_uses_ceiling() {
        assert_eq!(estimate_tokens(0, &standard()), 0);
        assert_eq!(call_budget(0, &standard()), 7800);
        assert_eq!(call_budget(100, &standard()), 160);
    }

    #[test]
    fn test_expansion_budget_prefers_larger_estimate() {
        // target 1000 → 1600; shortfall 200 → 320
        assert_eq!(expansion_budget(1000, 200, &standard()), 1600);
        let high = ProviderKind::HighContext.limits();
        // target 100 → 160; shortfall 5000 → 8000
        assert_eq!(expansion_budget(100, 5000, &high), 8000);
    }

    #[test]
    fn test_expansion_budget_clamped() {
        assert_eq!(expansion_budget(100, 20_000, &standard()), 7800);
    }
}
