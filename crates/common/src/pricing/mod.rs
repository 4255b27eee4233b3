//! Cost accounting for generation calls
//!
//! Prices are fixed per model at USD per million tokens. Unknown models fall
//! back to a default tier so cost is never silently zero for a successful
//! call with nonzero usage.

/// Per-model price in USD per 1M tokens
#[derive(Debug, Clone, Copy)]
pub struct ModelPrice {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

const DEFAULT_PRICE: ModelPrice = ModelPrice {
    input_per_million: 1.0,
    output_per_million: 3.0,
};

/// Look up the price for a model
pub fn price_for_model(model: &str) -> ModelPrice {
    match model {
        "gpt-4o" => ModelPrice {
            input_per_million: 2.5,
            output_per_million: 10.0,
        },
        "gpt-4o-mini" => ModelPrice {
            input_per_million: 0.15,
            output_per_million: 0.6,
        },
        "gpt-4-turbo" => ModelPrice {
            input_per_million: 10.0,
            output_per_million: 30.0,
        },
        _ => DEFAULT_PRICE,
    }
}

/// Estimate cost in USD for one generation call
pub fn estimate_cost(model: &str, input_tokens: i32, output_tokens: i32) -> f64 {
    let price = price_for_model(model);
    let input = input_tokens.max(0) as f64 / 1_000_000.0 * price.input_per_million;
    let output = output_tokens.max(0) as f64 / 1_000_000.0 * price.output_per_million;
    input + output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_tokens_cost_nothing() {
        assert_eq!(estimate_cost("gpt-4o-mini", 0, 0), 0.0);
    }

    #[test]
    fn test_unknown_model_uses_default_tier() {
        let cost = estimate_cost("some-future-model", 1_000_000, 1_000_000);
        assert!((cost - (DEFAULT_PRICE.input_per_million + DEFAULT_PRICE.output_per_million)).abs() < 1e-9);
    }

    #[test]
    fn test_cost_is_monotonic_in_tokens() {
        let small = estimate_cost("gpt-4o", 1000, 500);
        let large = estimate_cost("gpt-4o", 2000, 500);
        let larger = estimate_cost("gpt-4o", 2000, 1500);
        assert!(small < large);
        assert!(large < larger);
    }

    #[test]
    fn test_negative_tokens_clamp_to_zero() {
        assert_eq!(estimate_cost("gpt-4o", -5, -5), 0.0);
    }
}
