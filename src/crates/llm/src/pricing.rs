//! Static per-model price tables.

/// Price of one million input and output tokens, in USD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rate {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Rate {
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }
}

/// Per-model rates with a fallback for models the table does not list.
#[derive(Debug, Clone, Copy)]
pub struct PriceTable {
    rates: &'static [(&'static str, Rate)],
    default: Rate,
}

impl PriceTable {
    pub const fn new(rates: &'static [(&'static str, Rate)], default: Rate) -> Self {
        Self { rates, default }
    }

    /// Rate for `model`, or the provider default when unlisted.
    pub fn rate(&self, model: &str) -> Rate {
        self.rates
            .iter()
            .find(|(name, _)| *name == model)
            .map(|(_, rate)| *rate)
            .unwrap_or(self.default)
    }

    /// Cost in USD of one call.
    pub fn cost(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        let rate = self.rate(model);
        (input_tokens as f64 * rate.input_per_million + output_tokens as f64 * rate.output_per_million)
            / 1_000_000.0
    }
}

pub const OPENAI_PRICES: PriceTable = PriceTable::new(
    &[
        ("gpt-4o", Rate::new(2.50, 10.00)),
        ("gpt-4o-mini", Rate::new(0.15, 0.60)),
        ("gpt-4-turbo", Rate::new(10.00, 30.00)),
        ("gpt-4", Rate::new(30.00, 60.00)),
        ("gpt-3.5-turbo", Rate::new(0.50, 1.50)),
    ],
    Rate::new(2.50, 10.00),
);

pub const ANTHROPIC_PRICES: PriceTable = PriceTable::new(
    &[
        ("claude-3-5-sonnet-20241022", Rate::new(3.00, 15.00)),
        ("claude-3-5-sonnet-20240620", Rate::new(3.00, 15.00)),
        ("claude-sonnet-4-20250514", Rate::new(3.00, 15.00)),
        ("claude-3-opus-20240229", Rate::new(15.00, 75.00)),
        ("claude-3-haiku-20240307", Rate::new(0.25, 1.25)),
        ("claude-haiku-4-20250101", Rate::new(0.25, 1.25)),
    ],
    Rate::new(3.00, 15.00),
);

pub const GEMINI_PRICES: PriceTable = PriceTable::new(
    &[
        ("gemini-1.5-pro", Rate::new(1.25, 5.00)),
        ("gemini-1.5-flash", Rate::new(0.075, 0.30)),
    ],
    Rate::new(1.25, 5.00),
);
