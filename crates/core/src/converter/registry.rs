//! Priority-ordered collection of conversion strategies.

use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::error::ConversionError;
use super::traits::ConversionStrategy;
use super::types::ConversionOptions;
use crate::format::Format;

/// Holds strategies in registration order. The first registered strategy
/// that supports a pair and whose tool is available handles it.
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn ConversionStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, strategy: Arc<dyn ConversionStrategy>) {
        self.strategies.push(strategy);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, strategy: Arc<dyn ConversionStrategy>) -> Self {
        self.register(strategy);
        self
    }

    pub fn strategies(&self) -> &[Arc<dyn ConversionStrategy>] {
        &self.strategies
    }

    /// Whether any registered strategy advertises the pair.
    pub fn supports(&self, from: Format, to: Format) -> bool {
        self.strategies.iter().any(|s| s.supports(from, to))
    }

    /// Union of advertised pairs, sorted and without duplicates.
    pub fn supported_conversions(&self) -> Vec<(Format, Format)> {
        let mut pairs: Vec<_> = self
            .strategies
            .iter()
            .flat_map(|s| s.supported_conversions().iter().copied())
            .collect();
        pairs.sort();
        pairs.dedup();
        pairs
    }

    /// The strategy that would handle the pair.
    pub fn select(&self, from: Format, to: Format) -> Option<&Arc<dyn ConversionStrategy>> {
        self.strategies
            .iter()
            .find(|s| s.supports(from, to) && s.available())
    }

    /// Converts through the selected strategy.
    pub async fn dispatch(
        &self,
        content: &[u8],
        from: Format,
        to: Format,
        options: &ConversionOptions,
    ) -> Result<Vec<u8>, ConversionError> {
        let Some(strategy) = self.select(from, to) else {
            return Err(ConversionError::NoStrategy {
                from,
                to,
                supported: self.supported_conversions(),
            });
        };
        debug!(strategy = strategy.name(), %from, %to, "dispatching conversion");
        strategy.convert(content, from, to, options).await
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.strategies.iter().map(|s| s.name()))
            .finish()
    }
}
