//! Mock conversion strategy for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::converter::{
    ConversionError, ConversionOptions, ConversionStrategy, Dimension, GHOSTSCRIPT_CONVERSIONS,
    INKSCAPE_CONVERSIONS,
};
use crate::format::Format;
use crate::locator::LocatorError;

/// A recorded conversion call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    pub from: Format,
    pub to: Format,
    pub content: Vec<u8>,
    pub options: ConversionOptions,
}

/// Mock implementation of [`ConversionStrategy`].
///
/// Provides controllable behavior for testing:
/// - Track conversion calls for assertions
/// - Queue failures per pair
/// - Configure outputs per pair
/// - Toggle availability
///
/// Unconfigured calls succeed with `"<name>:<from>-><to>:"` followed by the
/// input bytes, so chained conversions are visible in the final output.
///
/// `convert` accepts any pair, not only the advertised ones.
///
/// # Example
///
/// ```rust,ignore
/// use vecconv_core::testing::MockStrategy;
///
/// let vector = MockStrategy::vector();
/// vector.fail_next(Format::Pdf, Format::Svg, missing_output_error());
///
/// let converter = Converter::new(Arc::new(vector), Arc::new(MockStrategy::print()));
/// ```
#[derive(Debug)]
pub struct MockStrategy {
    name: String,
    supported: Vec<(Format, Format)>,
    available: AtomicBool,
    calls: Mutex<Vec<RecordedConversion>>,
    errors: Mutex<HashMap<(Format, Format), VecDeque<ConversionError>>>,
    outputs: Mutex<HashMap<(Format, Format), Vec<u8>>>,
    dimensions: Mutex<Option<(u32, u32)>>,
}

impl MockStrategy {
    /// Create a mock advertising `supported`.
    pub fn new(name: &str, supported: &[(Format, Format)]) -> Self {
        Self {
            name: name.to_string(),
            supported: supported.to_vec(),
            available: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
            errors: Mutex::new(HashMap::new()),
            outputs: Mutex::new(HashMap::new()),
            dimensions: Mutex::new(None),
        }
    }

    /// A stand-in for the vector tool, advertising the same pairs.
    pub fn vector() -> Self {
        Self::new("mock-vector", INKSCAPE_CONVERSIONS)
    }

    /// A stand-in for the print tool, advertising the same pairs.
    pub fn print() -> Self {
        Self::new("mock-print", GHOSTSCRIPT_CONVERSIONS)
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Queue an error for the next call converting `from` to `to`.
    pub fn fail_next(&self, from: Format, to: Format, error: ConversionError) {
        lock(&self.errors)
            .entry((from, to))
            .or_default()
            .push_back(error);
    }

    /// Return `output` for every call converting `from` to `to`.
    pub fn set_output(&self, from: Format, to: Format, output: impl Into<Vec<u8>>) {
        lock(&self.outputs).insert((from, to), output.into());
    }

    /// Answer dimension queries with `width` x `height`.
    pub fn set_dimensions(&self, width: u32, height: u32) {
        *lock(&self.dimensions) = Some((width, height));
    }

    /// Get all recorded conversions.
    pub fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        lock(&self.calls).clone()
    }

    /// The `(from, to)` pairs converted so far, in call order.
    pub fn recorded_pairs(&self) -> Vec<(Format, Format)> {
        lock(&self.calls).iter().map(|c| (c.from, c.to)).collect()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn clear_recorded(&self) {
        lock(&self.calls).clear();
    }

    /// The output an unconfigured call produces.
    pub fn default_output(&self, content: &[u8], from: Format, to: Format) -> Vec<u8> {
        let mut out = format!("{}:{from}->{to}:", self.name).into_bytes();
        out.extend_from_slice(content);
        out
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl ConversionStrategy for MockStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_conversions(&self) -> &[(Format, Format)] {
        &self.supported
    }

    fn available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn convert(
        &self,
        content: &[u8],
        from: Format,
        to: Format,
        options: &ConversionOptions,
    ) -> Result<Vec<u8>, ConversionError> {
        if !self.available() {
            return Err(LocatorError::ToolNotFound {
                tool: self.name.clone(),
                searched: Vec::new(),
            }
            .into());
        }

        lock(&self.calls).push(RecordedConversion {
            from,
            to,
            content: content.to_vec(),
            options: options.clone(),
        });

        if let Some(err) = lock(&self.errors)
            .get_mut(&(from, to))
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }

        if let Some(output) = lock(&self.outputs).get(&(from, to)) {
            return Ok(output.clone());
        }

        Ok(self.default_output(content, from, to))
    }

    async fn query_dimension(
        &self,
        _content: &[u8],
        _format: Format,
        dimension: Dimension,
    ) -> Result<u32, ConversionError> {
        match *lock(&self.dimensions) {
            Some((width, _)) if dimension == Dimension::Width => Ok(width),
            Some((_, height)) => Ok(height),
            None => Err(ConversionError::query_failed(
                dimension.as_str(),
                "no dimensions configured",
            )),
        }
    }
}
