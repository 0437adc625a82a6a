//! Binary encoders for instruction-based formats.
//!
//! Page layout and OOXML packaging live outside this crate. An encoder takes
//! the ordered instruction list produced by the flow or paginated renderer and
//! returns the final bytes. Register encoders per format in an
//! [`EncoderRegistry`].
//!
//! # Example
//!
//! ```
//! use docport::render::encoder::{BinaryEncoder, EncoderRegistry};
//! use docport::render::instruction::InstructionDocument;
//! use docport::ExportFormat;
//! use std::sync::Arc;
//!
//! struct CountingEncoder;
//!
//! impl BinaryEncoder for CountingEncoder {
//!     fn name(&self) -> &str {
//!         "counting"
//!     }
//!
//!     fn encode(&self, doc: &InstructionDocument) -> docport::Result<Vec<u8>> {
//!         Ok(doc.len().to_string().into_bytes())
//!     }
//! }
//!
//! let mut registry = EncoderRegistry::new();
//! registry.register(ExportFormat::Pdf, Arc::new(CountingEncoder));
//! assert!(registry.supports(ExportFormat::Pdf));
//! ```

use super::instruction::InstructionDocument;
use crate::error::{Error, Result};
use crate::format::ExportFormat;
use std::collections::HashMap;
use std::sync::Arc;

/// Turns an instruction list into output bytes.
pub trait BinaryEncoder: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Encode the instruction list.
    fn encode(&self, doc: &InstructionDocument) -> Result<Vec<u8>>;
}

/// Writes the instruction list itself as pretty JSON.
///
/// Lets the whole pipeline run without a real PDF or DOCX backend; the output
/// is what a real encoder would receive.
#[derive(Debug, Clone, Default)]
pub struct InstructionDumpEncoder {
    _private: (),
}

impl InstructionDumpEncoder {
    /// Create a new dump encoder.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl BinaryEncoder for InstructionDumpEncoder {
    fn name(&self) -> &str {
        "instruction-dump"
    }

    fn encode(&self, doc: &InstructionDocument) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(doc)
            .map_err(|e| Error::Render(format!("instruction serialization error: {}", e)))
    }
}

/// Registry mapping binary formats to encoders.
#[derive(Clone)]
pub struct EncoderRegistry {
    encoders: HashMap<ExportFormat, Arc<dyn BinaryEncoder>>,
}

impl EncoderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            encoders: HashMap::new(),
        }
    }

    /// Create a registry with the instruction dump encoder for DOCX and PDF.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let dump: Arc<dyn BinaryEncoder> = Arc::new(InstructionDumpEncoder::new());
        registry.register(ExportFormat::Docx, Arc::clone(&dump));
        registry.register(ExportFormat::Pdf, dump);
        registry
    }

    /// Register (or replace) the encoder for a format.
    pub fn register(&mut self, format: ExportFormat, encoder: Arc<dyn BinaryEncoder>) {
        self.encoders.insert(format, encoder);
    }

    /// Get the encoder for a format.
    pub fn get(&self, format: ExportFormat) -> Option<Arc<dyn BinaryEncoder>> {
        self.encoders.get(&format).cloned()
    }

    /// Check if a format has an encoder.
    pub fn supports(&self, format: ExportFormat) -> bool {
        self.encoders.contains_key(&format)
    }

    /// Encode with the registered encoder.
    pub fn encode(&self, format: ExportFormat, doc: &InstructionDocument) -> Result<Vec<u8>> {
        let encoder = self
            .get(format)
            .ok_or_else(|| Error::Render(format!("no encoder registered for {}", format)))?;
        log::debug!("Encoding {} with '{}'", format, encoder.name());
        encoder
            .encode(doc)
            .map_err(|e| match e {
                Error::Render(msg) => Error::Render(format!("{}: {}", encoder.name(), msg)),
                other => other,
            })
    }
}

impl Default for EncoderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for EncoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self
            .encoders
            .iter()
            .map(|(format, enc)| format!("{}={}", format, enc.name()))
            .collect();
        names.sort();
        f.debug_struct("EncoderRegistry")
            .field("encoders", &names)
            .finish()
    }
}
