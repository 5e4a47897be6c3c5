// ABOUTME: Zero-width text insertions computed against one source snapshot
// ABOUTME: Applied back to front so no offset needs adjusting after an earlier splice

pub mod java;

pub use java::JavaInstrumenter;

use pulsegraph_core::{PulseGraphError, Result};

/// Header line above the injected import block.
pub const MARKER_AUTO_IMPORT: &str = "// [pulsegraph] Auto-Import";
/// Header line above the injected tracer field.
pub const MARKER_INJECTION: &str = "// [pulsegraph] Injection";
/// Header line above each span start.
pub const MARKER_TRACE_START: &str = "// [pulsegraph] Trace Start";
/// Present in every instrumented method body.
pub const SPAN_BUILDER_IDIOM: &str = "tracer.spanBuilder(";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    /// Byte offset into the original text.
    pub offset: usize,
    pub text: String,
    seq: usize,
}

/// Ordered collection of insertions.
///
/// Insertions sharing an offset come out in the order they were added.
#[derive(Debug, Clone, Default)]
pub struct EditSet {
    edits: Vec<Insertion>,
}

impl EditSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, offset: usize, text: impl Into<String>) {
        let seq = self.edits.len();
        self.edits.push(Insertion {
            offset,
            text: text.into(),
            seq,
        });
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Insertion> {
        self.edits.iter()
    }

    /// Splice every insertion into `source`.
    ///
    /// Sorted by descending offset, ties by descending sequence, so each
    /// splice lands at or before every splice already made.
    pub fn apply(mut self, source: &str) -> Result<String> {
        if let Some(bad) = self
            .edits
            .iter()
            .find(|e| e.offset > source.len() || !source.is_char_boundary(e.offset))
        {
            return Err(PulseGraphError::Instrumentation(format!(
                "insertion offset {} is not a character boundary of a {}-byte source",
                bad.offset,
                source.len()
            )));
        }

        self.edits
            .sort_by(|a, b| b.offset.cmp(&a.offset).then(b.seq.cmp(&a.seq)));

        let extra: usize = self.edits.iter().map(|e| e.text.len()).sum();
        let mut output = String::with_capacity(source.len() + extra);
        output.push_str(source);
        for edit in &self.edits {
            output.insert_str(edit.offset, &edit.text);
        }
        Ok(output)
    }
}
