// ABOUTME: Redaction of resolved secret values from every text sink.
// ABOUTME: Wraps tracing writers so log lines are scrubbed before they reach stderr.

use parking_lot::RwLock;
use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// Replacement text for a redacted value.
pub const REDACTED: &str = "***";

/// Set of secret values that must never appear in output.
///
/// Cloning shares the underlying set, so values registered through the
/// secret broker are immediately scrubbed by every sink holding a clone.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    known: Arc<RwLock<Vec<String>>>,
}

impl Redactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value to redact. Empty values are ignored.
    pub fn register(&self, value: &str) {
        if value.is_empty() {
            return;
        }

        let mut known = self.known.write();
        for form in [value.to_string(), escaped(value)] {
            if !known.contains(&form) {
                known.push(form);
            }
        }
        // Longest first so a secret containing another is replaced whole.
        known.sort_by_key(|k| std::cmp::Reverse(k.len()));
    }

    /// Number of registered values.
    pub fn len(&self) -> usize {
        self.known.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.read().is_empty()
    }

    /// Replace every occurrence of a registered value with [`REDACTED`].
    pub fn redact<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let known = self.known.read();
        if !known.iter().any(|k| text.contains(k.as_str())) {
            return Cow::Borrowed(text);
        }

        let mut redacted = text.to_string();
        for value in known.iter() {
            if redacted.contains(value.as_str()) {
                redacted = redacted.replace(value.as_str(), REDACTED);
            }
        }
        Cow::Owned(redacted)
    }

    /// Redact every string inside a JSON value, in place.
    ///
    /// Runs before serialization so a secret containing characters JSON
    /// escapes is still matched.
    pub fn redact_json(&self, value: &mut serde_json::Value) {
        match value {
            serde_json::Value::String(text) => {
                if let Cow::Owned(redacted) = self.redact(text) {
                    *text = redacted;
                }
            }
            serde_json::Value::Array(items) => {
                items.iter_mut().for_each(|item| self.redact_json(item));
            }
            serde_json::Value::Object(fields) => {
                fields.values_mut().for_each(|field| self.redact_json(field));
            }
            _ => {}
        }
    }
}

/// The value as it appears inside a quoted, escaped string (`Debug`
/// formatting, JSON text).
fn escaped(value: &str) -> String {
    let quoted = format!("{value:?}");
    quoted[1..quoted.len() - 1].to_string()
}

/// A [`MakeWriter`] that scrubs registered secrets from each log event.
///
/// Every writer it hands out buffers one event and emits the redacted text
/// on flush or drop, so a secret split across several `write` calls is still
/// caught.
pub struct RedactingMakeWriter<M> {
    redactor: Redactor,
    inner: M,
}

impl<M> RedactingMakeWriter<M> {
    pub fn new(redactor: Redactor, inner: M) -> Self {
        Self { redactor, inner }
    }
}

impl RedactingMakeWriter<fn() -> io::Stderr> {
    /// Redacting writer over the process's stderr.
    pub fn stderr(redactor: Redactor) -> Self {
        Self::new(redactor, io::stderr)
    }
}

impl<'a, M> MakeWriter<'a> for RedactingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = RedactingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            redactor: self.redactor.clone(),
            inner: self.inner.make_writer(),
            buf: Vec::new(),
        }
    }
}

pub struct RedactingWriter<W: Write> {
    redactor: Redactor,
    inner: W,
    buf: Vec<u8>,
}

impl<W: Write> RedactingWriter<W> {
    fn emit(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        {
            let text = String::from_utf8_lossy(&self.buf);
            let redacted = self.redactor.redact(&text);
            self.inner.write_all(redacted.as_bytes())?;
        }
        self.buf.clear();
        self.inner.flush()
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit()
    }
}

impl<W: Write> Drop for RedactingWriter<W> {
    fn drop(&mut self) {
        let _ = self.emit();
    }
}
