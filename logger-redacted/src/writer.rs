use std::io;

use tracing_subscriber::fmt::MakeWriter;

use crate::redactor::PiiRedactor;

/// `MakeWriter` that redacts every formatted event before handing it to the
/// wrapped writer.
///
/// The fmt layer renders an event into a single buffer and writes it in one
/// call, so patterns never straddle two writes.
pub struct RedactingMakeWriter<M> {
    inner: M,
    redactor: PiiRedactor,
}

impl<M> RedactingMakeWriter<M> {
    pub fn new(inner: M, redactor: PiiRedactor) -> Self {
        Self { inner, redactor }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }
}

impl<'a, M> MakeWriter<'a> for RedactingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = RedactingWriter<'a, M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: self.inner.make_writer(),
            redactor: &self.redactor,
        }
    }
}

pub struct RedactingWriter<'a, W> {
    inner: W,
    redactor: &'a PiiRedactor,
}

impl<W: io::Write> io::Write for RedactingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        let redacted = self.redactor.redact(&text);
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
