use std::io::Write;

use crate::scanner::Pos;

/// Sink for diagnostics. Both the parser and the evaluator report through
/// this; the phase tag tells them apart in shared output.
pub trait Reporter {
    fn report(&mut self, pos: Pos, phase: &str, msg: &str);
}

/// Formats each diagnostic onto a `Write` sink, one line apiece.
pub struct WriteReporter<W> {
    writer: W,
}

impl<W> WriteReporter<W> {
    pub fn new(writer: W) -> WriteReporter<W> {
        WriteReporter { writer }
    }
}

impl<W> Reporter for WriteReporter<W>
where
    W: Write,
{
    fn report(&mut self, pos: Pos, phase: &str, msg: &str) {
        // A failed diagnostic write has nowhere better to go; drop it
        _ = writeln!(self.writer, "E {} [{}]: {}", pos, phase, msg);
    }
}

pub struct NoopReporter {}

impl Reporter for NoopReporter {
    fn report(&mut self, _pos: Pos, _phase: &str, _msg: &str) {}
}
