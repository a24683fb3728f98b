//! Plain-text report, one line per visited object

use std::io::Write;

use crate::error::{Error, Result};
use crate::pdf::traverse::{Label, Visit, Visitor};

/// Writes each node as an indented line
///
/// Indentation is two dashes per level:
///
/// ```text
/// Dictionary (OCProperties): 2 elements
/// --Array (OCGs): 2 elements
/// ----Dictionary (0): 2 elements
/// ------Type: OCG
/// ```
pub struct TextReport<W: Write> {
    out: W,
}

impl<W: Write> TextReport<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn indent(&mut self, depth: usize) -> Result<()> {
        write!(self.out, "{}", "-".repeat(depth * 2))?;
        Ok(())
    }
}

impl<W: Write> Visitor for TextReport<W> {
    fn visit(&mut self, label: &Label<'_>, node: &Visit<'_>, depth: usize) -> Result<()> {
        self.indent(depth)?;
        match node {
            Visit::Null => writeln!(self.out, "Null")?,
            Visit::Boolean(b) => writeln!(self.out, "Boolean: {}", b)?,
            Visit::Integer(n) => writeln!(self.out, "Integer: {}", n)?,
            Visit::Real(r) => writeln!(self.out, "Real: {}", r)?,
            Visit::String(s) => writeln!(self.out, "String: {}", String::from_utf8_lossy(s))?,
            Visit::Name(n) => writeln!(self.out, "{}: {}", label, String::from_utf8_lossy(n))?,
            Visit::Operator(op) => writeln!(self.out, "Operator: {}", op)?,
            Visit::Stream { length } => writeln!(self.out, "(Stream) Length: {}", length)?,
            Visit::Array { len } => writeln!(self.out, "Array ({}): {} elements", label, len)?,
            Visit::Dictionary { len } => writeln!(self.out, "Dictionary ({}): {} elements", label, len)?,
        }
        Ok(())
    }

    fn skipped(&mut self, label: &Label<'_>, error: &Error, depth: usize) -> Result<()> {
        self.indent(depth)?;
        writeln!(self.out, "! {}: {}", label, error)?;
        Ok(())
    }
}
