use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::core::{Edge, RunResult};

/// Writes edges as `from,to,type` lines and failed packages one name per line
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeListFormatter;

impl EdgeListFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_edges<'a, W, I>(&self, out: &mut W, edges: I) -> Result<()>
    where
        W: Write + ?Sized,
        I: IntoIterator<Item = &'a Edge>,
    {
        for edge in edges {
            writeln!(out, "{edge}")?;
        }
        Ok(())
    }

    pub fn write_failure<W>(&self, out: &mut W, package: &str) -> Result<()>
    where
        W: Write + ?Sized,
    {
        writeln!(out, "{package}")?;
        Ok(())
    }

    pub fn format_to_string(&self, result: &RunResult) -> String {
        result.edges.iter().map(|edge| format!("{edge}\n")).collect()
    }

    pub fn format_to_file(&self, result: &RunResult, output_path: &Path) -> Result<()> {
        let file = File::create(output_path)
            .with_context(|| format!("cannot create {}", output_path.display()))?;
        let mut writer = BufWriter::new(file);
        self.write_edges(&mut writer, &result.edges)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_written_one_per_line() {
        let mut out = Vec::new();
        let edges = vec![Edge::new("a", "b", "Foo"), Edge::new("a", "c", "Bar")];
        EdgeListFormatter::new().write_edges(&mut out, &edges).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a,b,Foo\na,c,Bar\n");
    }
}
