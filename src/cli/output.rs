//! Record sinks for terminal and machine consumers

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::app::{GameRecord, RecordSink};
use crate::cli::args::OutputFormat;

/// Human-readable listing grouped by developer
///
/// Records are buffered so each developer is printed once, in name order.
pub struct TextSink<W: Write> {
    writer: W,
    groups: BTreeMap<String, Vec<GameRecord>>,
}

impl<W: Write> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            groups: BTreeMap::new(),
        }
    }
}

impl<W: Write> RecordSink for TextSink<W> {
    fn emit(&mut self, record: &GameRecord) -> io::Result<()> {
        self.groups
            .entry(record.developer.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        for (developer, records) in &self.groups {
            writeln!(self.writer, "{} ({})", developer, records.len())?;
            for record in records {
                writeln!(
                    self.writer,
                    "  {:<12} {} [{}]",
                    record.identifier, record.display_name, record.orientation
                )?;
            }
        }
        self.groups.clear();
        self.writer.flush()
    }
}

/// One JSON object per record, newline separated
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn emit(&mut self, record: &GameRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Sink writing `format` to `writer`
pub fn sink_for<'a, W: Write + 'a>(format: OutputFormat, writer: W) -> Box<dyn RecordSink + 'a> {
    match format {
        OutputFormat::Text => Box::new(TextSink::new(writer)),
        OutputFormat::Json => Box::new(JsonLinesSink::new(writer)),
    }
}
