// Handler for the normalize operation: read -> assemble -> write every sink.
use std::fs::File;
use std::io::BufWriter;

use tracing::info;

use super::helpers::ensure_output_dir;
use super::SourceSummary;
use crate::config::{EngineSettings, SourceSettings};
use crate::data::{assemble, read_sheet, AssembleOptions};
use crate::error::EngineError;
use crate::sinks::{drain_into, BatchSink, CsvSink, JsonBatchWriter, JsonLinesSink, RecordSink};

pub fn handle_normalize_source(
    settings: &EngineSettings,
    source: &SourceSettings,
) -> Result<SourceSummary, EngineError> {
    let spec = settings.column_spec(source)?;
    let input = settings.input_path(source);

    let sheet = read_sheet(&input, &settings.read_options(source))?;
    let assembly = assemble(
        &sheet,
        &spec,
        &AssembleOptions {
            detect: settings.detect_options(),
        },
    )?;

    ensure_output_dir(&settings.output_dir)?;
    let columns = spec.field_names();

    let mut sinks: Vec<(std::path::PathBuf, Box<dyn RecordSink>)> = Vec::new();
    let csv_path = settings.output_path(source.kind, "csv");
    sinks.push((
        csv_path.clone(),
        Box::new(CsvSink::create(&csv_path, columns.as_slice(), settings.write_bom)?),
    ));
    if settings.emit_jsonl {
        let path = settings.output_path(source.kind, "jsonl");
        sinks.push((path.clone(), Box::new(JsonLinesSink::create(&path)?)));
    }
    if settings.emit_batches {
        let path = settings
            .output_dir
            .join(format!("{}_lotes.json", source.kind.slug()));
        let writer = JsonBatchWriter::new(BufWriter::new(File::create(&path)?));
        sinks.push((
            path.clone(),
            Box::new(BatchSink::new(source.kind.slug(), writer, settings.batch_size)),
        ));
    }

    let mut outputs = Vec::with_capacity(sinks.len());
    for (path, mut sink) in sinks {
        let delivered = drain_into(sink.as_mut(), &assembly.records)?;
        info!(kind = %source.kind, sink = sink.name(), delivered, "output written");
        outputs.push((path, delivered));
    }

    Ok(SourceSummary {
        kind: source.kind,
        input,
        outputs,
        report: assembly.report,
    })
}
