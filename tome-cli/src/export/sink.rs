use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use flate2::Compression;
use flate2::write::GzEncoder;

#[cfg(feature = "parquet")]
use std::sync::Arc;

#[cfg(feature = "parquet")]
use arrow::array::{ArrayRef, StringBuilder, UInt32Builder};
#[cfg(feature = "parquet")]
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
#[cfg(feature = "parquet")]
use arrow::record_batch::RecordBatch;
#[cfg(feature = "parquet")]
use parquet::arrow::ArrowWriter;
#[cfg(feature = "parquet")]
use parquet::basic::Compression as ParquetCompression;
#[cfg(feature = "parquet")]
use parquet::file::properties::WriterProperties;

/// Rows buffered before a record batch is written.
#[cfg(feature = "parquet")]
pub const BATCH_ROWS: usize = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Parquet,
    Tsv,
    Mtx,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parquet" => Ok(ExportFormat::Parquet),
            "tsv" => Ok(ExportFormat::Tsv),
            "mtx" => Ok(ExportFormat::Mtx),
            _ => Err(format!("Unknown export format: {s}")),
        }
    }
}

impl ExportFormat {
    /// Guess the format from an output path, falling back to parquet when built with it.
    pub fn from_path(path: &str) -> Self {
        let lower = path.to_lowercase();
        if lower.ends_with(".parquet") {
            ExportFormat::Parquet
        } else if lower.ends_with(".tsv") || lower.ends_with(".tsv.gz") {
            ExportFormat::Tsv
        } else if lower.ends_with(".mtx") {
            ExportFormat::Mtx
        } else if cfg!(feature = "parquet") {
            ExportFormat::Parquet
        } else {
            ExportFormat::Tsv
        }
    }
}

/// Destination for long-form `(num_reads, sample_name, gene_name[, tome])` rows.
pub trait RowSink {
    fn write_row(
        &mut self,
        num_reads: u32,
        sample_name: &str,
        gene_name: &str,
        tome: Option<&str>,
    ) -> Result<()>;

    /// Flush everything and close the output. Returns the number of rows written.
    fn finish(self: Box<Self>) -> Result<usize>;
}

/// Tab-separated rows with a header line.
pub struct TsvSink<W: Write> {
    writer: W,
    rows: usize,
}

impl<W: Write> TsvSink<W> {
    pub fn new(mut writer: W, with_tome: bool) -> Result<Self> {
        match with_tome {
            true => writeln!(writer, "num_reads\tsample_name\tgene_name\ttome")?,
            false => writeln!(writer, "num_reads\tsample_name\tgene_name")?,
        }
        Ok(TsvSink { writer, rows: 0 })
    }
}

impl<W: Write> RowSink for TsvSink<W> {
    fn write_row(
        &mut self,
        num_reads: u32,
        sample_name: &str,
        gene_name: &str,
        tome: Option<&str>,
    ) -> Result<()> {
        match tome {
            Some(tome) => writeln!(
                self.writer,
                "{num_reads}\t{sample_name}\t{gene_name}\t{tome}"
            )?,
            None => writeln!(self.writer, "{num_reads}\t{sample_name}\t{gene_name}")?,
        }
        self.rows += 1;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<usize> {
        self.writer.flush()?;
        Ok(self.rows)
    }
}

/// Rows buffered into arrow record batches and written as a parquet file.
#[cfg(feature = "parquet")]
pub struct ParquetSink {
    writer: ArrowWriter<File>,
    schema: SchemaRef,
    num_reads: UInt32Builder,
    sample_name: StringBuilder,
    gene_name: StringBuilder,
    tome: Option<StringBuilder>,
    buffered: usize,
    rows: usize,
}

#[cfg(feature = "parquet")]
impl ParquetSink {
    pub fn create(path: &Path, with_tome: bool) -> Result<Self> {
        let mut fields = vec![
            Field::new("num_reads", DataType::UInt32, false),
            Field::new("sample_name", DataType::Utf8, false),
            Field::new("gene_name", DataType::Utf8, false),
        ];
        if with_tome {
            fields.push(Field::new("tome", DataType::Utf8, false));
        }
        let schema: SchemaRef = Arc::new(Schema::new(fields));

        let props = WriterProperties::builder()
            .set_compression(ParquetCompression::SNAPPY)
            .build();
        let file = File::create(path)?;
        let writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        Ok(ParquetSink {
            writer,
            schema,
            num_reads: UInt32Builder::with_capacity(BATCH_ROWS),
            sample_name: StringBuilder::new(),
            gene_name: StringBuilder::new(),
            tome: with_tome.then(StringBuilder::new),
            buffered: 0,
            rows: 0,
        })
    }

    fn flush_batch(&mut self) -> Result<()> {
        if self.buffered == 0 {
            return Ok(());
        }

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(self.num_reads.finish()),
            Arc::new(self.sample_name.finish()),
            Arc::new(self.gene_name.finish()),
        ];
        if let Some(tome) = self.tome.as_mut() {
            columns.push(Arc::new(tome.finish()));
        }

        let batch = RecordBatch::try_new(self.schema.clone(), columns)?;
        self.writer.write(&batch)?;
        self.rows += self.buffered;
        self.buffered = 0;
        Ok(())
    }
}

#[cfg(feature = "parquet")]
impl RowSink for ParquetSink {
    fn write_row(
        &mut self,
        num_reads: u32,
        sample_name: &str,
        gene_name: &str,
        tome: Option<&str>,
    ) -> Result<()> {
        self.num_reads.append_value(num_reads);
        self.sample_name.append_value(sample_name);
        self.gene_name.append_value(gene_name);
        if let Some(builder) = self.tome.as_mut() {
            builder.append_value(tome.unwrap_or_default());
        }

        self.buffered += 1;
        if self.buffered >= BATCH_ROWS {
            self.flush_batch()?;
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<usize> {
        self.flush_batch()?;
        let rows = self.rows;
        self.writer.close()?;
        Ok(rows)
    }
}

///
/// Open a row sink for `path`.
///
/// # Arguments
/// - format: parquet or tsv; tsv output is gzipped when the path ends in `.gz`.
/// - path: output file.
/// - with_tome: add a column naming the source tome of every row.
pub fn create_sink(format: ExportFormat, path: &Path, with_tome: bool) -> Result<Box<dyn RowSink>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    match format {
        #[cfg(feature = "parquet")]
        ExportFormat::Parquet => Ok(Box::new(ParquetSink::create(path, with_tome)?)),
        #[cfg(not(feature = "parquet"))]
        ExportFormat::Parquet => anyhow::bail!("This build of tome has no parquet support"),
        ExportFormat::Tsv => {
            let file = File::create(path)?;
            let is_gzipped = path.extension().is_some_and(|ext| ext == "gz");
            match is_gzipped {
                true => Ok(Box::new(TsvSink::new(
                    BufWriter::new(GzEncoder::new(file, Compression::default())),
                    with_tome,
                )?)),
                false => Ok(Box::new(TsvSink::new(BufWriter::new(file), with_tome)?)),
            }
        }
        ExportFormat::Mtx => anyhow::bail!("mtx output is written per tome, not row by row"),
    }
}
