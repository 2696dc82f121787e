use anyhow::{anyhow, Context, Result};
use arrow::array::{ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Datelike;
use parquet::arrow::ArrowWriter;
use parquet::basic::{BrotliLevel, Compression};
use parquet::file::properties::WriterProperties;
use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::debug;

use super::{discard, promote, tmp_path, PanelRow};
use crate::schedule::{Category, Component};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Append-only destination for panel rows. `write_rows` is called once per
/// flush, in chronological order; `finish` is called exactly once.
pub trait PanelSink {
    fn write_rows(&mut self, rows: &[PanelRow]) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

/// Panel column names in output order.
pub fn panel_columns() -> Vec<&'static str> {
    let mut cols = vec!["idrssd", "qdate", "qdir"];
    cols.extend(Category::ALL.iter().map(|c| c.column()));
    cols.extend(Component::ALL.iter().map(|c| c.column()));
    cols.extend(["assetcheck", "asset_diff", "evaluated", "pass_flag"]);
    cols
}

/// Rows kept in memory; used by `assemble` and in tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rows: Vec<PanelRow>,
    pub flushes: usize,
    pub finished: bool,
}

impl PanelSink for MemorySink {
    fn write_rows(&mut self, rows: &[PanelRow]) -> Result<()> {
        self.rows.extend_from_slice(rows);
        self.flushes += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// Plain CSV panel. Missing values are empty fields; the file appears under
/// its final name only once `finish` succeeds.
pub struct CsvSink {
    path: PathBuf,
    tmp: PathBuf,
    writer: Option<csv::Writer<File>>,
}

impl CsvSink {
    pub fn create(path: &Path) -> Result<Self> {
        let tmp = tmp_path(path);
        let writer = csv::Writer::from_path(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        let mut sink = Self {
            path: path.to_path_buf(),
            tmp,
            writer: Some(writer),
        };
        if let Some(writer) = sink.writer.as_mut() {
            writer
                .write_record(panel_columns())
                .with_context(|| format!("writing header to {}", sink.tmp.display()))?;
        }
        Ok(sink)
    }
}

fn fmt_value(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

impl PanelSink for CsvSink {
    fn write_rows(&mut self, rows: &[PanelRow]) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| anyhow!("csv sink already finished"))?;
        for row in rows {
            let mut record = Vec::with_capacity(3 + Category::COUNT + Component::COUNT + 4);
            record.push(row.institution_id.to_string());
            record.push(row.date.to_string());
            record.push(row.date.quarter_dir());
            record.extend(row.categories.iter().map(|v| fmt_value(*v)));
            record.extend(row.components.iter().map(|v| fmt_value(*v)));
            record.push(fmt_value(row.reconciliation.assetcheck));
            record.push(fmt_value(row.reconciliation.diff));
            record.push(row.reconciliation.evaluated.to_string());
            record.push(row.reconciliation.passed.to_string());
            writer
                .write_record(&record)
                .with_context(|| format!("writing {}", self.tmp.display()))?;
        }
        debug!(rows = rows.len(), path = %self.path.display(), "flushed csv rows");
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| anyhow!("csv sink already finished"))?;
        let result = writer
            .flush()
            .with_context(|| format!("flushing {}", self.tmp.display()));
        drop(writer);
        let result = result.and_then(|()| promote(&self.tmp, &self.path));
        if result.is_err() {
            discard(&self.tmp);
        }
        result
    }
}

impl Drop for CsvSink {
    fn drop(&mut self) {
        // never finished: the run failed partway
        if self.writer.take().is_some() {
            discard(&self.tmp);
        }
    }
}

/// Brotli-compressed Parquet panel; each flush becomes one row group.
pub struct ParquetSink {
    path: PathBuf,
    tmp: PathBuf,
    schema: Arc<Schema>,
    writer: Option<ArrowWriter<File>>,
}

pub fn panel_schema() -> Schema {
    let mut fields = vec![
        Field::new("idrssd", DataType::Int64, false),
        Field::new("qdate", DataType::Date32, false),
        Field::new("qdir", DataType::Utf8, false),
    ];
    for name in Category::ALL
        .iter()
        .map(|c| c.column())
        .chain(Component::ALL.iter().map(|c| c.column()))
        .chain(["assetcheck", "asset_diff"])
    {
        fields.push(Field::new(name, DataType::Float64, true));
    }
    fields.push(Field::new("evaluated", DataType::Boolean, false));
    fields.push(Field::new("pass_flag", DataType::Boolean, false));
    Schema::new(fields)
}

impl ParquetSink {
    pub fn create(path: &Path) -> Result<Self> {
        let tmp = tmp_path(path);
        let schema = Arc::new(panel_schema());
        let file = File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::BROTLI(BrotliLevel::try_new(5)?))
            .build();
        let writer = ArrowWriter::try_new(file, schema.clone(), Some(props))
            .context("opening parquet writer")?;
        Ok(Self {
            path: path.to_path_buf(),
            tmp,
            schema,
            writer: Some(writer),
        })
    }

    fn batch(&self, rows: &[PanelRow]) -> Result<RecordBatch> {
        let float = |f: &dyn Fn(&PanelRow) -> Option<f64>| -> ArrayRef {
            Arc::new(rows.iter().map(f).collect::<Float64Array>())
        };

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(
                rows.iter().map(|r| r.institution_id).collect::<Vec<_>>(),
            )),
            Arc::new(Date32Array::from(
                rows.iter()
                    .map(|r| r.date.date().num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
                    .collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter().map(|r| r.date.quarter_dir()).collect::<Vec<_>>(),
            )),
        ];
        for i in 0..Category::COUNT {
            columns.push(float(&|r: &PanelRow| r.categories[i]));
        }
        for i in 0..Component::COUNT {
            columns.push(float(&|r: &PanelRow| r.components[i]));
        }
        columns.push(float(&|r: &PanelRow| r.reconciliation.assetcheck));
        columns.push(float(&|r: &PanelRow| r.reconciliation.diff));
        columns.push(Arc::new(
            rows.iter()
                .map(|r| Some(r.reconciliation.evaluated))
                .collect::<BooleanArray>(),
        ));
        columns.push(Arc::new(
            rows.iter()
                .map(|r| Some(r.reconciliation.passed))
                .collect::<BooleanArray>(),
        ));

        RecordBatch::try_new(self.schema.clone(), columns).context("building panel batch")
    }
}

impl PanelSink for ParquetSink {
    fn write_rows(&mut self, rows: &[PanelRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let batch = self.batch(rows)?;
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| anyhow!("parquet sink already finished"))?;
        writer.write(&batch).context("writing panel batch")?;
        writer.flush().context("closing row group")?;
        debug!(rows = rows.len(), path = %self.path.display(), "flushed parquet row group");
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| anyhow!("parquet sink already finished"))?;
        let result = writer
            .close()
            .context("closing parquet writer")
            .and_then(|_| promote(&self.tmp, &self.path));
        if result.is_err() {
            discard(&self.tmp);
        }
        result
    }
}

impl Drop for ParquetSink {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            discard(&self.tmp);
        }
    }
}
