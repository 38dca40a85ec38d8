//! Label-keyed reference embeddings stored as Parquet.
//!
//! Each row carries the canonical label it embeds, so rows can be matched to
//! the catalog by name instead of by position. Expected columns:
//!
//! - `label`: `Utf8` or `LargeUtf8`, non-null
//! - `embedding`: `FixedSizeList<Float32, D>`, non-null

use std::path::Path;

use arrow::array::{Array, FixedSizeListArray, Float32Array, LargeStringArray, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::info;

use crate::StoreError;

/// Reference embeddings in file order, one `(label, vector)` per row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceEmbeddings {
    rows: Vec<(String, Vec<f32>)>,
}

impl ReferenceEmbeddings {
    /// Wrap in-memory rows. Dimensions are checked later, against the catalog.
    pub fn from_rows(rows: Vec<(String, Vec<f32>)>) -> Self {
        Self { rows }
    }

    /// Load and parse a reference-embedding Parquet file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }

        let batches = read_parquet(path)?;
        let embeddings = Self::from_batches(&batches)?;

        info!(
            rows = embeddings.len(),
            dim = embeddings.dim().unwrap_or(0),
            path = %path.display(),
            "loaded reference embeddings"
        );
        Ok(embeddings)
    }

    /// Extract `(label, embedding)` rows from Arrow batches.
    pub fn from_batches(batches: &[RecordBatch]) -> Result<Self, StoreError> {
        let mut rows = Vec::new();

        for batch in batches {
            let label_col = batch
                .column_by_name("label")
                .ok_or_else(|| StoreError::Schema("missing 'label' column".into()))?;
            let emb_col = batch
                .column_by_name("embedding")
                .ok_or_else(|| StoreError::Schema("missing 'embedding' column".into()))?;

            let fsl = emb_col
                .as_any()
                .downcast_ref::<FixedSizeListArray>()
                .ok_or_else(|| {
                    StoreError::Schema(format!(
                        "embedding column is {}, expected FixedSizeList<Float32>",
                        emb_col.data_type()
                    ))
                })?;

            if fsl.value_type() != DataType::Float32 {
                return Err(StoreError::Schema(format!(
                    "embedding values are {}, expected Float32",
                    fsl.value_type()
                )));
            }

            for row in 0..batch.num_rows() {
                let label = get_string(label_col.as_ref(), row).ok_or_else(|| {
                    StoreError::Schema(format!("null or non-string label at row {row}"))
                })?;
                if fsl.is_null(row) {
                    return Err(StoreError::Schema(format!("null embedding for {label:?}")));
                }

                let item = fsl.value(row);
                let values = item
                    .as_any()
                    .downcast_ref::<Float32Array>()
                    .ok_or_else(|| StoreError::Schema("embedding values are not Float32".into()))?;
                // `values()` reads the raw buffer, which holds a default under each null.
                if values.null_count() > 0 {
                    return Err(StoreError::Schema(format!(
                        "embedding for {label:?} has {} null element(s)",
                        values.null_count()
                    )));
                }
                rows.push((label, values.values().to_vec()));
            }
        }

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Dimension of the first row, if any.
    pub fn dim(&self) -> Option<usize> {
        self.rows.first().map(|(_, v)| v.len())
    }

    pub fn into_rows(self) -> Vec<(String, Vec<f32>)> {
        self.rows
    }
}

/// Read a Parquet file into Arrow RecordBatches.
pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>, StoreError> {
    let file = std::fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches: Result<Vec<RecordBatch>, _> = reader.collect();
    Ok(batches?)
}

fn get_string(col: &dyn Array, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
        .or_else(|| {
            col.as_any()
                .downcast_ref::<LargeStringArray>()
                .map(|arr| arr.value(row).to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{FixedSizeListBuilder, Float32Builder, Int32Array, StringBuilder};
    use arrow::datatypes::{DataType, Field, Schema};
    use parquet::arrow::ArrowWriter;
    use std::sync::Arc;
    use tempfile::TempDir;

    const DIM: i32 = 3;

    fn embedding_field() -> Field {
        Field::new(
            "embedding",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), DIM),
            true,
        )
    }

    fn batch(rows: &[(Option<&str>, Option<[f32; 3]>)]) -> RecordBatch {
        let mut labels = StringBuilder::new();
        let mut embs = FixedSizeListBuilder::new(Float32Builder::new(), DIM);

        for (label, emb) in rows {
            labels.append_option(*label);
            match emb {
                Some(values) => {
                    embs.values().append_slice(values);
                    embs.append(true);
                }
                None => {
                    embs.values().append_slice(&[0.0; 3]);
                    embs.append(false);
                }
            }
        }

        let schema = Schema::new(vec![
            Field::new("label", DataType::Utf8, true),
            embedding_field(),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(labels.finish()), Arc::new(embs.finish())],
        )
        .unwrap()
    }

    fn write_parquet(dir: &TempDir, batches: &[RecordBatch]) -> std::path::PathBuf {
        let path = dir.path().join("response_embeddings.parquet");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batches[0].schema(), None).unwrap();
        for b in batches {
            writer.write(b).unwrap();
        }
        writer.close().unwrap();
        path
    }

    #[test]
    fn parses_rows_in_file_order() {
        let b = batch(&[
            (Some("thanks"), Some([0.0, 0.0, 1.0])),
            (Some("greeting"), Some([1.0, 0.0, 0.0])),
        ]);
        let emb = ReferenceEmbeddings::from_batches(&[b]).unwrap();
        assert_eq!(emb.len(), 2);
        assert_eq!(emb.dim(), Some(3));

        let rows = emb.into_rows();
        assert_eq!(rows[0].0, "thanks");
        assert_eq!(rows[1], ("greeting".to_string(), vec![1.0, 0.0, 0.0]));
    }

    #[test]
    fn parquet_file_roundtrip_across_batches() {
        let dir = TempDir::new().unwrap();
        let path = write_parquet(
            &dir,
            &[
                batch(&[(Some("greeting"), Some([1.0, 0.0, 0.0]))]),
                batch(&[(Some("farewell"), Some([0.0, 1.0, 0.0]))]),
            ],
        );

        let emb = ReferenceEmbeddings::load(&path).unwrap();
        let rows = emb.into_rows();
        let labels: Vec<&str> = rows.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, ["greeting", "farewell"]);
        assert_eq!(rows[1].1, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn sliced_batches_use_correct_offsets() {
        let b = batch(&[
            (Some("a"), Some([1.0, 0.0, 0.0])),
            (Some("b"), Some([0.0, 1.0, 0.0])),
            (Some("c"), Some([0.0, 0.0, 1.0])),
        ]);
        let emb = ReferenceEmbeddings::from_batches(&[b.slice(1, 2)]).unwrap();
        let rows = emb.into_rows();
        assert_eq!(rows[0], ("b".to_string(), vec![0.0, 1.0, 0.0]));
        assert_eq!(rows[1], ("c".to_string(), vec![0.0, 0.0, 1.0]));
    }

    #[test]
    fn empty_input() {
        let emb = ReferenceEmbeddings::from_batches(&[]).unwrap();
        assert!(emb.is_empty());
        assert_eq!(emb.dim(), None);
    }

    #[test]
    fn null_label_rejected() {
        let b = batch(&[(None, Some([1.0, 0.0, 0.0]))]);
        let err = ReferenceEmbeddings::from_batches(&[b]).unwrap_err();
        assert!(err.to_string().contains("row 0"), "{err}");
    }

    #[test]
    fn null_embedding_rejected() {
        let b = batch(&[(Some("greeting"), None)]);
        let err = ReferenceEmbeddings::from_batches(&[b]).unwrap_err();
        assert!(err.to_string().contains("greeting"), "{err}");
    }

    #[test]
    fn null_element_inside_embedding_rejected() {
        let mut labels = StringBuilder::new();
        let mut embs = FixedSizeListBuilder::new(Float32Builder::new(), DIM);
        labels.append_value("greeting");
        embs.values().append_value(1.0);
        embs.values().append_null();
        embs.values().append_value(0.5);
        embs.append(true);

        let schema = Schema::new(vec![
            Field::new("label", DataType::Utf8, true),
            embedding_field(),
        ]);
        let b = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(labels.finish()), Arc::new(embs.finish())],
        )
        .unwrap();

        let err = ReferenceEmbeddings::from_batches(&[b]).unwrap_err();
        assert!(
            matches!(err, StoreError::Schema(ref m) if m.contains("greeting") && m.contains("null")),
            "{err}"
        );
    }

    #[test]
    fn missing_embedding_column() {
        let schema = Schema::new(vec![Field::new("label", DataType::Utf8, false)]);
        let b = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(StringArray::from(vec!["greeting"]))],
        )
        .unwrap();
        let err = ReferenceEmbeddings::from_batches(&[b]).unwrap_err();
        assert!(matches!(err, StoreError::Schema(ref m) if m.contains("'embedding'")));
    }

    #[test]
    fn wrong_embedding_type() {
        let schema = Schema::new(vec![
            Field::new("label", DataType::Utf8, false),
            Field::new("embedding", DataType::Int32, false),
        ]);
        let b = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec!["greeting"])),
                Arc::new(Int32Array::from(vec![1])),
            ],
        )
        .unwrap();
        let err = ReferenceEmbeddings::from_batches(&[b]).unwrap_err();
        assert!(err.to_string().contains("FixedSizeList"), "{err}");
    }

    #[test]
    fn missing_file() {
        let dir = TempDir::new().unwrap();
        let err = ReferenceEmbeddings::load(&dir.path().join("absent.parquet")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
