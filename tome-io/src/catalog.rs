use std::collections::BTreeMap;

use crate::backend::TomeBackend;
use crate::consts::{SAMPLE_ANNOTATIONS_GROUP, annotation_path};
use crate::error::{Result, TomeError};

/// One per-sample annotation column, kept in its stored element kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationColumn {
    Text(Vec<String>),
    Integer(Vec<i64>),
    Float(Vec<f64>),
}

impl AnnotationColumn {
    pub fn len(&self) -> usize {
        match self {
            AnnotationColumn::Text(values) => values.len(),
            AnnotationColumn::Integer(values) => values.len(),
            AnnotationColumn::Float(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render the value of one row as text.
    pub fn display_value(&self, row: usize) -> Option<String> {
        match self {
            AnnotationColumn::Text(values) => values.get(row).cloned(),
            AnnotationColumn::Integer(values) => values.get(row).map(|v| v.to_string()),
            AnnotationColumn::Float(values) => values.get(row).map(|v| v.to_string()),
        }
    }
}

///
/// The per-sample annotation table: parallel columns keyed by field name,
/// each holding one value per sample.
///
/// A field whose data could not be decoded does not prevent the other fields
/// from loading; its error is kept and returned when the field is requested.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleAnnotations {
    columns: BTreeMap<String, AnnotationColumn>,
    failed: BTreeMap<String, TomeError>,
    num_samples: usize,
}

impl SampleAnnotations {
    /// Names of the successfully decoded fields, in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Fields that failed to decode, with the reason.
    pub fn failed_fields(&self) -> impl Iterator<Item = (&str, &TomeError)> {
        self.failed.iter().map(|(field, err)| (field.as_str(), err))
    }

    pub fn column(&self, field: &str) -> Result<&AnnotationColumn> {
        if let Some(column) = self.columns.get(field) {
            return Ok(column);
        }
        match self.failed.get(field) {
            Some(err) => Err(err.clone()),
            None => Err(TomeError::Schema(format!(
                "no sample annotation named '{field}'"
            ))),
        }
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Number of decoded columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

pub(crate) fn load_catalog<B: TomeBackend>(backend: &B, path: &str) -> Result<Vec<String>> {
    if !backend.has_dataset(path) {
        return Err(TomeError::Schema(format!("missing catalog '{path}'")));
    }
    backend.read_strings(path)
}

///
/// Load every column under the annotation group.
///
/// Columns must all have `num_samples` values. When the sample catalog could
/// not be read, `num_samples` is `None` and the first decoded column sets the
/// expected length instead.
pub(crate) fn load_annotations<B: TomeBackend>(
    backend: &B,
    num_samples: Option<usize>,
) -> Result<SampleAnnotations> {
    let mut annotations = SampleAnnotations::default();
    let mut expected = num_samples;

    for field in backend.member_names(SAMPLE_ANNOTATIONS_GROUP)? {
        let path = annotation_path(&field);
        match backend.read_column(&path) {
            Ok(column) => {
                let len = *expected.get_or_insert(column.len());
                if column.len() != len {
                    return Err(TomeError::Schema(format!(
                        "annotation '{field}' has {} values for {len} samples",
                        column.len()
                    )));
                }
                annotations.columns.insert(field, column);
            }
            Err(err @ TomeError::Decode { .. }) => {
                annotations.failed.insert(field, err);
            }
            Err(err) => return Err(err),
        }
    }

    annotations.num_samples = expected.unwrap_or_default();
    Ok(annotations)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use crate::backend::MemoryBackend;

    #[fixture]
    fn backend() -> MemoryBackend {
        MemoryBackend::tome(&["g0"], &["s0", "s1", "s2"])
            .with_annotation(
                "tissue",
                AnnotationColumn::Text(vec!["liver".into(), "lung".into(), "liver".into()]),
            )
            .with_annotation("age", AnnotationColumn::Integer(vec![31, 45, 52]))
            .with_annotation("rin", AnnotationColumn::Float(vec![7.5, 8.0, 6.25]))
    }

    #[rstest]
    fn test_load_annotations(backend: MemoryBackend) {
        let annotations = load_annotations(&backend, Some(3)).unwrap();

        assert_eq!(annotations.fields().collect::<Vec<_>>(), vec!["age", "rin", "tissue"]);
        assert_eq!(
            annotations.column("age").unwrap(),
            &AnnotationColumn::Integer(vec![31, 45, 52])
        );
        assert_eq!(
            annotations.column("tissue").unwrap().display_value(1),
            Some("lung".to_string())
        );
        assert!(annotations.column("missing").is_err());
    }

    #[rstest]
    fn test_decode_failure_is_local_to_its_field(backend: MemoryBackend) {
        let backend = backend.with_bytes(
            &annotation_path("donor"),
            vec![b"d1".to_vec(), vec![0xff, 0xfe], b"d3".to_vec()],
        );

        let annotations = load_annotations(&backend, Some(3)).unwrap();

        assert_eq!(annotations.len(), 3);
        assert!(matches!(
            annotations.column("donor"),
            Err(TomeError::Decode { .. })
        ));
        assert_eq!(
            annotations.failed_fields().map(|(f, _)| f).collect::<Vec<_>>(),
            vec!["donor"]
        );
    }

    #[rstest]
    fn test_length_mismatch_is_a_schema_error(backend: MemoryBackend) {
        let backend = backend.with_annotation("batch", AnnotationColumn::Integer(vec![1, 2]));
        assert!(matches!(
            load_annotations(&backend, Some(3)),
            Err(TomeError::Schema(_))
        ));
    }

    #[rstest]
    fn test_columns_set_the_length_without_a_sample_catalog(backend: MemoryBackend) {
        let annotations = load_annotations(&backend, None).unwrap();
        assert_eq!(annotations.num_samples(), 3);
        assert_eq!(annotations.len(), 3);

        let backend = backend.with_annotation("batch", AnnotationColumn::Integer(vec![1, 2]));
        assert!(matches!(
            load_annotations(&backend, None),
            Err(TomeError::Schema(_))
        ));
    }

    #[rstest]
    fn test_missing_catalog() {
        let backend = MemoryBackend::new();
        assert!(matches!(
            load_catalog(&backend, "gene_names"),
            Err(TomeError::Schema(_))
        ));
    }
}
