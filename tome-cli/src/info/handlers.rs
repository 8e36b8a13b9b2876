use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::Serialize;

use tome_io::{TomeBackend, TomeStore};

#[derive(Serialize, Debug, PartialEq)]
pub struct RegionSummary {
    pub name: String,
    pub rows: usize,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct TomeSummary {
    pub identifier: String,
    pub num_genes: usize,
    pub num_samples: usize,
    pub regions: Vec<RegionSummary>,
    pub annotations: Vec<String>,
    pub failed_annotations: Vec<String>,
}

impl TomeSummary {
    pub fn from_store<B: TomeBackend>(store: &TomeStore<B>) -> Result<Self> {
        let mut regions = Vec::new();
        for name in store.regions()? {
            let rows = store.region_row_count(&name)?;
            regions.push(RegionSummary { name, rows });
        }

        // a tome without annotations is still readable
        let (annotations, failed_annotations) = match store.sample_annotations() {
            Ok(annotations) => (
                annotations.fields().map(str::to_string).collect(),
                annotations
                    .failed_fields()
                    .map(|(field, _)| field.to_string())
                    .collect(),
            ),
            Err(_) => (Vec::new(), Vec::new()),
        };

        Ok(TomeSummary {
            identifier: store.identifier().to_string(),
            num_genes: store.num_genes()?,
            num_samples: store.num_samples()?,
            regions,
            annotations,
            failed_annotations,
        })
    }
}

pub fn run_info(matches: &ArgMatches) -> Result<()> {
    let path = matches
        .get_one::<String>("tome")
        .expect("A path to a tome file is required.");
    let as_json = matches.get_flag("json");

    let store = TomeStore::open(path).with_context(|| format!("Failed to open {path}"))?;
    let summary = TomeSummary::from_store(&store)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("tome:      {}", summary.identifier);
    println!("genes:     {}", summary.num_genes);
    println!("samples:   {}", summary.num_samples);
    for region in &summary.regions {
        println!("region:    {} ({} readings)", region.name, region.rows);
    }
    if !summary.annotations.is_empty() {
        println!("annotations: {}", summary.annotations.join(", "));
    }
    for field in &summary.failed_annotations {
        eprintln!("Warning: annotation '{field}' could not be decoded");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use tome_io::{AnnotationColumn, MemoryBackend};

    #[rstest]
    fn test_summary() {
        let backend = MemoryBackend::tome(&["g0", "g1"], &["s0", "s1", "s2"])
            .with_region("exon", vec![0, 2, 3], vec![0, 2, 1], vec![1, 1, 1])
            .with_region("intron", vec![0, 0, 1], vec![2], vec![4])
            .with_annotation("age", AnnotationColumn::Integer(vec![1, 2, 3]))
            .with_bytes(
                "sample_meta/anno/donor",
                vec![b"a".to_vec(), vec![0xff], b"c".to_vec()],
            );
        let store = TomeStore::from_backend(backend).with_identifier("demo");

        let summary = TomeSummary::from_store(&store).unwrap();
        assert_eq!(
            summary,
            TomeSummary {
                identifier: "demo".to_string(),
                num_genes: 2,
                num_samples: 3,
                regions: vec![
                    RegionSummary {
                        name: "exon".to_string(),
                        rows: 3
                    },
                    RegionSummary {
                        name: "intron".to_string(),
                        rows: 1
                    },
                ],
                annotations: vec!["age".to_string()],
                failed_annotations: vec!["donor".to_string()],
            }
        );

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["regions"][1]["rows"], 1);
    }

    #[rstest]
    fn test_summary_without_annotations() {
        let backend = MemoryBackend::tome(&["g0"], &["s0"]).with_region(
            "exon",
            vec![0, 1],
            vec![0],
            vec![2],
        );
        let store = TomeStore::from_backend(backend);

        let summary = TomeSummary::from_store(&store).unwrap();
        assert!(summary.annotations.is_empty());
        assert_eq!(summary.regions.len(), 1);
    }
}
