/// Dataset holding the ordered gene catalog.
pub const GENE_NAMES_PATH: &str = "gene_names";
/// Dataset holding the ordered sample catalog.
pub const SAMPLE_NAMES_PATH: &str = "sample_names";
/// Group holding one dataset per sample annotation field.
pub const SAMPLE_ANNOTATIONS_GROUP: &str = "sample_meta/anno";
/// Group holding one subgroup per region.
pub const DATA_GROUP: &str = "data";

/// Region read when none is given.
pub const DEFAULT_REGION: &str = "exon";

/// Number of genes between two progress updates while iterating.
pub const PROGRESS_INTERVAL: usize = 2000;

pub fn pointer_path(region: &str) -> String {
    format!("{DATA_GROUP}/{region}/p")
}

pub fn counts_path(region: &str) -> String {
    format!("{DATA_GROUP}/{region}/x")
}

pub fn sample_index_path(region: &str) -> String {
    format!("{DATA_GROUP}/{region}/i")
}

pub fn annotation_path(field: &str) -> String {
    format!("{SAMPLE_ANNOTATIONS_GROUP}/{field}")
}
