//! SNOMED CT RF2 release loader.
//!
//! Reads the snapshot files of an RF2 release directory (searched recursively) into an
//! [`OntologySnapshot`]:
//!
//! | file                                 | becomes                        |
//! |--------------------------------------|--------------------------------|
//! | `sct2_Concept_Snapshot*`             | concepts                       |
//! | `sct2_Description_Snapshot*`         | descriptions                   |
//! | `sct2_Relationship_Snapshot*`        | active is-a edges              |
//! | `der2_*AssociationSnapshot*`         | historical associations        |
//! | `der2_*MRCMAttributeDomainSnapshot*` | attribute domains              |
//! | `der2_*MRCMAttributeRangeSnapshot*`  | attribute ranges               |
//! | `MRCONSO.RRF` (optional)             | UMLS CUI mappings              |
//!
//! Range constraints are ECL expressions; every concept id mentioned in one becomes a
//! range of the attribute.

use lazy_static::lazy_static;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::config::IS_A_TYPE_ID;
use crate::storage::errors::{StorageError, StorageResult};
use crate::storage::models::*;
use crate::storage::snapshot::OntologySnapshot;

lazy_static! {
    static ref SCTID: Regex = Regex::new(r"\b\d{6,18}\b").expect("valid SCTID pattern");
}

/// UMLS source abbreviation of the US SNOMED CT edition
const UMLS_SNOMED_SOURCE: &str = "SNOMEDCT_US";

#[derive(Debug, Clone)]
pub struct Rf2Loader {
    root: PathBuf,
    cui_file: Option<PathBuf>,
    is_a_type_id: String,
}

#[derive(Debug, Default)]
struct ReleaseFiles {
    concepts: Vec<PathBuf>,
    descriptions: Vec<PathBuf>,
    relationships: Vec<PathBuf>,
    associations: Vec<PathBuf>,
    domains: Vec<PathBuf>,
    ranges: Vec<PathBuf>,
    mrconso: Option<PathBuf>,
}

impl Rf2Loader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cui_file: None,
            is_a_type_id: IS_A_TYPE_ID.to_string(),
        }
    }

    /// Read CUI mappings from this `MRCONSO.RRF` instead of one found in the release
    pub fn with_cui_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cui_file = Some(path.into());
        self
    }

    pub fn with_is_a_type_id(mut self, type_id: impl Into<String>) -> Self {
        self.is_a_type_id = type_id.into();
        self
    }

    /// Parse the release. File reading runs on the blocking pool.
    pub async fn load(self) -> StorageResult<OntologySnapshot> {
        tokio::task::spawn_blocking(move || self.load_blocking())
            .await
            .map_err(|e| StorageError::Other(format!("RF2 loader task failed: {}", e)))?
    }

    fn load_blocking(&self) -> StorageResult<OntologySnapshot> {
        if !self.root.is_dir() {
            return Err(StorageError::NotFound(format!(
                "RF2 release directory {} does not exist",
                self.root.display()
            )));
        }

        let mut files = ReleaseFiles::default();
        collect_files(&self.root, &mut files)?;

        if files.concepts.is_empty() || files.descriptions.is_empty() || files.relationships.is_empty()
        {
            return Err(StorageError::NotFound(format!(
                "{} lacks concept, description or relationship snapshot files",
                self.root.display()
            )));
        }

        let mut snapshot = OntologySnapshot::default();

        for path in &files.concepts {
            read_rows(path, 5, |row| {
                snapshot.concepts.push(ConceptRecord {
                    code: row[0].to_string(),
                    active: parse_active(row[2])?,
                });
                Ok(())
            })?;
        }

        for path in &files.descriptions {
            read_rows(path, 9, |row| {
                snapshot.descriptions.push(DescriptionRecord {
                    id: row[0].to_string(),
                    concept_code: row[4].to_string(),
                    term: row[7].to_string(),
                    active: parse_active(row[2])?,
                    type_id: row[6].to_string(),
                });
                Ok(())
            })?;
        }

        for path in &files.relationships {
            read_rows(path, 10, |row| {
                if parse_active(row[2])? && row[7] == self.is_a_type_id {
                    snapshot.is_a.push(IsAEdge {
                        source: row[4].to_string(),
                        destination: row[5].to_string(),
                    });
                }
                Ok(())
            })?;
        }

        for path in &files.associations {
            read_rows(path, 7, |row| {
                snapshot.associations.push(AssociationRecord {
                    source: row[5].to_string(),
                    target: row[6].to_string(),
                    active: parse_active(row[2])?,
                    effective_time: row[1].to_string(),
                });
                Ok(())
            })?;
        }

        for path in &files.domains {
            read_rows(path, 7, |row| {
                if parse_active(row[2])? {
                    snapshot.attribute_domains.push(AttributeDomainRule {
                        attribute: row[5].to_string(),
                        domain: row[6].to_string(),
                    });
                }
                Ok(())
            })?;
        }

        for path in &files.ranges {
            read_rows(path, 7, |row| {
                if parse_active(row[2])? {
                    for range in SCTID.find_iter(row[6]) {
                        snapshot.attribute_ranges.push(AttributeRangeRule {
                            attribute: row[5].to_string(),
                            range: range.as_str().to_string(),
                        });
                    }
                }
                Ok(())
            })?;
        }

        if let Some(path) = self.cui_file.as_ref().or(files.mrconso.as_ref()) {
            snapshot.cui_mappings = read_mrconso(path)?;
        }

        snapshot.is_a.sort();
        snapshot.is_a.dedup();

        let summary = snapshot.summary();
        tracing::info!(
            concepts = summary.concepts,
            descriptions = summary.descriptions,
            is_a_edges = summary.is_a_edges,
            associations = summary.associations,
            attribute_rules = summary.attribute_rules,
            cui_mappings = summary.cui_mappings,
            "Loaded RF2 release from {}",
            self.root.display()
        );

        Ok(snapshot)
    }
}

fn collect_files(dir: &Path, files: &mut ReleaseFiles) -> StorageResult<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_files(&path, files)?;
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if name.starts_with("sct2_Concept_Snapshot") {
            files.concepts.push(path);
        } else if name.starts_with("sct2_Description_Snapshot") {
            files.descriptions.push(path);
        } else if name.starts_with("sct2_Relationship_Snapshot") {
            files.relationships.push(path);
        } else if name.starts_with("der2_") && name.contains("AssociationSnapshot") {
            files.associations.push(path);
        } else if name.starts_with("der2_") && name.contains("MRCMAttributeDomainSnapshot") {
            files.domains.push(path);
        } else if name.starts_with("der2_") && name.contains("MRCMAttributeRangeSnapshot") {
            files.ranges.push(path);
        } else if name.eq_ignore_ascii_case("MRCONSO.RRF") {
            files.mrconso = Some(path);
        }
    }

    Ok(())
}

fn import_error(path: &Path, line: usize, message: impl Into<String>) -> StorageError {
    StorageError::Import {
        file: path.display().to_string(),
        line,
        message: message.into(),
    }
}

fn parse_active(value: &str) -> Result<bool, String> {
    match value {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(format!("active flag must be 0 or 1, got {:?}", other)),
    }
}

/// Feed every data row (header skipped) of a tab-separated file to `handle`.
fn read_rows<F>(path: &Path, columns: usize, mut handle: F) -> StorageResult<()>
where
    F: FnMut(&[&str]) -> Result<(), String>,
{
    let reader = BufReader::new(File::open(path)?);
    let mut rows = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        if number == 1 || line.is_empty() {
            continue;
        }

        let row: Vec<&str> = line.trim_end_matches('\r').split('\t').collect();
        if row.len() < columns {
            return Err(import_error(
                path,
                number,
                format!("expected {} columns, found {}", columns, row.len()),
            ));
        }

        handle(&row).map_err(|message| import_error(path, number, message))?;
        rows += 1;
    }

    tracing::debug!(rows, "Read {}", path.display());
    Ok(())
}

/// CUI to SNOMED CT code pairs from a pipe-separated `MRCONSO.RRF`
fn read_mrconso(path: &Path) -> StorageResult<Vec<CuiMapping>> {
    let reader = BufReader::new(File::open(path)?);
    let mut mappings = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() < 12 {
            return Err(import_error(
                path,
                index + 1,
                format!("expected at least 12 fields, found {}", fields.len()),
            ));
        }

        if fields[11] == UMLS_SNOMED_SOURCE && !fields[9].is_empty() {
            mappings.push(CuiMapping {
                cui: fields[0].to_string(),
                code: fields[9].to_string(),
            });
        }
    }

    mappings.sort_by(|a, b| (&a.cui, &a.code).cmp(&(&b.cui, &b.code)));
    mappings.dedup();
    Ok(mappings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CONCEPTS: &str = "id\teffectiveTime\tactive\tmoduleId\tdefinitionStatusId
138875005\t20020131\t1\t900000000000207008\t900000000000074008
404684003\t20020131\t1\t900000000000207008\t900000000000074008
709044004\t20170731\t1\t900000000000207008\t900000000000074008
236425005\t20170731\t0\t900000000000207008\t900000000000074008
";

    const DESCRIPTIONS: &str = "id\teffectiveTime\tactive\tmoduleId\tconceptId\tlanguageCode\ttypeId\tterm\tcaseSignificanceId
1\t20020131\t1\t900000000000207008\t404684003\ten\t900000000000003001\tClinical finding (finding)\t900000000000448009
2\t20170731\t1\t900000000000207008\t709044004\ten\t900000000000003001\tChronic kidney disease (disorder)\t900000000000448009
3\t20170731\t1\t900000000000207008\t709044004\ten\t900000000000013009\tCKD - chronic kidney disease\t900000000000448009
4\t20170731\t0\t900000000000207008\t236425005\ten\t900000000000013009\tChronic renal failure\t900000000000448009
";

    const RELATIONSHIPS: &str = "id\teffectiveTime\tactive\tmoduleId\tsourceId\tdestinationId\trelationshipGroup\ttypeId\tcharacteristicTypeId\tmodifierId
10\t20020131\t1\t900000000000207008\t404684003\t138875005\t0\t116680003\t900000000000011006\t900000000000451002
11\t20170731\t1\t900000000000207008\t709044004\t404684003\t0\t116680003\t900000000000011006\t900000000000451002
12\t20170731\t0\t900000000000207008\t236425005\t404684003\t0\t116680003\t900000000000011006\t900000000000451002
13\t20170731\t1\t900000000000207008\t709044004\t64033007\t1\t363698007\t900000000000011006\t900000000000451002
";

    const ASSOCIATIONS: &str = "id\teffectiveTime\tactive\tmoduleId\trefsetId\treferencedComponentId\ttargetComponentId
a1\t20170731\t1\t900000000000207008\t900000000000526001\t236425005\t709044004
";

    const RANGES: &str = "id\teffectiveTime\tactive\tmoduleId\trefsetId\treferencedComponentId\trangeConstraint\tattributeRule\truleStrengthId\tcontentTypeId
r1\t20170731\t1\t900000000000207008\t723562003\t363698007\t<< 442083009 |Anatomical or acquired body structure (body structure)|\t\t723597001\t723596005
";

    fn write_release(dir: &Path) {
        let terminology = dir.join("Snapshot").join("Terminology");
        let refset = dir.join("Snapshot").join("Refset");
        fs::create_dir_all(&terminology).unwrap();
        fs::create_dir_all(&refset).unwrap();
        fs::write(terminology.join("sct2_Concept_Snapshot_INT_20240101.txt"), CONCEPTS).unwrap();
        fs::write(
            terminology.join("sct2_Description_Snapshot-en_INT_20240101.txt"),
            DESCRIPTIONS,
        )
        .unwrap();
        fs::write(
            terminology.join("sct2_Relationship_Snapshot_INT_20240101.txt"),
            RELATIONSHIPS,
        )
        .unwrap();
        fs::write(
            refset.join("der2_cRefset_AssociationSnapshot_INT_20240101.txt"),
            ASSOCIATIONS,
        )
        .unwrap();
        fs::write(
            refset.join("der2_ssccRefset_MRCMAttributeRangeSnapshot_INT_20240101.txt"),
            RANGES,
        )
        .unwrap();
        fs::write(
            dir.join("MRCONSO.RRF"),
            "C1561643|ENG|P|L1|PF|S1|Y|A1||709044004||SNOMEDCT_US|PT|709044004|Chronic kidney disease|9|N||\n\
             C1561643|ENG|P|L1|PF|S1|Y|A2||N18||ICD10CM|PT|N18|Chronic kidney disease|0|N||\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_load_release() {
        let dir = tempfile::tempdir().unwrap();
        write_release(dir.path());

        let snapshot = Rf2Loader::new(dir.path()).load().await.unwrap();

        assert_eq!(snapshot.concepts.len(), 4);
        assert!(!snapshot.concepts.iter().find(|c| c.code == "236425005").unwrap().active);
        assert_eq!(snapshot.descriptions.len(), 4);
        // inactive and non-is-a relationships are dropped
        assert_eq!(snapshot.is_a.len(), 2);
        assert_eq!(snapshot.associations[0].target, "709044004");
        assert_eq!(snapshot.attribute_ranges.len(), 1);
        assert_eq!(snapshot.attribute_ranges[0].range, "442083009");
        assert_eq!(
            snapshot.cui_mappings,
            vec![CuiMapping {
                cui: "C1561643".to_string(),
                code: "709044004".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_malformed_row_reports_file_and_line() {
        let dir = tempfile::tempdir().unwrap();
        write_release(dir.path());
        fs::write(
            dir.path()
                .join("Snapshot")
                .join("Terminology")
                .join("sct2_Concept_Snapshot_INT_20240101.txt"),
            "id\teffectiveTime\tactive\tmoduleId\tdefinitionStatusId\n138875005\t20020131\tyes\t9\t9\n",
        )
        .unwrap();

        match Rf2Loader::new(dir.path()).load().await {
            Err(StorageError::Import { file, line, .. }) => {
                assert!(file.ends_with("sct2_Concept_Snapshot_INT_20240101.txt"));
                assert_eq!(line, 2);
            }
            other => panic!("expected import error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_core_files() {
        let dir = tempfile::tempdir().unwrap();
        let result = Rf2Loader::new(dir.path()).load().await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}
