//! Content Store
//!
//! The read-only catalog of drug classes and patient cases that every other
//! part of the simulator resolves ids against. The catalog is loaded once at
//! startup, validated eagerly, and never mutated afterwards, so it can be
//! shared freely behind an `Arc`.

use crate::error::{ContentError, LookupError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::info;

const BUILTIN_DRUGS: &str = include_str!("../data/drugs.json");
const BUILTIN_CASES: &str = include_str!("../data/cases.json");

/// A category of medication with its teaching material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugClass {
    pub id: String,
    pub name: String,
    pub benefits: Vec<String>,
    pub risks: Vec<String>,
    pub evidence: Vec<String>,
}

/// A synthetic patient vignette.
///
/// `best_alternative` is always a member of `appropriate`; the loader rejects
/// any case that breaks this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientCase {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub teaching_point: String,
    pub appropriate: BTreeSet<String>,
    pub best_alternative: String,
}

impl PatientCase {
    /// Whether the given drug class id is an acceptable answer for this case.
    pub fn is_appropriate(&self, drug_id: &str) -> bool {
        self.appropriate.contains(drug_id)
    }
}

/// Immutable catalog of drug classes and patient cases.
#[derive(Debug, Clone)]
pub struct ContentStore {
    drugs: Vec<DrugClass>,
    cases: Vec<PatientCase>,
}

impl ContentStore {
    /// Builds a store from already-decoded catalogs, enforcing every schema rule.
    pub fn new(drugs: Vec<DrugClass>, cases: Vec<PatientCase>) -> Result<Self, ContentError> {
        let mut drug_ids = HashSet::new();
        for (position, drug) in drugs.iter().enumerate() {
            if drug.id.trim().is_empty() {
                return Err(ContentError::EmptyDrugId(position));
            }
            if drug.name.trim().is_empty() {
                return Err(ContentError::EmptyDrugName(drug.id.clone()));
            }
            if !drug_ids.insert(drug.id.as_str()) {
                return Err(ContentError::DuplicateDrug(drug.id.clone()));
            }
        }

        if cases.is_empty() {
            return Err(ContentError::NoCases);
        }

        let mut case_ids = HashSet::new();
        for case in &cases {
            if !case_ids.insert(case.id.as_str()) {
                return Err(ContentError::DuplicateCase(case.id.clone()));
            }
            if case.appropriate.is_empty() {
                return Err(ContentError::EmptyAppropriate(case.id.clone()));
            }
            for drug in case
                .appropriate
                .iter()
                .chain(std::iter::once(&case.best_alternative))
            {
                if !drug_ids.contains(drug.as_str()) {
                    return Err(ContentError::DanglingReference {
                        case: case.id.clone(),
                        drug: drug.clone(),
                    });
                }
            }
            if !case.is_appropriate(&case.best_alternative) {
                return Err(ContentError::BestNotAppropriate {
                    case: case.id.clone(),
                    best: case.best_alternative.clone(),
                });
            }
        }

        Ok(Self { drugs, cases })
    }

    /// Decodes both catalogs from JSON text and validates them.
    pub fn from_json(drugs_json: &str, cases_json: &str) -> Result<Self, ContentError> {
        let drugs = serde_json::from_str(drugs_json).map_err(|source| ContentError::Parse {
            catalog: "drug",
            source,
        })?;
        let cases = serde_json::from_str(cases_json).map_err(|source| ContentError::Parse {
            catalog: "case",
            source,
        })?;
        Self::new(drugs, cases)
    }

    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self, ContentError> {
        Self::from_json(BUILTIN_DRUGS, BUILTIN_CASES)
    }

    /// Loads `drugs.json` and `cases.json` from a directory.
    pub fn load_dir(dir: &Path) -> Result<Self, ContentError> {
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path).map_err(|source| ContentError::Io { path, source })
        };
        let store = Self::from_json(&read("drugs.json")?, &read("cases.json")?)?;
        info!(
            path = %dir.display(),
            drugs = store.drugs.len(),
            cases = store.cases.len(),
            "Loaded content catalog"
        );
        Ok(store)
    }

    /// All drug classes in catalog order.
    pub fn drugs(&self) -> &[DrugClass] {
        &self.drugs
    }

    pub fn cases(&self) -> &[PatientCase] {
        &self.cases
    }

    pub fn drug(&self, id: &str) -> Option<&DrugClass> {
        self.drugs.iter().find(|d| d.id == id)
    }

    pub fn case(&self, id: &str) -> Option<&PatientCase> {
        self.cases.iter().find(|c| c.id == id)
    }

    /// Like [`ContentStore::drug`], but an unknown id is a [`LookupError`].
    pub fn require_drug(&self, id: &str) -> Result<&DrugClass, LookupError> {
        self.drug(id)
            .ok_or_else(|| LookupError::UnknownDrug(id.to_string()))
    }

    pub fn require_case(&self, id: &str) -> Result<&PatientCase, LookupError> {
        self.case(id)
            .ok_or_else(|| LookupError::UnknownCase(id.to_string()))
    }

    /// The case presented when the caller does not pick one.
    pub fn default_case(&self) -> &PatientCase {
        // `new` refuses an empty case list.
        &self.cases[0]
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn drug(id: &str, name: &str) -> DrugClass {
        DrugClass {
            id: id.to_string(),
            name: name.to_string(),
            benefits: vec![format!("{name} benefit A"), format!("{name} benefit B")],
            risks: vec![format!("{name} risk A")],
            evidence: vec![format!("{name} trial")],
        }
    }

    pub(crate) fn case(appropriate: &[&str], best: &str) -> PatientCase {
        PatientCase {
            id: "case-1".to_string(),
            title: "Test case".to_string(),
            summary: "A patient with type 2 diabetes.".to_string(),
            teaching_point: "Protect the heart and kidneys.".to_string(),
            appropriate: appropriate.iter().map(|s| s.to_string()).collect(),
            best_alternative: best.to_string(),
        }
    }

    /// Metformin, SGLT2 and sulfonylurea with a case where only SGLT2 fits.
    pub(crate) fn sample_store() -> ContentStore {
        ContentStore::new(
            vec![
                drug("metformin", "Metformin"),
                drug("sglt2", "SGLT2 inhibitors"),
                drug("sulfonylurea", "Sulfonylureas"),
            ],
            vec![case(&["sglt2"], "sglt2")],
        )
        .expect("sample store is valid")
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let store = ContentStore::builtin().expect("builtin catalog should load");
        assert!(store.drug("metformin").is_some());
        assert!(store.drug("sglt2").is_some());
        for case in store.cases() {
            assert!(case.appropriate.contains(&case.best_alternative));
        }
        assert_eq!(store.default_case().id, store.cases()[0].id);
    }

    #[test]
    fn test_rejects_best_alternative_outside_appropriate() {
        let err = ContentStore::new(
            vec![drug("metformin", "Metformin"), drug("sglt2", "SGLT2")],
            vec![case(&["sglt2"], "metformin")],
        )
        .unwrap_err();
        assert!(matches!(err, ContentError::BestNotAppropriate { .. }));
    }

    #[test]
    fn test_rejects_dangling_best_alternative() {
        let err = ContentStore::new(
            vec![drug("sglt2", "SGLT2")],
            vec![case(&["sglt2"], "glp1")],
        )
        .unwrap_err();
        match err {
            ContentError::DanglingReference { drug, .. } => assert_eq!(drug, "glp1"),
            other => panic!("Expected DanglingReference, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_empty_appropriate_and_duplicates() {
        let err = ContentStore::new(vec![drug("sglt2", "SGLT2")], vec![case(&[], "sglt2")])
            .unwrap_err();
        assert!(matches!(err, ContentError::EmptyAppropriate(_)));

        let err = ContentStore::new(
            vec![drug("sglt2", "SGLT2"), drug("sglt2", "Again")],
            vec![case(&["sglt2"], "sglt2")],
        )
        .unwrap_err();
        assert!(matches!(err, ContentError::DuplicateDrug(id) if id == "sglt2"));

        let err = ContentStore::new(vec![drug("sglt2", "SGLT2")], vec![]).unwrap_err();
        assert!(matches!(err, ContentError::NoCases));
    }

    #[test]
    fn test_rejects_blank_drug_name() {
        let err = ContentStore::new(
            vec![drug("metformin", "  "), drug("sglt2", "SGLT2")],
            vec![case(&["sglt2"], "sglt2")],
        )
        .unwrap_err();
        assert!(matches!(err, ContentError::EmptyDrugName(ref id) if id == "metformin"));
        assert_eq!(err.to_string(), "Drug class 'metformin' has an empty name");
    }

    #[test]
    fn test_missing_required_field_fails_fast() {
        let drugs = r#"[{"id": "sglt2", "name": "SGLT2", "benefits": [], "risks": []}]"#;
        let cases = r#"[]"#;
        let err = ContentStore::from_json(drugs, cases).unwrap_err();
        assert!(matches!(err, ContentError::Parse { catalog: "drug", .. }));
    }

    #[test]
    fn test_case_json_uses_camel_case_keys() {
        let drugs = r#"[{"id": "sglt2", "name": "SGLT2", "benefits": [], "risks": [], "evidence": []}]"#;
        let cases = r#"[{
            "id": "c1", "title": "t", "summary": "s",
            "teachingPoint": "tp", "appropriate": ["sglt2"], "bestAlternative": "sglt2"
        }]"#;
        let store = ContentStore::from_json(drugs, cases).unwrap();
        assert_eq!(store.require_case("c1").unwrap().teaching_point, "tp");
        assert_eq!(
            store.require_drug("nope").unwrap_err(),
            LookupError::UnknownDrug("nope".into())
        );
    }
}
