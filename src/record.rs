use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::Coordinate;
use crate::error::CiteError;

pub const RELATION_REFERENCES: &str = "References";

/// A registry citation document.
///
/// Only the fields this crate rewrites are typed; everything else the registry
/// sends is carried through `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationRecord {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub titles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub creators: Vec<Creator>,
    /// `None` when the document has no `relatedIdentifiers` key at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_identifiers: Option<Vec<RelatedIdentifier>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CitationRecord {
    pub fn from_json(source_name: &str, content: &str) -> Result<Self, CiteError> {
        serde_json::from_str(content).map_err(|err| CiteError::RecordParse {
            source_name: source_name.to_string(),
            message: err.to_string(),
        })
    }

    pub fn title(&self) -> Result<&str, CiteError> {
        self.titles
            .first()
            .map(String::as_str)
            .ok_or_else(|| CiteError::MalformedRecord("record has no titles".to_string()))
    }

    /// The DRS key stored in `subjects[0].subject`.
    pub fn drs(&self) -> Result<&str, CiteError> {
        self.subjects
            .first()
            .map(|subject| subject.subject.as_str())
            .ok_or_else(|| CiteError::MalformedRecord("record has no subjects".to_string()))
    }

    pub fn coordinate(&self) -> Result<Coordinate, CiteError> {
        self.drs()?.parse()
    }

    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.related_identifiers
            .iter()
            .flatten()
            .filter(|entry| entry.relation_type == RELATION_REFERENCES)
            .map(|entry| entry.related_identifier.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub subject: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedIdentifier {
    pub related_identifier: String,
    pub related_identifier_type: String,
    pub relation_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RelatedIdentifier {
    pub fn reference(identifier: &str, identifier_type: RelatedIdentifierType) -> Self {
        Self {
            related_identifier: identifier.to_string(),
            related_identifier_type: identifier_type.as_str().to_string(),
            relation_type: RELATION_REFERENCES.to_string(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelatedIdentifierType {
    Doi,
}

impl RelatedIdentifierType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelatedIdentifierType::Doi => "DOI",
        }
    }
}

/// One entry of a record's creator list.
///
/// Only `creatorName` is typed. Name parts, email and affiliation stay in the
/// raw map exactly as the document had them, so an institutional creator with
/// just a `creatorName` or a list-valued `affiliation` passes through as is.
/// Creators built here get `creatorName` `"Family, Given"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    creator_name: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Creator {
    pub fn new(
        given_name: &str,
        family_name: &str,
        email: Option<&str>,
        affiliation: Option<&str>,
    ) -> Self {
        let mut fields = Map::new();
        fields.insert("givenName".to_string(), Value::from(given_name));
        fields.insert("familyName".to_string(), Value::from(family_name));
        if let Some(email) = email {
            fields.insert("email".to_string(), Value::from(email));
        }
        if let Some(affiliation) = affiliation {
            fields.insert("affiliation".to_string(), Value::from(affiliation));
        }
        Self {
            creator_name: display_name(given_name, family_name),
            fields,
        }
    }

    /// Splits `"Given Names Family"` at the last space.
    pub fn from_full_name(
        full_name: &str,
        email: Option<&str>,
        affiliation: Option<&str>,
    ) -> Result<Self, CiteError> {
        let (given, family) = full_name
            .trim()
            .rsplit_once(' ')
            .ok_or_else(|| CiteError::InvalidCreator(full_name.to_string()))?;
        let (given, family) = (given.trim(), family.trim());
        if given.is_empty() || family.is_empty() {
            return Err(CiteError::InvalidCreator(full_name.to_string()));
        }
        Ok(Self::new(given, family, email, affiliation))
    }

    pub fn creator_name(&self) -> &str {
        &self.creator_name
    }

    pub fn given_name(&self) -> Option<&str> {
        self.text("givenName")
    }

    pub fn family_name(&self) -> Option<&str> {
        self.text("familyName")
    }

    pub fn email(&self) -> Option<&str> {
        self.text("email")
    }

    /// A string or a list, depending on the document.
    pub fn affiliation(&self) -> Option<&Value> {
        self.fields.get("affiliation").filter(|value| !value.is_null())
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

fn display_name(given_name: &str, family_name: &str) -> String {
    format!("{family_name}, {given_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_survive_round_trip() {
        let raw = r#"{
            "titles": ["MIROC6 model output prepared for CMIP6 CMIP"],
            "subjects": [{"subject": "CMIP6.CMIP.MIROC.MIROC6", "subjectScheme": "DRS"}],
            "creators": [],
            "relatedIdentifiers": [],
            "publisher": "Earth System Grid Federation",
            "publicationYear": "2019"
        }"#;
        let record = CitationRecord::from_json("inline", raw).unwrap();
        assert_eq!(record.extra["publisher"], "Earth System Grid Federation");
        assert_eq!(record.subjects[0].extra["subjectScheme"], "DRS");

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["publicationYear"], "2019");
        assert!(value.get("identifier").is_none());
    }

    #[test]
    fn institutional_creator_keeps_only_its_keys() {
        let raw = r#"{"creatorName": "MIROC Team", "nameIdentifier": "x"}"#;
        let creator: Creator = serde_json::from_str(raw).unwrap();
        assert_eq!(creator.given_name(), None);
        assert_eq!(creator.family_name(), None);
        assert_eq!(
            serde_json::to_value(&creator).unwrap(),
            serde_json::from_str::<Value>(raw).unwrap()
        );
    }

    #[test]
    fn affiliation_list_is_accepted() {
        let raw = r#"{"creatorName": "Ogura, Tomoo", "affiliation": ["NIES", "JAMSTEC"]}"#;
        let creator: Creator = serde_json::from_str(raw).unwrap();
        assert_eq!(creator.affiliation().unwrap()[1], "JAMSTEC");
    }

    #[test]
    fn full_name_splits_at_last_space() {
        let creator = Creator::from_full_name("Maria Rugenstein", Some("m@x.org"), None).unwrap();
        assert_eq!(creator.given_name(), Some("Maria"));
        assert_eq!(creator.family_name(), Some("Rugenstein"));

        let creator = Creator::from_full_name("Jean Baptiste Durand", None, None).unwrap();
        assert_eq!(creator.given_name(), Some("Jean Baptiste"));
        assert_eq!(creator.creator_name(), "Durand, Jean Baptiste");
    }

    #[test]
    fn single_word_name_is_rejected() {
        assert!(Creator::from_full_name("Anonymous", None, None).is_err());
    }
}
