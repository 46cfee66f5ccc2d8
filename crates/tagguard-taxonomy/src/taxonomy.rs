//! Taxonomy entity and structured source loading

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tagguard_core::{Error, Result};
use tracing::info;

/// Vertical name → category name → ordered tag names
pub type Groupings = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Taxonomy document as stored on disk (JSON or YAML)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomySource {
    /// Taxonomy release identifier
    pub version: String,

    /// Declared number of tags, checked against the flat list
    pub total_tag_count: usize,

    /// Flat list of every allowed tag
    #[serde(alias = "flatTagList")]
    pub tags: Vec<String>,

    #[serde(default, alias = "verticals")]
    pub groupings: Groupings,

    /// Synonym → canonical tag
    #[serde(default, alias = "synonymMappings")]
    pub synonyms: BTreeMap<String, String>,
}

/// Normalize a tag to canonical form: trimmed, lowercase, words joined by `-`
pub fn normalize_tag(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for ch in raw.trim().chars() {
        if ch.is_whitespace() || ch == '_' || ch == '-' {
            pending_separator = !normalized.is_empty();
            continue;
        }
        if pending_separator {
            normalized.push('-');
            pending_separator = false;
        }
        normalized.extend(ch.to_lowercase());
    }

    normalized
}

/// A loaded, validated, immutable taxonomy
#[derive(Debug, Clone)]
pub struct Taxonomy {
    version: String,
    total_tag_count: usize,
    ordered_tags: Vec<String>,
    tags: HashSet<String>,
    groupings: Groupings,
    synonyms: HashMap<String, String>,
    locations: HashMap<String, (String, String)>,
}

impl Taxonomy {
    /// Build a taxonomy from a parsed source, enforcing structural invariants
    pub fn from_source(source: TaxonomySource) -> Result<Self> {
        if source.version.trim().is_empty() {
            return Err(Error::taxonomy("version must not be empty"));
        }
        if source.tags.is_empty() {
            return Err(Error::taxonomy("tag list must not be empty"));
        }

        let mut tags = HashSet::with_capacity(source.tags.len());
        for tag in &source.tags {
            if tag.is_empty() || normalize_tag(tag) != *tag {
                return Err(Error::taxonomy(format!(
                    "tag '{}' is not in normalized form '{}'",
                    tag,
                    normalize_tag(tag)
                )));
            }
            if !tags.insert(tag.clone()) {
                return Err(Error::taxonomy(format!("duplicate tag '{}'", tag)));
            }
        }

        if source.total_tag_count != tags.len() {
            return Err(Error::taxonomy(format!(
                "totalTagCount is {} but {} tags are listed",
                source.total_tag_count,
                tags.len()
            )));
        }

        let mut locations = HashMap::new();
        for (vertical, categories) in &source.groupings {
            for (category, members) in categories {
                for tag in members {
                    if !tags.contains(tag) {
                        return Err(Error::taxonomy(format!(
                            "grouping {}/{} references unknown tag '{}'",
                            vertical, category, tag
                        )));
                    }
                    if let Some((v, c)) =
                        locations.insert(tag.clone(), (vertical.clone(), category.clone()))
                    {
                        return Err(Error::taxonomy(format!(
                            "tag '{}' is grouped under both {}/{} and {}/{}",
                            tag, v, c, vertical, category
                        )));
                    }
                }
            }
        }

        let mut synonyms = HashMap::with_capacity(source.synonyms.len());
        for (synonym, target) in source.synonyms {
            if !tags.contains(&target) {
                return Err(Error::taxonomy(format!(
                    "synonym '{}' maps to unknown tag '{}'",
                    synonym, target
                )));
            }
            if tags.contains(&synonym) {
                return Err(Error::taxonomy(format!(
                    "synonym '{}' shadows a taxonomy tag",
                    synonym
                )));
            }
            synonyms.insert(synonym, target);
        }

        Ok(Self {
            version: source.version,
            total_tag_count: source.total_tag_count,
            ordered_tags: source.tags,
            tags,
            groupings: source.groupings,
            synonyms,
            locations,
        })
    }

    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let source: TaxonomySource = serde_json::from_str(json)
            .map_err(|e| Error::taxonomy(format!("invalid taxonomy document: {}", e)))?;
        Self::from_source(source)
    }

    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let source: TaxonomySource = serde_yaml::from_str(yaml)
            .map_err(|e| Error::taxonomy(format!("invalid taxonomy document: {}", e)))?;
        Self::from_source(source)
    }

    /// Load from file; `.yaml`/`.yml` is parsed as YAML, anything else as JSON
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::taxonomy(format!("failed to read taxonomy {}: {}", path.display(), e))
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        let taxonomy = if is_yaml {
            Self::from_yaml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };

        info!(
            path = %path.display(),
            version = %taxonomy.version,
            tags = taxonomy.len(),
            verticals = taxonomy.groupings.len(),
            synonyms = taxonomy.synonyms.len(),
            "Loaded taxonomy"
        );

        Ok(taxonomy)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn total_tag_count(&self) -> usize {
        self.total_tag_count
    }

    /// Number of tags in the flat set
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Exact, case-sensitive membership
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// All tags in source order
    pub fn tags(&self) -> &[String] {
        &self.ordered_tags
    }

    pub fn groupings(&self) -> &Groupings {
        &self.groupings
    }

    /// Vertical names, sorted
    pub fn verticals(&self) -> Vec<&str> {
        self.groupings.keys().map(String::as_str).collect()
    }

    /// Category names within a vertical, sorted
    pub fn categories(&self, vertical: &str) -> Vec<&str> {
        self.groupings
            .get(vertical)
            .map(|categories| categories.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Tags of one category, in source order
    pub fn tags_in_category(&self, vertical: &str, category: &str) -> Option<&[String]> {
        self.groupings
            .get(vertical)?
            .get(category)
            .map(Vec::as_slice)
    }

    /// `(vertical, category)` a tag is grouped under, if any
    pub fn location_of(&self, tag: &str) -> Option<(&str, &str)> {
        self.locations
            .get(tag)
            .map(|(vertical, category)| (vertical.as_str(), category.as_str()))
    }

    pub fn vertical_of(&self, tag: &str) -> Option<&str> {
        self.location_of(tag).map(|(vertical, _)| vertical)
    }

    /// Resolve a tag or synonym to its canonical taxonomy tag.
    ///
    /// Tries, in order: exact tag, exact synonym, normalized tag, normalized
    /// synonym. Fails with [`Error::UnknownTag`] if nothing matches.
    pub fn canonicalize<'a>(&'a self, input: &str) -> Result<&'a str> {
        if let Some(tag) = self.tags.get(input) {
            return Ok(tag.as_str());
        }
        if let Some(target) = self.synonyms.get(input) {
            return Ok(target.as_str());
        }

        let normalized = normalize_tag(input);
        if let Some(tag) = self.tags.get(normalized.as_str()) {
            return Ok(tag.as_str());
        }
        if let Some(target) = self.synonyms.get(normalized.as_str()) {
            return Ok(target.as_str());
        }

        Err(Error::unknown_tag(input))
    }
}
