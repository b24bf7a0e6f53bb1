//! Specification source: the remote CSV mapping collections to datasets.
//!
//! The list only feeds the relevance filter. A fetch or parse failure is
//! never fatal; the orchestrator falls back to builder-key-only matching.

use dataset_sync_core::SpecificationEntry;
use thiserror::Error;

pub const DEFAULT_SPECIFICATION_URL: &str =
    "https://raw.githubusercontent.com/digital-land/specification/main/specification/dataset.csv";

#[derive(Debug, Error)]
pub enum SpecificationError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("failed reading response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed specification CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("specification CSV has no '{0}' column")]
    MissingColumn(&'static str),
}

/// Anything that can produce the specification list.
pub trait SpecificationSource {
    fn fetch(&self) -> Result<Vec<SpecificationEntry>, SpecificationError>;
}

/// Fetches the CSV over HTTP(S) with a blocking client.
pub struct HttpSpecificationSource {
    url: String,
    agent: ureq::Agent,
}

impl HttpSpecificationSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

impl Default for HttpSpecificationSource {
    fn default() -> Self {
        Self::new(DEFAULT_SPECIFICATION_URL)
    }
}

impl SpecificationSource for HttpSpecificationSource {
    fn fetch(&self) -> Result<Vec<SpecificationEntry>, SpecificationError> {
        let response =
            self.agent
                .get(&self.url)
                .call()
                .map_err(|err| SpecificationError::Request {
                    url: self.url.clone(),
                    message: err.to_string(),
                })?;
        let body = response
            .into_string()
            .map_err(|source| SpecificationError::Body {
                url: self.url.clone(),
                source,
            })?;
        parse_specifications(&body)
    }
}

/// A fixed list, for tests and deployments without network access.
#[derive(Debug, Clone, Default)]
pub struct StaticSpecifications(pub Vec<SpecificationEntry>);

impl SpecificationSource for StaticSpecifications {
    fn fetch(&self) -> Result<Vec<SpecificationEntry>, SpecificationError> {
        Ok(self.0.clone())
    }
}

/// Parse the specification CSV.
///
/// Columns are located by header name. Rows with an empty `collection`, or
/// too short to contain it, are dropped.
pub fn parse_specifications(text: &str) -> Result<Vec<SpecificationEntry>, SpecificationError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false) // header row is read below
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut record = csv::StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Err(SpecificationError::MissingColumn("collection"));
    }
    let column = |name: &'static str| {
        record
            .iter()
            .position(|h| h == name)
            .ok_or(SpecificationError::MissingColumn(name))
    };
    let collection_idx = column("collection")?;
    let dataset_idx = column("dataset")?;

    let mut entries = Vec::new();
    while reader.read_record(&mut record)? {
        let Some(collection) = record.get(collection_idx).filter(|c| !c.is_empty()) else {
            continue;
        };
        let dataset = record.get(dataset_idx).unwrap_or_default();
        entries.push(SpecificationEntry::new(collection, dataset));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_with_a_collection() {
        let csv = "\
dataset,name,collection,typology
conservation-area,Conservation area,conservation-area,geography
organisation,Organisation,,organisation
tree,Tree,tree-preservation-order,geography
";
        let entries = parse_specifications(csv).unwrap();
        assert_eq!(
            entries,
            vec![
                SpecificationEntry::new("conservation-area", "conservation-area"),
                SpecificationEntry::new("tree-preservation-order", "tree"),
            ]
        );
    }

    #[test]
    fn columns_are_found_by_name_in_any_position() {
        let csv = "collection,dataset\nbrownfield-land,brownfield-land\n";
        let entries = parse_specifications(csv).unwrap();
        assert_eq!(
            entries,
            vec![SpecificationEntry::new("brownfield-land", "brownfield-land")]
        );
    }

    #[test]
    fn short_rows_are_skipped() {
        let csv = "dataset,collection\nlonely\nflood-risk-zone,flood-risk-zone\n";
        let entries = parse_specifications(csv).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].dataset, "flood-risk-zone");
    }

    #[test]
    fn missing_column_is_an_error() {
        let err = parse_specifications("dataset,name\ntree,Tree\n").unwrap_err();
        assert!(matches!(err, SpecificationError::MissingColumn("collection")));
    }

    #[test]
    fn empty_document_is_an_error() {
        let err = parse_specifications("").unwrap_err();
        assert!(matches!(err, SpecificationError::MissingColumn("collection")));
    }

    #[test]
    fn static_source_returns_its_entries() {
        let source = StaticSpecifications(vec![SpecificationEntry::new("a", "b")]);
        assert_eq!(source.fetch().unwrap().len(), 1);
    }

    #[test]
    fn unreachable_url_is_a_request_error() {
        let source = HttpSpecificationSource::new("http://127.0.0.1:9/dataset.csv");
        let err = source.fetch().unwrap_err();
        assert!(matches!(err, SpecificationError::Request { .. }), "got: {err}");
    }
}
