use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Number of neighbours requested when the caller does not pick one
pub const DEFAULT_TOP_K: usize = 10;

/// Metric defines the similarity function a collection is configured with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Euclidean,
    #[default]
    Cosine,
    #[serde(rename = "dotproduct")]
    DotProduct,
}

/// CollectionSpec is everything needed to create a collection except its name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionSpec {
    pub dimension: u32,
    #[serde(default)]
    pub metric: Metric,
    /// Provider-specific options (pods, replicas, pod_type, ...) sent verbatim
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl CollectionSpec {
    pub fn new(dimension: u32, metric: Metric) -> Self {
        Self {
            dimension,
            metric,
            options: Map::new(),
        }
    }

    /// Attach an extra creation option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// CreateCollectionRequest is the body of `POST /databases`
#[derive(Debug, Serialize)]
pub struct CreateCollectionRequest<'a> {
    pub name: &'a str,
    #[serde(flatten)]
    pub spec: &'a CollectionSpec,
}

/// CollectionStatus is the provisioning state reported by the control plane
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CollectionStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// CollectionDescriptor is the response of `GET /databases/{name}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<Metric>,
    #[serde(default)]
    pub status: CollectionStatus,
    /// Remaining fields, kept as returned by the server
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CollectionDescriptor {
    /// Data-plane base URL, `https://{host}:{port}/`, when the server reported one
    pub fn data_plane_url(&self) -> Option<String> {
        match (&self.status.host, self.status.port) {
            (Some(host), Some(port)) if !host.is_empty() => {
                Some(format!("https://{}:{}/", host, port))
            }
            _ => None,
        }
    }
}

/// CollectionEntry is one item of `GET /databases`; older deployments list bare names
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CollectionEntry {
    Name(String),
    Descriptor(CollectionDescriptor),
}

impl CollectionEntry {
    pub fn name(&self) -> Option<&str> {
        match self {
            CollectionEntry::Name(name) => Some(name),
            CollectionEntry::Descriptor(desc) => desc.name.as_deref(),
        }
    }
}

/// Point is a single vector entry with optional metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl Point {
    pub fn new(id: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            values,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// UpsertRequest is the body of `POST /vectors/upsert`
#[derive(Debug, Serialize)]
pub struct UpsertRequest<'a> {
    pub namespace: &'a str,
    pub vectors: &'a [Point],
}

/// UpsertResponse reports how many points the data plane accepted
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpsertResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upserted_count: Option<u64>,
}

/// QueryVector is one entry of the `queries` array of a query body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryVector {
    pub values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

/// QueryRequest is the body of `POST /query`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub namespace: String,
    pub top_k: usize,
    pub include_values: bool,
    pub include_metadata: bool,
    pub queries: Vec<QueryVector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

impl QueryRequest {
    /// Nearest-neighbour search for a single vector, returning metadata but not values
    pub fn nearest(namespace: impl Into<String>, vector: Vec<f32>, top_k: usize) -> Self {
        Self {
            namespace: namespace.into(),
            top_k,
            include_values: false,
            include_metadata: true,
            queries: vec![QueryVector {
                values: vector,
                top_k: None,
                namespace: None,
                filter: None,
            }],
            filter: None,
        }
    }

    /// Attach a metadata filter at the top level and on every query entry.
    /// Servers differ on which placement they honour, so both are sent.
    pub fn with_filter(mut self, filter: Value) -> Self {
        for query in &mut self.queries {
            query.filter = Some(filter.clone());
        }
        self.filter = Some(filter);
        self
    }
}

/// ScoredMatch is a single search hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<f32>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

/// QueryResult holds the hits for one entry of `queries`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    #[serde(default)]
    pub matches: Vec<ScoredMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// QueryResponse is the response of `POST /query`.
/// Batched deployments answer with `results`, single-query ones with `matches`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<QueryResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<ScoredMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl QueryResponse {
    /// All hits in server order, whichever shape the server used
    pub fn hits(&self) -> impl Iterator<Item = &ScoredMatch> {
        self.matches
            .iter()
            .chain(self.results.iter().flat_map(|r| r.matches.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nearest_query_without_filter() {
        let query = QueryRequest::nearest("c", vec![0.8, 0.1, 0.7], 2);
        let text = serde_json::to_string(&query).unwrap();
        assert!(text.contains(r#""values":[0.8,0.1,0.7]"#), "{}", text);
        let body: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(body["namespace"], "c");
        assert_eq!(body["topK"], 2);
        assert_eq!(body["includeValues"], false);
        assert_eq!(body["includeMetadata"], true);
        assert!(body.get("filter").is_none());

        let queries = body["queries"].as_array().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0]["values"], json!([0.8, 0.1, 0.7]));
        assert!(queries[0].get("filter").is_none());
        assert!(queries[0].get("topK").is_none());
    }

    #[test]
    fn test_filter_is_placed_twice() {
        let filter = json!({"color": {"$in": ["cyan"]}});
        let query = QueryRequest::nearest("c", vec![0.8, 0.1, 0.7], 1).with_filter(filter.clone());
        let body = serde_json::to_value(&query).unwrap();

        assert_eq!(body["filter"], filter);
        assert_eq!(body["queries"][0]["filter"], filter);
        assert_eq!(body["filter"], body["queries"][0]["filter"]);
    }

    #[test]
    fn test_create_request_flattens_spec() {
        let spec = CollectionSpec::new(3, Metric::DotProduct).with_option("pods", 1);
        let body = serde_json::to_value(CreateCollectionRequest {
            name: "pretty-colors",
            spec: &spec,
        })
        .unwrap();

        assert_eq!(
            body,
            json!({"name": "pretty-colors", "dimension": 3, "metric": "dotproduct", "pods": 1})
        );
    }

    #[test]
    fn test_descriptor_data_plane_url() {
        let desc: CollectionDescriptor = serde_json::from_value(json!({
            "database": {"name": "pretty-colors", "dimension": 3},
            "status": {"ready": true, "host": "pretty-colors-abc.svc.example.io", "port": 433}
        }))
        .unwrap();

        assert!(desc.status.ready);
        assert!(desc.extra.contains_key("database"));
        assert_eq!(
            desc.data_plane_url().as_deref(),
            Some("https://pretty-colors-abc.svc.example.io:433/")
        );
    }

    #[test]
    fn test_descriptor_without_host() {
        let desc: CollectionDescriptor =
            serde_json::from_value(json!({"status": {"ready": false}})).unwrap();
        assert!(!desc.status.ready);
        assert!(desc.data_plane_url().is_none());
    }

    #[test]
    fn test_collection_entries_accept_names_and_descriptors() {
        let entries: Vec<CollectionEntry> = serde_json::from_value(json!([
            "pretty-colors",
            {"name": "other", "dimension": 8, "metric": "euclidean", "status": {"ready": true}}
        ]))
        .unwrap();

        assert_eq!(entries[0].name(), Some("pretty-colors"));
        assert_eq!(entries[1].name(), Some("other"));
    }

    #[test]
    fn test_point_omits_empty_metadata() {
        let bare = serde_json::to_value(Point::new("colors-1", vec![0.9, 0.1, 0.1])).unwrap();
        assert!(bare.get("metadata").is_none());

        let tagged = Point::new("colors-1", vec![0.9, 0.1, 0.1]).with_metadata("color", "red");
        let body = serde_json::to_value(tagged).unwrap();
        assert_eq!(body["metadata"]["color"], "red");
    }

    #[test]
    fn test_query_response_hits_from_either_shape() {
        let batched: QueryResponse = serde_json::from_value(json!({
            "results": [{"matches": [{"id": "colors-4", "score": 1.49}], "namespace": "c"}]
        }))
        .unwrap();
        let single: QueryResponse = serde_json::from_value(json!({
            "matches": [{"id": "colors-4", "score": 1.49}, {"id": "colors-1", "score": 0.8}]
        }))
        .unwrap();

        assert_eq!(batched.hits().count(), 1);
        assert_eq!(single.hits().map(|m| m.id.as_str()).collect::<Vec<_>>(), ["colors-4", "colors-1"]);
    }
}
