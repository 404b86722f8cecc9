use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::filters::encode_component;

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub const MIN_INTERVIEW_COUNT: u32 = 1;
pub const CONSTELLATION_LIMIT: usize = 200;
pub const SAMPLE_QUESTION_LIMIT: usize = 10;
pub const COMPANY_LIMIT: usize = 50;

#[derive(Clone, Debug, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub questions_count: u64,
    #[serde(default)]
    pub clusters_count: u64,
    #[serde(default)]
    pub percentage: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ClusterNode {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub questions_count: u64,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub example_question: Option<String>,
    #[serde(default)]
    pub interview_penetration: Option<f64>,
    #[serde(default)]
    pub top_companies: Option<Vec<String>>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct ClusterLink {
    pub source: i64,
    pub target: i64,
    #[serde(default)]
    pub weight: f64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Constellation {
    #[serde(default)]
    pub nodes: Vec<ClusterNode>,
    #[serde(default)]
    pub links: Vec<ClusterLink>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Company {
    pub name: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Totals {
    pub questions: u64,
    pub clusters: u64,
    pub categories: usize,
}

/// Category summaries plus the constellation payload they were reconciled
/// against. `categories` carries recomputed `clusters_count` values; the
/// server-reported aggregates are overwritten during reconciliation.
#[derive(Clone, Debug)]
pub struct Overview {
    pub categories: Vec<Category>,
    pub constellation: Constellation,
    pub totals: Totals,
}

/// Blocking JSON client over ureq. Every call blocks, so callers run requests
/// on background threads and hand results back over a channel.
#[derive(Clone)]
pub struct ApiClient {
    agent: ureq::Agent,
    base: String,
}

impl ApiClient {
    pub fn new(base: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build();

        Self {
            agent,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn get_json(&self, path_and_query: &str) -> Result<Value> {
        let url = format!("{}{}", self.base, path_and_query);

        match self.agent.get(&url).call() {
            Ok(response) => response
                .into_json::<Value>()
                .with_context(|| format!("invalid JSON from {url}")),
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                let detail = body.trim();
                if detail.is_empty() {
                    Err(anyhow!("GET {url} returned HTTP {code}"))
                } else {
                    Err(anyhow!(
                        "GET {url} returned HTTP {code}: {}",
                        crate::util::truncate_label(detail, 180)
                    ))
                }
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(anyhow!("GET {url} failed: {transport}"))
            }
        }
    }

    pub fn fetch_categories(&self) -> Result<Vec<Category>> {
        let value = self.get_json("/api/v2/interview-categories/")?;
        serde_json::from_value(value).context("unexpected category list shape")
    }

    pub fn fetch_constellation(&self, category_id: Option<&str>) -> Result<Constellation> {
        let mut path = format!(
            "/api/v2/cluster-visualization/constellation?min_interview_count={MIN_INTERVIEW_COUNT}&limit={CONSTELLATION_LIMIT}"
        );
        if let Some(category_id) = category_id {
            path.push_str("&category_id=");
            path.push_str(&encode_component(category_id));
        }

        let value = self.get_json(&path)?;
        serde_json::from_value(value).context("unexpected constellation shape")
    }

    /// Sample questions for one cluster. The endpoint's shape has drifted
    /// over time, so the raw JSON goes through [`normalize_questions`]
    /// instead of a fixed serde schema.
    pub fn fetch_cluster_questions(&self, cluster_id: i64) -> Result<Vec<String>> {
        let value = self.get_json(&format!(
            "/api/v2/interview-categories/cluster/{cluster_id}/questions?limit={SAMPLE_QUESTION_LIMIT}"
        ))?;
        Ok(normalize_questions(&value))
    }

    pub fn fetch_top_companies(&self) -> Result<Vec<Company>> {
        let value = self.get_json(&format!(
            "/api/v2/interview-categories/companies/top?limit={COMPANY_LIMIT}"
        ))?;
        serde_json::from_value(value).context("unexpected company list shape")
    }

    pub fn fetch_cluster_catalog(
        &self,
        category_ids: &[String],
        search: &str,
    ) -> Result<Vec<ClusterNode>> {
        let mut path = String::from("/api/v2/interview-categories/clusters/all?");
        for category_id in category_ids {
            path.push_str("category_id=");
            path.push_str(&encode_component(category_id));
            path.push('&');
        }
        let search = search.trim();
        if search.chars().count() >= 2 {
            path.push_str("search=");
            path.push_str(&encode_component(search));
            path.push('&');
        }
        path.push_str(&format!("limit={CONSTELLATION_LIMIT}"));

        let value = self.get_json(&path)?;
        serde_json::from_value(value).context("unexpected cluster catalog shape")
    }
}

/// Fetches category summaries and the constellation payload concurrently and
/// joins on both. Either failure fails the overview; partial data is never
/// handed to the layout because category cluster counts come from the
/// constellation nodes.
pub fn fetch_overview(client: &ApiClient) -> Result<Overview> {
    let categories_client = client.clone();
    let constellation_client = client.clone();

    let categories_handle = thread::spawn(move || categories_client.fetch_categories());
    let constellation_handle =
        thread::spawn(move || constellation_client.fetch_constellation(None));

    let categories = categories_handle
        .join()
        .map_err(|_| anyhow!("category fetch thread panicked"))?
        .context("failed to fetch interview categories")?;
    let constellation = constellation_handle
        .join()
        .map_err(|_| anyhow!("constellation fetch thread panicked"))?
        .context("failed to fetch cluster constellation")?;

    Ok(reconcile_overview(categories, constellation))
}

/// Recomputes each category's `clusters_count` from the constellation nodes.
/// The server's own aggregate can lag behind the node data, so the tally over
/// the granular payload wins.
pub fn reconcile_overview(mut categories: Vec<Category>, constellation: Constellation) -> Overview {
    let mut cluster_tally: HashMap<&str, u64> = HashMap::new();
    for node in &constellation.nodes {
        *cluster_tally.entry(node.category_id.as_str()).or_insert(0) += 1;
    }

    let totals = Totals {
        questions: categories
            .iter()
            .map(|category| category.questions_count)
            .sum(),
        clusters: cluster_tally.values().sum(),
        categories: categories.len(),
    };

    for category in &mut categories {
        category.clusters_count = cluster_tally
            .get(category.id.as_str())
            .copied()
            .unwrap_or(0);
    }

    Overview {
        categories,
        constellation,
        totals,
    }
}

/// Flattens the three response shapes the questions endpoint is known to
/// return (`string[]`, `{question_text|text}[]`, `{questions: [...]}`) into
/// at most [`SAMPLE_QUESTION_LIMIT`] non-empty strings.
pub fn normalize_questions(value: &Value) -> Vec<String> {
    let entries = if let Some(wrapped) = value.get("questions").and_then(Value::as_array) {
        wrapped
    } else if let Some(plain) = value.as_array() {
        plain
    } else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(text) => Some(text.clone()),
            Value::Object(map) => map
                .get("question_text")
                .or_else(|| map.get("text"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .filter(|text| !text.trim().is_empty())
        .take(SAMPLE_QUESTION_LIMIT)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn category(id: &str, questions: u64, clusters: u64) -> Category {
        Category {
            id: id.to_string(),
            name: id.to_string(),
            questions_count: questions,
            clusters_count: clusters,
            percentage: 0.0,
        }
    }

    fn cluster(id: i64, category_id: &str) -> ClusterNode {
        ClusterNode {
            id,
            name: format!("cluster-{id}"),
            category_id: category_id.to_string(),
            category_name: category_id.to_string(),
            questions_count: 1,
            keywords: Vec::new(),
            example_question: None,
            interview_penetration: None,
            top_companies: None,
        }
    }

    #[test]
    fn reconcile_overrides_server_cluster_counts() {
        let categories = vec![category("react", 100, 3)];
        let constellation = Constellation {
            nodes: (1..=5).map(|id| cluster(id, "react")).collect(),
            links: Vec::new(),
        };

        let overview = reconcile_overview(categories, constellation);
        assert_eq!(overview.categories[0].clusters_count, 5);
        assert_eq!(overview.totals.clusters, 5);
        assert_eq!(overview.totals.questions, 100);
        assert_eq!(overview.totals.categories, 1);
    }

    #[test]
    fn reconcile_zeroes_categories_without_nodes() {
        let categories = vec![category("react", 10, 7), category("typescript", 5, 2)];
        let constellation = Constellation {
            nodes: vec![cluster(1, "react")],
            links: Vec::new(),
        };

        let overview = reconcile_overview(categories, constellation);
        assert_eq!(overview.categories[0].clusters_count, 1);
        assert_eq!(overview.categories[1].clusters_count, 0);
    }

    #[test]
    fn normalize_accepts_plain_string_array() {
        assert_eq!(normalize_questions(&json!(["a", "b"])), vec!["a", "b"]);
    }

    #[test]
    fn normalize_accepts_object_array() {
        let value = json!([{ "question_text": "a" }, { "text": "b" }]);
        assert_eq!(normalize_questions(&value), vec!["a", "b"]);
    }

    #[test]
    fn normalize_accepts_questions_envelope() {
        let value = json!({ "questions": ["a", "b"] });
        assert_eq!(normalize_questions(&value), vec!["a", "b"]);
    }

    #[test]
    fn normalize_drops_blank_entries_and_caps_at_limit() {
        let raw = (0..20).map(|i| format!("q{i}")).collect::<Vec<_>>();
        let mut entries = vec![String::new(), "  ".to_string()];
        entries.extend(raw);

        let normalized = normalize_questions(&json!(entries));
        assert_eq!(normalized.len(), SAMPLE_QUESTION_LIMIT);
        assert_eq!(normalized[0], "q0");
    }

    #[test]
    fn normalize_rejects_unknown_shapes() {
        assert!(normalize_questions(&json!({ "items": ["a"] })).is_empty());
        assert!(normalize_questions(&json!(42)).is_empty());
    }

    #[test]
    fn constellation_tolerates_missing_optional_fields() {
        let value = json!({
            "nodes": [{ "id": 7, "name": "hooks", "category_id": "react" }],
            "links": [],
            "stats": { "total_clusters": 1 }
        });

        let constellation: Constellation = serde_json::from_value(value).unwrap();
        assert_eq!(constellation.nodes.len(), 1);
        assert!(constellation.nodes[0].keywords.is_empty());
        assert!(constellation.nodes[0].example_question.is_none());
    }
}
