//! Filter selections and their query-string form.
//!
//! The query string is the only persistence the filter state has: a view is
//! shared by copying the string and restored by parsing it back, so
//! serialization must round-trip exactly and parsing must never fail on
//! user-edited input.

/// Active filter selections. Key order in the serialized form is fixed:
/// `q`, `cat`, `cluster`, `comp`, `page`; empty dimensions are omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterState {
    pub categories: Vec<String>,
    pub clusters: Vec<i64>,
    pub companies: Vec<String>,
    pub search: String,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
            && self.clusters.is_empty()
            && self.companies.is_empty()
            && self.search.trim().is_empty()
    }
}

/// Owns the filter state plus the page cursor and keeps the two consistent:
/// any filter change invalidates the page because result ordering and count
/// change with the filters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterStore {
    filters: FilterState,
    page: u32,
}

impl Default for FilterStore {
    fn default() -> Self {
        Self {
            filters: FilterState::default(),
            page: 1,
        }
    }
}

impl FilterStore {
    pub fn from_query(query: &str) -> Self {
        let query = query.trim().trim_start_matches('?');
        let mut filters = FilterState::default();
        let mut page = 1u32;

        for pair in query.split('&') {
            let (key, raw) = match pair.split_once('=') {
                Some(split) => split,
                None => continue,
            };

            match key {
                "q" => filters.search = decode_component(raw),
                "cat" => {
                    filters.categories = raw
                        .split(',')
                        .map(decode_component)
                        .filter(|id| !id.is_empty())
                        .collect();
                }
                "cluster" => {
                    // Non-numeric ids in a hand-edited string are dropped,
                    // not surfaced as errors.
                    filters.clusters = raw
                        .split(',')
                        .filter_map(|id| decode_component(id).parse::<i64>().ok())
                        .collect();
                }
                "comp" => {
                    filters.companies = raw
                        .split(',')
                        .map(decode_component)
                        .filter(|name| !name.is_empty())
                        .collect();
                }
                "page" => {
                    page = decode_component(raw)
                        .parse::<u32>()
                        .ok()
                        .filter(|&parsed| parsed >= 1)
                        .unwrap_or(1);
                }
                _ => {}
            }
        }

        Self { filters, page }
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Replaces the filters and unconditionally resets the page to 1.
    pub fn update_filters(&mut self, filters: FilterState) {
        self.filters = filters;
        self.page = 1;
    }

    /// Keeps the filters, moves the page. Values below 1 clamp to 1;
    /// out-of-range pages are the server's concern, not the store's.
    pub fn update_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn query_string(&self) -> String {
        let mut parts = Vec::new();

        let search = self.filters.search.trim();
        if !search.is_empty() {
            parts.push(format!("q={}", encode_component(search)));
        }
        if !self.filters.categories.is_empty() {
            parts.push(format!("cat={}", join_encoded(&self.filters.categories)));
        }
        if !self.filters.clusters.is_empty() {
            let ids = self
                .filters
                .clusters
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>();
            parts.push(format!("cluster={}", ids.join(",")));
        }
        if !self.filters.companies.is_empty() {
            parts.push(format!("comp={}", join_encoded(&self.filters.companies)));
        }
        if self.page > 1 {
            parts.push(format!("page={}", self.page));
        }

        parts.join("&")
    }
}

/// Drops cluster selections owned by `category_id`. Called by the layer that
/// owns both selection handlers when a category is deselected, because a
/// cluster selection scoped to a dropped category is meaningless. Clusters
/// with an unknown owner are kept.
pub fn clear_clusters_of_category(
    filters: &mut FilterState,
    category_id: &str,
    owner_of: impl Fn(i64) -> Option<String>,
) {
    filters
        .clusters
        .retain(|&cluster_id| owner_of(cluster_id).as_deref() != Some(category_id));
}

fn join_encoded(values: &[String]) -> String {
    values
        .iter()
        .map(|value| encode_component(value))
        .collect::<Vec<_>>()
        .join(",")
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~')
}

/// Percent-encodes a single value. Commas are encoded too, so encoded
/// elements can be comma-joined without ambiguity.
pub fn encode_component(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if is_unreserved(byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// Decodes `%XX` sequences and `+` as space. Malformed escapes are kept
/// literally instead of failing; the input is user-editable.
pub fn decode_component(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'+' => {
                decoded.push(b' ');
                index += 1;
            }
            b'%' => {
                if let Some(byte) = hex_pair(bytes.get(index + 1), bytes.get(index + 2)) {
                    decoded.push(byte);
                    index += 3;
                } else {
                    decoded.push(b'%');
                    index += 1;
                }
            }
            byte => {
                decoded.push(byte);
                index += 1;
            }
        }
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_pair(high: Option<&u8>, low: Option<&u8>) -> Option<u8> {
    let high = (*high? as char).to_digit(16)?;
    let low = (*low? as char).to_digit(16)?;
    Some(((high << 4) | low) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated_store() -> FilterStore {
        let mut store = FilterStore::default();
        store.update_filters(FilterState {
            categories: vec!["react".to_string(), "javascript_core".to_string()],
            clusters: vec![5, 9],
            companies: vec!["Yandex".to_string(), "T-Bank, Ltd".to_string()],
            search: "event loop".to_string(),
        });
        store.update_page(3);
        store
    }

    #[test]
    fn round_trips_a_populated_state() {
        let store = populated_store();
        let recovered = FilterStore::from_query(&store.query_string());
        assert_eq!(recovered, store);
    }

    #[test]
    fn round_trips_the_empty_state() {
        let store = FilterStore::default();
        assert_eq!(store.query_string(), "");
        assert_eq!(FilterStore::from_query(""), store);
    }

    #[test]
    fn page_one_is_omitted_and_recovered() {
        let mut store = FilterStore::default();
        store.update_filters(FilterState {
            search: "hooks".to_string(),
            ..FilterState::default()
        });

        let query = store.query_string();
        assert!(!query.contains("page"));
        assert_eq!(FilterStore::from_query(&query).page(), 1);
    }

    #[test]
    fn key_order_is_stable() {
        let query = populated_store().query_string();
        assert_eq!(
            query,
            "q=event%20loop&cat=react,javascript_core&cluster=5,9&comp=Yandex,T-Bank%2C%20Ltd&page=3"
        );
    }

    #[test]
    fn updating_filters_resets_the_page() {
        let mut store = populated_store();
        assert_eq!(store.page(), 3);
        store.update_filters(FilterState::default());
        assert_eq!(store.page(), 1);
    }

    #[test]
    fn update_page_clamps_to_one() {
        let mut store = FilterStore::default();
        store.update_page(0);
        assert_eq!(store.page(), 1);
        store.update_page(42);
        assert_eq!(store.page(), 42);
    }

    #[test]
    fn malformed_page_defaults_to_one() {
        assert_eq!(FilterStore::from_query("page=abc").page(), 1);
        assert_eq!(FilterStore::from_query("page=0").page(), 1);
        assert_eq!(FilterStore::from_query("page=-4").page(), 1);
    }

    #[test]
    fn malformed_cluster_ids_are_dropped_silently() {
        let store = FilterStore::from_query("cluster=5,abc,9,");
        assert_eq!(store.filters().clusters, vec![5, 9]);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let store = FilterStore::from_query("utm_source=x&cat=react");
        assert_eq!(store.filters().categories, vec!["react".to_string()]);
    }

    #[test]
    fn comma_inside_a_company_name_survives() {
        let mut store = FilterStore::default();
        store.update_filters(FilterState {
            companies: vec!["T-Bank, Ltd".to_string()],
            ..FilterState::default()
        });

        let recovered = FilterStore::from_query(&store.query_string());
        assert_eq!(recovered.filters().companies, vec!["T-Bank, Ltd".to_string()]);
    }

    #[test]
    fn decode_tolerates_broken_escapes() {
        assert_eq!(decode_component("100%"), "100%");
        assert_eq!(decode_component("a%2"), "a%2");
        assert_eq!(decode_component("a%zz"), "a%zz");
        assert_eq!(decode_component("a+b"), "a b");
    }

    #[test]
    fn unicode_category_ids_round_trip() {
        let mut store = FilterStore::default();
        store.update_filters(FilterState {
            categories: vec!["алгоритмы".to_string()],
            ..FilterState::default()
        });

        let recovered = FilterStore::from_query(&store.query_string());
        assert_eq!(recovered.filters().categories, vec!["алгоритмы".to_string()]);
    }

    #[test]
    fn deselecting_a_category_clears_its_clusters_only() {
        let mut filters = FilterState {
            categories: vec!["react".to_string()],
            clusters: vec![5, 9],
            ..FilterState::default()
        };

        // Cluster 9 belongs to react, cluster 5 to javascript_core.
        let owner_of = |cluster_id: i64| match cluster_id {
            9 => Some("react".to_string()),
            5 => Some("javascript_core".to_string()),
            _ => None,
        };

        filters.categories.retain(|id| id != "react");
        clear_clusters_of_category(&mut filters, "react", owner_of);

        assert_eq!(filters.clusters, vec![5]);
    }
}
