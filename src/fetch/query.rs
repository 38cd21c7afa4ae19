use std::collections::BTreeMap;

use url::Url;

/// Appends `params` to the query string of `url`, keeping any query it already has.
///
/// Keys and values are form-encoded. An empty map leaves the URL untouched
/// (no dangling `?`).
pub fn append_query(url: &mut Url, params: &BTreeMap<String, String>) {
    if params.is_empty() {
        return;
    }
    url.query_pairs_mut().extend_pairs(params.iter());
}
