use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::error::ReportError;
use crate::model::{KeySummary, ReconciliationSet};
use crate::table::Table;

/// Inner join on `key`, compared by normalized key text.
///
/// Output columns are all of `left` followed by the `right` columns not
/// already present. Rows pair up many-to-many in left order, then right
/// order. Rows without a partner on the other side are dropped.
pub fn inner_join(left: &Table, right: &Table, key: &str) -> Result<Table, ReportError> {
    let left_idx = left
        .column_index(key)
        .ok_or_else(|| ReportError::missing_columns("input", vec![key.to_string()]))?;
    let right_idx = right
        .column_index(key)
        .ok_or_else(|| ReportError::missing_columns("store", vec![key.to_string()]))?;

    let carried: Vec<usize> = right
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, name)| !left.has_column(name))
        .map(|(i, _)| i)
        .collect();

    let mut right_by_key: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        if let Some(k) = row[right_idx].key_text() {
            right_by_key.entry(k).or_default().push(i);
        }
    }

    let columns = left
        .columns()
        .iter()
        .cloned()
        .chain(carried.iter().map(|&i| right.columns()[i].clone()));
    let mut joined = Table::new(columns);

    let mut unmatched_left = 0;
    let mut right_used = vec![false; right.len()];
    for row in left.rows() {
        let partners = row[left_idx]
            .key_text()
            .and_then(|k| right_by_key.get(&k));
        let Some(partners) = partners else {
            unmatched_left += 1;
            continue;
        };
        for &ri in partners {
            right_used[ri] = true;
            let mut values = row.clone();
            values.extend(carried.iter().map(|&ci| right.rows()[ri][ci].clone()));
            joined.push_row(values);
        }
    }

    let unmatched_right = right_used.iter().filter(|used| !**used).count();
    debug!(unmatched_left, unmatched_right, joined = joined.len(), "inner join");
    Ok(joined)
}

/// Set algebra over two key collections. Duplicates collapse.
pub fn reconcile_keys(input: &[String], store: &[String]) -> ReconciliationSet {
    let input: BTreeSet<&str> = input.iter().map(String::as_str).collect();
    let store: BTreeSet<&str> = store.iter().map(String::as_str).collect();

    let owned = |it: Vec<&&str>| -> Vec<String> { it.into_iter().map(|s| s.to_string()).collect() };
    let matched = owned(input.intersection(&store).collect());
    let missing_in_store = owned(input.difference(&store).collect());
    let missing_in_input = owned(store.difference(&input).collect());

    let summary = KeySummary {
        input_keys: input.len(),
        store_keys: store.len(),
        matched: matched.len(),
        missing_in_store: missing_in_store.len(),
        missing_in_input: missing_in_input.len(),
    };

    ReconciliationSet {
        matched,
        missing_in_store,
        missing_in_input,
        summary,
    }
}
