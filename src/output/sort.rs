use std::cmp::Ordering;

use crate::scoring::RankedEntity;

/// Re-order a ranking by one column, leaving each entry's `rank` as it was.
///
/// Values compare numerically with the same lenient parse used for scoring;
/// missing or number-free cells count as 0. `rank` and `score` are accepted
/// as column names too. The sort is stable, so ties keep ranking order.
pub fn sort_by_column(ranked: &mut [RankedEntity], column: &str, ascending: bool) {
    let key = |entry: &RankedEntity| match column {
        "rank" => entry.rank as f64,
        "score" => entry.score,
        _ => entry.record.metric(column),
    };

    ranked.sort_by(|a, b| {
        // keys are finite; -0.0 and 0.0 tie
        let order = key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal);
        if ascending {
            order
        } else {
            order.reverse()
        }
    });
}

/// Whether `column` can be passed to `sort_by_column` for this dataset.
pub fn is_sortable_column(columns: &[String], column: &str) -> bool {
    matches!(column, "rank" | "score") || columns.iter().any(|c| c == column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityRecord, MetricValue};
    use crate::scoring::{rank, WeightConfig};
    use std::collections::BTreeMap;

    fn ranked() -> Vec<RankedEntity> {
        let rows = [
            ("A", "10", "3 years"),
            ("B", "20", ""),
            ("C", "5", "12"),
            ("D", "20", "n/a"),
        ];
        let entities: Vec<EntityRecord> = rows
            .iter()
            .map(|(name, metric, tenure)| {
                let mut fields = BTreeMap::new();
                fields.insert("Name".to_string(), MetricValue::from_cell(name));
                fields.insert("Metric".to_string(), MetricValue::from_cell(metric));
                fields.insert("Tenure".to_string(), MetricValue::from_cell(tenure));
                EntityRecord::new(*name, fields).unwrap()
            })
            .collect();
        let weights: WeightConfig = [("Metric", 1.0)].into_iter().collect();
        rank(&entities, &weights).unwrap()
    }

    fn names(ranked: &[RankedEntity]) -> Vec<&str> {
        ranked.iter().map(|r| r.record.id()).collect()
    }

    #[test]
    fn test_sort_descending_keeps_ranks() {
        let mut entries = ranked();
        assert_eq!(names(&entries), vec!["B", "D", "A", "C"]);

        sort_by_column(&mut entries, "Tenure", false);
        assert_eq!(names(&entries), vec!["C", "A", "B", "D"]);
        let ranks: Vec<usize> = entries.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![4, 3, 1, 2]);
    }

    #[test]
    fn test_sort_ascending_is_stable() {
        let mut entries = ranked();
        sort_by_column(&mut entries, "Metric", true);
        // B and D tie on 20 and keep their ranking order
        assert_eq!(names(&entries), vec!["C", "A", "B", "D"]);
    }

    #[test]
    fn test_sort_by_rank_restores_order() {
        let mut entries = ranked();
        sort_by_column(&mut entries, "Tenure", true);
        sort_by_column(&mut entries, "rank", true);
        assert_eq!(names(&entries), vec!["B", "D", "A", "C"]);
    }

    #[test]
    fn test_unknown_column_counts_as_zero() {
        let mut entries = ranked();
        sort_by_column(&mut entries, "Missing Column", false);
        assert_eq!(names(&entries), vec!["B", "D", "A", "C"]);
    }

    #[test]
    fn test_is_sortable_column() {
        let columns = vec!["Name".to_string(), "Metric".to_string()];
        assert!(is_sortable_column(&columns, "Metric"));
        assert!(is_sortable_column(&columns, "score"));
        assert!(!is_sortable_column(&columns, "Tenure"));
    }
}
