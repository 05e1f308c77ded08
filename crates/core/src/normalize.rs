//! Canonical form of a tabular result, used only for grading.
//!
//! Two results are graded equal when their canonical forms match: float
//! columns rounded, columns ordered by name, rows ordered by their values.

use std::cmp::Ordering;

use serde::Serialize;

use crate::model::{Column, ColumnKind, TabularResult, Value};

/// Decimal places kept for floating-point columns.
pub const DEFAULT_FLOAT_DECIMALS: i32 = 6;

/// Knobs for normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradingOptions {
    pub float_decimals: i32,
}

impl Default for GradingOptions {
    fn default() -> Self {
        Self {
            float_decimals: DEFAULT_FLOAT_DECIMALS,
        }
    }
}

/// A result in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CanonicalResult(TabularResult);

impl CanonicalResult {
    #[must_use]
    pub fn as_table(&self) -> &TabularResult {
        &self.0
    }

    #[must_use]
    pub fn into_table(self) -> TabularResult {
        self.0
    }
}

impl AsRef<TabularResult> for CanonicalResult {
    fn as_ref(&self) -> &TabularResult {
        &self.0
    }
}

/// Normalize with the default options. An absent result stays absent.
#[must_use]
pub fn normalize(result: Option<&TabularResult>) -> Option<CanonicalResult> {
    result.map(|table| canonicalize(table, GradingOptions::default()))
}

/// Bring `table` into canonical form.
#[must_use]
pub fn canonicalize(table: &TabularResult, options: GradingOptions) -> CanonicalResult {
    let (columns, row_count) = table.clone().into_columns();

    let mut columns: Vec<Column> = columns
        .into_iter()
        .map(|column| round_column(column, options.float_decimals))
        .collect();

    columns.sort_by(|a, b| {
        a.name()
            .cmp(b.name())
            .then_with(|| compare_contents(a.values(), b.values()))
    });

    if !columns.is_empty() {
        let mut order: Vec<usize> = (0..row_count).collect();
        order.sort_by(|&a, &b| {
            columns
                .iter()
                .map(|c| c.values()[a].total_cmp(&c.values()[b]))
                .find(|ord| ord.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        columns = columns
            .into_iter()
            .map(|column| {
                let (name, kind, values) = column.into_parts();
                let values = order.iter().map(|&idx| values[idx].clone()).collect();
                Column::from_parts(name, kind, values)
            })
            .collect();
    }

    CanonicalResult(TabularResult::from_parts_unchecked(columns, row_count))
}

/// Order same-named columns by their values taken as sorted multisets, so
/// the tie-break does not depend on row order.
fn compare_contents(a: &[Value], b: &[Value]) -> Ordering {
    let sorted = |values: &[Value]| {
        let mut values = values.to_vec();
        values.sort_by(Value::total_cmp);
        values
    };
    let (a, b) = (sorted(a), sorted(b));
    a.iter()
        .zip(&b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|ord| ord.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

fn round_column(column: Column, decimals: i32) -> Column {
    if column.kind() != ColumnKind::Float {
        return column;
    }
    let (name, kind, values) = column.into_parts();
    let values = values
        .into_iter()
        .map(|value| match value {
            Value::Float(v) => Value::Float(round_float(v, decimals)),
            other => other,
        })
        .collect();
    Column::from_parts(name, kind, values)
}

/// Round half away from zero to `decimals` places; folds `-0.0` into `0.0`.
#[must_use]
pub fn round_float(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    let rounded = scaled.round() / factor;
    if rounded == 0.0 { 0.0 } else { rounded }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table(names: &[&str], rows: Vec<Vec<Value>>) -> TabularResult {
        TabularResult::from_rows(names.iter().copied(), rows).unwrap()
    }

    #[test]
    fn absent_result_stays_absent() {
        assert!(normalize(None).is_none());
    }

    #[test]
    fn columns_are_ordered_by_name_and_rows_by_value() {
        let t = table(
            &["species", "count"],
            vec![
                vec!["Gentoo".into(), 124.into()],
                vec!["Adelie".into(), 152.into()],
                vec!["Chinstrap".into(), 68.into()],
            ],
        );
        let canonical = normalize(Some(&t)).unwrap();
        let out = canonical.as_table();
        assert_eq!(out.column_names(), vec!["count", "species"]);
        let first: Vec<_> = out.rows().map(|r| r[0].clone()).collect();
        assert_eq!(first, vec![Value::Integer(68), Value::Integer(124), Value::Integer(152)]);
    }

    #[test]
    fn floats_are_rounded_to_six_places() {
        let t = table(&["avg"], vec![vec![(1.0_f64 / 3.0).into()]]);
        let canonical = normalize(Some(&t)).unwrap();
        assert_eq!(canonical.as_table().columns()[0].values()[0], Value::Float(0.333_333));
    }

    #[test]
    fn all_null_float_column_normalizes() {
        let column = Column::new("rating", ColumnKind::Float, vec![Value::Null, Value::Null]).unwrap();
        let t = TabularResult::new(vec![column]).unwrap();
        let canonical = normalize(Some(&t)).unwrap();
        assert!(canonical.as_table().columns()[0].values().iter().all(Value::is_null));
    }

    #[test]
    fn same_named_columns_are_ordered_by_content() {
        let authors_first = table(
            &["name", "name"],
            vec![
                vec!["Ursula".into(), "Villeneuve".into()],
                vec!["Octavia".into(), "Nolan".into()],
            ],
        );
        let directors_first = table(
            &["name", "name"],
            vec![
                vec!["Nolan".into(), "Octavia".into()],
                vec!["Villeneuve".into(), "Ursula".into()],
            ],
        );
        assert_eq!(normalize(Some(&authors_first)), normalize(Some(&directors_first)));
        let canonical = normalize(Some(&authors_first)).unwrap();
        assert_eq!(canonical.as_table().row(0).unwrap()[0], &Value::from("Nolan"));
    }

    #[test]
    fn duplicate_rows_are_kept() {
        let t = table(&["g"], vec![vec!["a".into()], vec!["a".into()], vec!["b".into()]]);
        assert_eq!(normalize(Some(&t)).unwrap().as_table().row_count(), 3);
    }

    #[test]
    fn zero_column_rows_are_preserved() {
        let t = table(&[], vec![vec![], vec![], vec![]]);
        let canonical = normalize(Some(&t)).unwrap();
        assert_eq!(canonical.as_table().row_count(), 3);
        assert_eq!(canonical.as_table().column_count(), 0);
    }

    #[test]
    fn negative_zero_is_folded() {
        assert_eq!(round_float(-0.000_000_1, 6).to_bits(), 0.0_f64.to_bits());
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            (-1_000i64..1_000).prop_map(Value::Integer),
            "[a-d]{0,3}".prop_map(Value::Text),
        ]
    }

    /// Rows of width 3 with columns `c`, `a`, `b` plus a float column `f`.
    fn arb_table() -> impl Strategy<Value = TabularResult> {
        prop::collection::vec(
            (arb_value(), arb_value(), arb_value(), -1.0e6f64..1.0e6),
            0..12,
        )
        .prop_map(|rows| {
            let rows = rows
                .into_iter()
                .map(|(c, a, b, f)| vec![c, a, b, Value::Float(f)])
                .collect();
            TabularResult::from_rows(["c", "a", "b", "f"], rows).unwrap()
        })
    }

    fn permute_columns(t: &TabularResult, order: &[usize]) -> TabularResult {
        let columns = order.iter().map(|&i| t.columns()[i].clone()).collect();
        TabularResult::new(columns).unwrap()
    }

    fn permute_rows(t: &TabularResult, seed: &[usize]) -> TabularResult {
        let mut idx: Vec<usize> = (0..t.row_count()).collect();
        for (i, s) in seed.iter().enumerate().take(idx.len()) {
            let j = s % idx.len();
            idx.swap(i, j);
        }
        let names: Vec<String> = t.column_names().into_iter().map(str::to_owned).collect();
        let rows = idx
            .iter()
            .map(|&r| t.row(r).unwrap().into_iter().cloned().collect())
            .collect();
        TabularResult::from_rows(names, rows).unwrap()
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(t in arb_table()) {
            let once = normalize(Some(&t)).unwrap();
            let twice = normalize(Some(once.as_table())).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_column_order_does_not_matter(t in arb_table(), order in Just(vec![0usize, 1, 2, 3]).prop_shuffle()) {
            let permuted = permute_columns(&t, &order);
            prop_assert_eq!(normalize(Some(&t)), normalize(Some(&permuted)));
        }

        #[test]
        fn prop_row_order_does_not_matter(t in arb_table(), seed in prop::collection::vec(any::<usize>(), 12)) {
            let permuted = permute_rows(&t, &seed);
            prop_assert_eq!(normalize(Some(&t)), normalize(Some(&permuted)));
        }
    }
}
