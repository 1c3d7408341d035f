use crate::config::Predicate;
use crate::model::ClassifiedGroups;
use crate::table::{Record, Table};

impl Predicate {
    /// Total evaluation: a field absent from the record makes its leaf false.
    pub fn evaluate(&self, record: &Record<'_>) -> bool {
        match self {
            Self::All(items) => items.iter().all(|p| p.evaluate(record)),
            Self::Any(items) => items.iter().any(|p| p.evaluate(record)),
            Self::Not(inner) => !inner.evaluate(record),
            Self::Equals { field, value } => record
                .get(field)
                .is_some_and(|v| v.loose_eq(&value.to_scalar())),
            Self::FieldsEqual { left, right } => match (record.get(left), record.get(right)) {
                (Some(a), Some(b)) => a.loose_eq(b),
                _ => false,
            },
        }
    }
}

/// Route every joined record to `matched` or `remainder`, preserving order.
pub fn partition(joined: &Table, predicate: &Predicate) -> ClassifiedGroups {
    let mut matched = Table::new(joined.columns().iter().cloned());
    let mut remainder = Table::new(joined.columns().iter().cloned());

    for record in joined.records() {
        let target = if predicate.evaluate(&record) {
            &mut matched
        } else {
            &mut remainder
        };
        target.push_row(record.values().to_vec());
    }

    ClassifiedGroups { matched, remainder }
}
