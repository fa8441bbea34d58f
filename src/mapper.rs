use std::any::Any;

use crate::binder::BindSource;
use crate::error::MappingError;
use crate::model::accessor::FieldAccessors;
use crate::model::Model;
use crate::rows::{DbRow, ResultSet};

/// What to do with result columns that have no matching model field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnPolicy {
    /// Ignore them; result sets may project columns the model does not
    /// track.
    #[default]
    IgnoreUnknown,
    /// Fail the mapping on the first unmatched column.
    DenyUnknown,
}

/// Where mapped rows land.
pub(crate) enum Destination<'a, M> {
    /// Exactly one row is required.
    One(&'a mut M),
    /// Zero or more rows; one fresh element per row, in cursor order.
    Many(&'a mut Vec<M>),
}

/// What `@key` placeholders may bind from, given the destination shape.
pub(crate) fn bind_source<'s, M: Model>(dest: &'s Destination<'_, M>) -> BindSource<'s> {
    match dest {
        Destination::One(model) => BindSource::Struct(&**model as &dyn Any),
        Destination::Many(_) => BindSource::Sequence,
    }
}

/// Map a result set onto the destination using the model's setters.
///
/// Consumes the result set. Single-struct destinations enforce the
/// exactly-one-row contract; sequence destinations accept any row count.
pub(crate) fn map_result<M: Model>(
    result_set: ResultSet,
    dest: Destination<'_, M>,
    accessors: &FieldAccessors,
    columns: ColumnPolicy,
) -> Result<(), MappingError> {
    match dest {
        Destination::One(model) => {
            let mut rows = result_set.rows.into_iter();
            let row = rows.next().ok_or(MappingError::NoRows)?;
            if rows.next().is_some() {
                return Err(MappingError::TooManyRows);
            }
            apply_row(row, model, accessors, columns)
        }
        Destination::Many(models) => {
            for row in result_set.rows {
                let mut model = M::default();
                apply_row(row, &mut model, accessors, columns)?;
                models.push(model);
            }
            Ok(())
        }
    }
}

fn apply_row<M: Model>(
    row: DbRow,
    model: &mut M,
    accessors: &FieldAccessors,
    columns: ColumnPolicy,
) -> Result<(), MappingError> {
    for (column, value) in row.into_columns() {
        let Some(setter) = accessors.setter(&column) else {
            match columns {
                ColumnPolicy::IgnoreUnknown => continue,
                ColumnPolicy::DenyUnknown => return Err(MappingError::UnknownColumn(column)),
            }
        };
        let target: &mut dyn Any = &mut *model;
        setter(target, value).map_err(|source| MappingError::Column { column, source })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::registry::ModelRegistry;
    use crate::pg_model;
    use crate::types::RowValues;

    #[derive(Default)]
    struct User {
        id: i64,
        name: String,
    }

    pg_model!(User { id, name });

    fn result_set(rows: &[(i64, &str)]) -> ResultSet {
        let mut rs = ResultSet::new(vec!["id".into(), "name".into()]);
        for (id, name) in rows {
            rs.add_row(vec![RowValues::Int(*id), RowValues::Text((*name).into())]);
        }
        rs
    }

    fn accessors(registry: &ModelRegistry) -> std::sync::Arc<crate::model::registry::ParsedModel> {
        registry.parsed::<User>().unwrap()
    }

    #[test]
    fn one_row_populates_a_single_struct() {
        let registry = ModelRegistry::new();
        let parsed = accessors(&registry);
        let mut user = User::default();

        map_result(
            result_set(&[(5, "eve")]),
            Destination::One(&mut user),
            &parsed.accessors,
            ColumnPolicy::IgnoreUnknown,
        )
        .unwrap();

        assert_eq!(user.id, 5);
        assert_eq!(user.name, "eve");
    }

    #[test]
    fn zero_rows_into_a_single_struct_is_not_found() {
        let registry = ModelRegistry::new();
        let parsed = accessors(&registry);
        let mut user = User::default();

        let err = map_result(
            result_set(&[]),
            Destination::One(&mut user),
            &parsed.accessors,
            ColumnPolicy::IgnoreUnknown,
        )
        .unwrap_err();
        assert!(matches!(err, MappingError::NoRows));
    }

    #[test]
    fn two_rows_into_a_single_struct_is_too_many() {
        let registry = ModelRegistry::new();
        let parsed = accessors(&registry);
        let mut user = User::default();

        let err = map_result(
            result_set(&[(1, "a"), (2, "b")]),
            Destination::One(&mut user),
            &parsed.accessors,
            ColumnPolicy::IgnoreUnknown,
        )
        .unwrap_err();
        assert!(matches!(err, MappingError::TooManyRows));
    }

    #[test]
    fn sequence_destination_accepts_any_row_count() {
        let registry = ModelRegistry::new();
        let parsed = accessors(&registry);

        let mut empty: Vec<User> = Vec::new();
        map_result(
            result_set(&[]),
            Destination::Many(&mut empty),
            &parsed.accessors,
            ColumnPolicy::IgnoreUnknown,
        )
        .unwrap();
        assert!(empty.is_empty());

        let mut users: Vec<User> = Vec::new();
        map_result(
            result_set(&[(1, "a"), (2, "b"), (3, "c")]),
            Destination::Many(&mut users),
            &parsed.accessors,
            ColumnPolicy::IgnoreUnknown,
        )
        .unwrap();
        assert_eq!(users.len(), 3);
        assert_eq!(users[0].id, 1);
        assert_eq!(users[2].name, "c");
    }

    #[test]
    fn unknown_columns_follow_the_policy() {
        let registry = ModelRegistry::new();
        let parsed = accessors(&registry);

        let mut rs = ResultSet::new(vec!["id".into(), "extra".into()]);
        rs.add_row(vec![RowValues::Int(1), RowValues::Text("x".into())]);

        let mut user = User::default();
        map_result(
            rs.clone(),
            Destination::One(&mut user),
            &parsed.accessors,
            ColumnPolicy::IgnoreUnknown,
        )
        .unwrap();
        assert_eq!(user.id, 1);

        let err = map_result(
            rs,
            Destination::One(&mut user),
            &parsed.accessors,
            ColumnPolicy::DenyUnknown,
        )
        .unwrap_err();
        assert!(matches!(err, MappingError::UnknownColumn(col) if col == "extra"));
    }

    #[test]
    fn setter_failures_name_the_column() {
        let registry = ModelRegistry::new();
        let parsed = accessors(&registry);

        let mut rs = ResultSet::new(vec!["id".into()]);
        rs.add_row(vec![RowValues::Text("not an int".into())]);

        let mut user = User::default();
        let err = map_result(
            rs,
            Destination::One(&mut user),
            &parsed.accessors,
            ColumnPolicy::IgnoreUnknown,
        )
        .unwrap_err();
        assert!(matches!(err, MappingError::Column { column, .. } if column == "id"));
    }
}
