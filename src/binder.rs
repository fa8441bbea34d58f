use std::any::Any;
use std::collections::HashMap;

use crate::error::BindingError;
use crate::model::accessor::FieldAccessors;
use crate::template::{BindingSource, CompiledSql};
use crate::types::RowValues;

/// One named argument for the `#key` placeholder form.
#[derive(Debug, Clone)]
pub struct Argument {
    pub(crate) key: String,
    pub(crate) value: RowValues,
}

impl Argument {
    /// Pair a key with a value.
    pub fn new(key: impl Into<String>, value: impl Into<RowValues>) -> Self {
        Argument {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Caller-supplied named arguments for one query/command invocation.
pub(crate) type ArgumentMap = HashMap<String, RowValues>;

/// What `@key` instructions resolve against.
pub(crate) enum BindSource<'a> {
    /// A single model value; `@key` reads through its getters.
    Struct(&'a dyn Any),
    /// A sequence destination; `@key` cannot bind from it.
    Sequence,
}

/// Resolve the compiled instruction list into the ordered parameter list.
///
/// Evaluated fully before execution; a failure means nothing reaches the
/// executor. Pure given its inputs.
pub(crate) fn bind_params(
    compiled: &CompiledSql,
    source: &BindSource<'_>,
    args: &ArgumentMap,
    accessors: &FieldAccessors,
) -> Result<Vec<RowValues>, BindingError> {
    let mut params = Vec::with_capacity(compiled.bindings().len());

    for instruction in compiled.bindings() {
        match instruction.source {
            BindingSource::Model => {
                let model = match source {
                    BindSource::Struct(model) => *model,
                    BindSource::Sequence => return Err(BindingError::SequenceSource),
                };
                let getter = accessors
                    .getter(&instruction.key)
                    .ok_or_else(|| BindingError::FieldNotFound(instruction.key.clone()))?;
                params.push(getter(model)?);
            }
            BindingSource::Argument => {
                let value = args
                    .get(&instruction.key)
                    .ok_or_else(|| BindingError::ArgumentNotFound(instruction.key.clone()))?;
                params.push(value.clone());
            }
        }
    }

    Ok(params)
}
