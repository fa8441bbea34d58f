use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AccessError;
use crate::types::RowValues;

use super::resolver::FieldPath;
use super::{FieldNode, Shape};

/// Composed getter: model value → field value by logical column key.
pub(crate) type Getter = Box<dyn Fn(&dyn Any) -> Result<RowValues, AccessError> + Send + Sync>;

/// Composed setter: writes a value into the addressed field of a model.
pub(crate) type Setter =
    Box<dyn Fn(&mut dyn Any, RowValues) -> Result<(), AccessError> + Send + Sync>;

/// Compiled accessor tables for one model shape, keyed by logical column
/// key. Built once per model type and shared read-only afterwards.
pub(crate) struct FieldAccessors {
    getters: HashMap<String, Getter>,
    setters: HashMap<String, Setter>,
}

impl FieldAccessors {
    /// Compile one getter and one setter per resolved field path.
    pub(crate) fn compile(shape: Shape, paths: &HashMap<String, FieldPath>) -> FieldAccessors {
        let shape = Arc::new(shape);
        let mut getters = HashMap::with_capacity(paths.len());
        let mut setters = HashMap::with_capacity(paths.len());

        for (key, path) in paths {
            getters.insert(key.clone(), make_getter(shape.clone(), path.clone()));
            setters.insert(key.clone(), make_setter(shape.clone(), path.clone()));
        }

        FieldAccessors { getters, setters }
    }

    pub(crate) fn getter(&self, key: &str) -> Option<&Getter> {
        self.getters.get(key)
    }

    pub(crate) fn setter(&self, key: &str) -> Option<&Setter> {
        self.setters.get(key)
    }
}

fn make_getter(shape: Arc<Shape>, path: FieldPath) -> Getter {
    Box::new(move |model| {
        let mut fields = &shape.fields;
        let mut current = model;

        for &idx in &path {
            let field = fields.get(idx).ok_or(AccessError::ShapeMismatch {
                expected: shape.type_name,
            })?;
            match &field.node {
                FieldNode::Leaf { get, .. } => return get(current),
                FieldNode::Embedded {
                    projector,
                    shape: child,
                } => {
                    current = projector.project(current)?;
                    fields = &child.fields;
                }
                FieldNode::Skipped => break,
            }
        }

        Err(AccessError::ShapeMismatch {
            expected: shape.type_name,
        })
    })
}

fn make_setter(shape: Arc<Shape>, path: FieldPath) -> Setter {
    Box::new(move |model, value| {
        let mut fields = &shape.fields;
        let mut current = model;

        for &idx in &path {
            let field = fields.get(idx).ok_or(AccessError::ShapeMismatch {
                expected: shape.type_name,
            })?;
            match &field.node {
                FieldNode::Leaf { set, .. } => return set(current, value),
                FieldNode::Embedded {
                    projector,
                    shape: child,
                } => {
                    current = projector.project_mut(current)?;
                    fields = &child.fields;
                }
                FieldNode::Skipped => break,
            }
        }

        Err(AccessError::ShapeMismatch {
            expected: shape.type_name,
        })
    })
}
