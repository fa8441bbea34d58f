//! Model shapes and field access.
//!
//! A model declares its bindable surface as a [`Shape`]: a tree of field
//! descriptors, each either a leaf (with a getter and setter closure) or an
//! embedded child shape. The resolver flattens the tree into logical column
//! keys, and the accessor compiler turns each flattened path into a
//! composed getter/setter that the binder and row mapper share.
//!
//! Shapes are usually declared with [`pg_model!`](crate::pg_model):
//!
//! ```rust
//! use pgbind::pg_model;
//!
//! #[derive(Default)]
//! struct Account {
//!     id: i64,
//!     name: String,
//!     secret: String,
//! }
//!
//! pg_model!(Account {
//!     id,
//!     name as "username",
//!     skip secret,
//! });
//! ```

pub(crate) mod accessor;
pub(crate) mod registry;
pub(crate) mod resolver;

use std::any::{Any, type_name};

use crate::error::AccessError;
use crate::types::{FromRowValue, RowValues};

/// A type whose fields can be bound to SQL parameters and populated from
/// result columns.
///
/// `Default` supplies the fresh element for sequence destinations; one
/// value is created per result row.
pub trait Model: Default + Send + 'static {
    /// The model's declared shape. Called once per process per model type;
    /// the registry caches the resolved result.
    fn shape() -> Shape;
}

/// How a field's logical column key is derived.
pub(crate) enum FieldKey {
    /// The declared field name, lowercased at resolution.
    Declared(&'static str),
    /// An explicit key, used as-is.
    Explicit(&'static str),
    /// Excluded from binding and mapping entirely.
    Skip(#[allow(dead_code)] &'static str),
}

pub(crate) type LeafGet = Box<dyn Fn(&dyn Any) -> Result<RowValues, AccessError> + Send + Sync>;
pub(crate) type LeafSet =
    Box<dyn Fn(&mut dyn Any, RowValues) -> Result<(), AccessError> + Send + Sync>;

/// Projection from a model value to one of its embedded child values.
pub(crate) trait Project: Send + Sync {
    fn project<'v>(&self, model: &'v dyn Any) -> Result<&'v dyn Any, AccessError>;
    fn project_mut<'v>(&self, model: &'v mut dyn Any) -> Result<&'v mut dyn Any, AccessError>;
}

struct FieldProjector<M, C> {
    project: fn(&M) -> &C,
    project_mut: fn(&mut M) -> &mut C,
}

impl<M: 'static, C: 'static> Project for FieldProjector<M, C> {
    fn project<'v>(&self, model: &'v dyn Any) -> Result<&'v dyn Any, AccessError> {
        Ok((self.project)(downcast_ref::<M>(model)?))
    }

    fn project_mut<'v>(&self, model: &'v mut dyn Any) -> Result<&'v mut dyn Any, AccessError> {
        Ok((self.project_mut)(downcast_mut::<M>(model)?))
    }
}

pub(crate) enum FieldNode {
    Leaf {
        get: LeafGet,
        set: LeafSet,
    },
    Embedded {
        projector: Box<dyn Project>,
        shape: Shape,
    },
    /// Declared but excluded; never resolved into a path.
    Skipped,
}

pub(crate) struct FieldDescriptor {
    pub(crate) key: FieldKey,
    pub(crate) node: FieldNode,
}

/// The declared shape of a model: an ordered tree of field descriptors.
pub struct Shape {
    pub(crate) type_name: &'static str,
    pub(crate) fields: Vec<FieldDescriptor>,
}

impl Shape {
    /// Start declaring the shape of `M`.
    #[must_use]
    pub fn builder<M: 'static>() -> ShapeBuilder<M> {
        ShapeBuilder {
            shape: Shape {
                type_name: type_name::<M>(),
                fields: Vec::new(),
            },
            _model: std::marker::PhantomData,
        }
    }
}

/// Builder for a model [`Shape`]. Fields are declared in struct order; the
/// declaration order defines the field paths.
pub struct ShapeBuilder<M> {
    shape: Shape,
    _model: std::marker::PhantomData<fn(M)>,
}

impl<M: 'static> ShapeBuilder<M> {
    /// Declare a leaf field keyed by its lowercased declared name.
    #[must_use]
    pub fn field(
        self,
        name: &'static str,
        get: fn(&M) -> RowValues,
        set: fn(&mut M, RowValues) -> Result<(), AccessError>,
    ) -> Self {
        self.leaf(FieldKey::Declared(name), get, set)
    }

    /// Declare a leaf field with an explicit key.
    #[must_use]
    pub fn field_as(
        self,
        key: &'static str,
        get: fn(&M) -> RowValues,
        set: fn(&mut M, RowValues) -> Result<(), AccessError>,
    ) -> Self {
        self.leaf(FieldKey::Explicit(key), get, set)
    }

    /// Declare a field excluded from binding and mapping.
    #[must_use]
    pub fn skip(mut self, name: &'static str) -> Self {
        self.shape.fields.push(FieldDescriptor {
            key: FieldKey::Skip(name),
            node: FieldNode::Skipped,
        });
        self
    }

    /// Declare an embedded child shape; its keys are dot-qualified under
    /// this field's name.
    #[must_use]
    pub fn embed<C: Model>(
        self,
        name: &'static str,
        project: fn(&M) -> &C,
        project_mut: fn(&mut M) -> &mut C,
    ) -> Self {
        self.embedded(FieldKey::Declared(name), project, project_mut)
    }

    /// Declare an embedded child shape with an explicit key prefix.
    #[must_use]
    pub fn embed_as<C: Model>(
        self,
        key: &'static str,
        project: fn(&M) -> &C,
        project_mut: fn(&mut M) -> &mut C,
    ) -> Self {
        self.embedded(FieldKey::Explicit(key), project, project_mut)
    }

    /// Finish the declaration.
    #[must_use]
    pub fn finish(self) -> Shape {
        self.shape
    }

    fn leaf(
        mut self,
        key: FieldKey,
        get: fn(&M) -> RowValues,
        set: fn(&mut M, RowValues) -> Result<(), AccessError>,
    ) -> Self {
        self.shape.fields.push(FieldDescriptor {
            key,
            node: FieldNode::Leaf {
                get: Box::new(move |model| Ok(get(downcast_ref::<M>(model)?))),
                set: Box::new(move |model, value| set(downcast_mut::<M>(model)?, value)),
            },
        });
        self
    }

    fn embedded<C: Model>(
        mut self,
        key: FieldKey,
        project: fn(&M) -> &C,
        project_mut: fn(&mut M) -> &mut C,
    ) -> Self {
        self.shape.fields.push(FieldDescriptor {
            key,
            node: FieldNode::Embedded {
                projector: Box::new(FieldProjector {
                    project,
                    project_mut,
                }),
                shape: C::shape(),
            },
        });
        self
    }
}

/// Write a converted value into a field slot. Setter closures delegate
/// here; `Null` resets the slot to its zero value.
///
/// # Errors
/// Returns [`AccessError::Incompatible`] when the value cannot be
/// converted to the slot's type.
pub fn assign<T: FromRowValue>(slot: &mut T, value: RowValues) -> Result<(), AccessError> {
    *slot = T::from_row_value(value)?;
    Ok(())
}

pub(crate) fn downcast_ref<M: 'static>(value: &dyn Any) -> Result<&M, AccessError> {
    value.downcast_ref::<M>().ok_or(AccessError::ShapeMismatch {
        expected: type_name::<M>(),
    })
}

pub(crate) fn downcast_mut<M: 'static>(value: &mut dyn Any) -> Result<&mut M, AccessError> {
    value.downcast_mut::<M>().ok_or(AccessError::ShapeMismatch {
        expected: type_name::<M>(),
    })
}

/// Implements [`Model`] for a struct by listing its bindable fields.
///
/// Entries, separated by commas:
/// - `name`: leaf field, keyed by the field's name
/// - `name as "key"`: leaf field with an explicit key
/// - `skip name`: excluded field
/// - `embed name: ChildType`: embedded child model, keys dot-qualified
///
/// Field types must convert through [`RowValues`] (see
/// [`FromRowValue`](crate::FromRowValue)); embedded types must themselves
/// implement [`Model`].
#[macro_export]
macro_rules! pg_model {
    ($model:ident { $($body:tt)* }) => {
        impl $crate::Model for $model {
            fn shape() -> $crate::model::Shape {
                $crate::pg_model!(@munch $model,
                    $crate::model::Shape::builder::<$model>(),
                    $($body)*)
            }
        }
    };

    (@munch $model:ident, $builder:expr $(,)?) => {
        $builder.finish()
    };

    (@munch $model:ident, $builder:expr, skip $field:ident $(, $($rest:tt)*)?) => {
        $crate::pg_model!(@munch $model,
            $builder.skip(stringify!($field)),
            $($($rest)*)?)
    };

    (@munch $model:ident, $builder:expr, embed $field:ident: $child:ty $(, $($rest:tt)*)?) => {
        $crate::pg_model!(@munch $model,
            $builder.embed::<$child>(
                stringify!($field),
                |m: &$model| &m.$field,
                |m: &mut $model| &mut m.$field,
            ),
            $($($rest)*)?)
    };

    (@munch $model:ident, $builder:expr, $field:ident as $key:literal $(, $($rest:tt)*)?) => {
        $crate::pg_model!(@munch $model,
            $builder.field_as(
                $key,
                |m: &$model| $crate::RowValues::from(m.$field.clone()),
                |m: &mut $model, value| $crate::model::assign(&mut m.$field, value),
            ),
            $($($rest)*)?)
    };

    (@munch $model:ident, $builder:expr, $field:ident $(, $($rest:tt)*)?) => {
        $crate::pg_model!(@munch $model,
            $builder.field(
                stringify!($field),
                |m: &$model| $crate::RowValues::from(m.$field.clone()),
                |m: &mut $model, value| $crate::model::assign(&mut m.$field, value),
            ),
            $($($rest)*)?)
    };
}
