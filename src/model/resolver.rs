use std::collections::HashMap;

use crate::error::AccessError;

use super::{FieldKey, FieldNode, Shape};

/// Ordered descriptor offsets locating a leaf field inside a shape tree.
pub(crate) type FieldPath = Vec<usize>;

/// Embedding levels beyond this fail resolution instead of recursing.
pub(crate) const MAX_EMBED_DEPTH: usize = 16;

/// Flatten a shape tree into logical column key → field path.
///
/// Skipped fields are excluded, declared names are lowercased, explicit
/// keys are used as-is, and embedded shapes contribute dot-qualified keys.
/// Colliding keys are not deduplicated; the later declaration wins.
pub(crate) fn resolve_paths(shape: &Shape) -> Result<HashMap<String, FieldPath>, AccessError> {
    let mut paths = HashMap::new();
    walk(shape, "", &[], 0, &mut paths)?;
    Ok(paths)
}

fn walk(
    shape: &Shape,
    base_key: &str,
    base_path: &[usize],
    depth: usize,
    out: &mut HashMap<String, FieldPath>,
) -> Result<(), AccessError> {
    if depth > MAX_EMBED_DEPTH {
        return Err(AccessError::TooDeep {
            limit: MAX_EMBED_DEPTH,
        });
    }

    for (idx, field) in shape.fields.iter().enumerate() {
        let key = match &field.key {
            FieldKey::Skip(_) => continue,
            FieldKey::Declared(name) => name.to_ascii_lowercase(),
            FieldKey::Explicit(key) => (*key).to_string(),
        };
        let full_key = if base_key.is_empty() {
            key
        } else {
            format!("{base_key}.{key}")
        };

        let mut path = base_path.to_vec();
        path.push(idx);

        match &field.node {
            FieldNode::Leaf { .. } => {
                out.insert(full_key, path);
            }
            FieldNode::Embedded { shape: child, .. } => {
                walk(child, &full_key, &path, depth + 1, out)?;
            }
            FieldNode::Skipped => {}
        }
    }

    Ok(())
}
