//! Annotated-SQL template compiler.
//!
//! Templates name their parameters instead of numbering them: `@key` pulls
//! a value from the bound model by logical column key, `#key` pulls it from
//! the explicit argument map. Compilation rewrites every occurrence into a
//! positional `$N` placeholder and records one binding instruction per
//! occurrence, in first-occurrence order.

mod scanner;

use scanner::{is_key_char, sigil_source};

use crate::error::TemplateError;

/// Where a bound value comes from at execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingSource {
    /// `@key`: resolved through the model's field accessors.
    Model,
    /// `#key`: resolved through the caller-supplied argument map.
    Argument,
}

/// One placeholder occurrence, in template order.
///
/// The position of an instruction in the list is its positional parameter
/// index: the first instruction binds `$1`, the second `$2`, and so on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingInstruction {
    pub key: String,
    pub source: BindingSource,
}

/// A compiled template: rewritten positional SQL plus its ordered binding
/// instructions. Immutable once built; shared read-only across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSql {
    sql: String,
    bindings: Vec<BindingInstruction>,
}

impl CompiledSql {
    /// The rewritten SQL with `$1..$N` placeholders.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Binding instructions in placeholder order.
    #[must_use]
    pub fn bindings(&self) -> &[BindingInstruction] {
        &self.bindings
    }
}

enum State {
    Normal,
    Collecting {
        sigil_offset: usize,
        source: BindingSource,
        key: String,
    },
}

/// Compile an annotated template.
///
/// Keys are ASCII letters and end at the first non-letter character or the
/// end of the template; the terminator itself stays in the output. Repeated
/// use of the same key produces one placeholder and one instruction per
/// occurrence.
///
/// ```rust
/// use pgbind::template::{BindingSource, compile};
///
/// let compiled = compile("INSERT INTO t VALUES (@name, @password, #id)").unwrap();
/// assert_eq!(compiled.sql(), "INSERT INTO t VALUES ($1, $2, $3)");
/// assert_eq!(compiled.bindings()[2].source, BindingSource::Argument);
/// ```
///
/// # Errors
/// [`TemplateError::EmptyKey`] for a sigil with no letters after it;
/// [`TemplateError::InvalidKey`] for a sigil inside a key still being
/// collected.
pub fn compile(template: &str) -> Result<CompiledSql, TemplateError> {
    let mut sql = String::with_capacity(template.len());
    let mut bindings: Vec<BindingInstruction> = Vec::new();
    let mut state = State::Normal;

    for (offset, ch) in template.char_indices() {
        match state {
            State::Normal => {
                if let Some(source) = sigil_source(ch) {
                    state = State::Collecting {
                        sigil_offset: offset,
                        source,
                        key: String::new(),
                    };
                } else {
                    sql.push(ch);
                }
            }
            State::Collecting {
                sigil_offset,
                source,
                ref mut key,
            } => {
                if sigil_source(ch).is_some() {
                    return Err(TemplateError::InvalidKey { offset });
                } else if is_key_char(ch) {
                    key.push(ch);
                } else {
                    let key = std::mem::take(key);
                    finish_key(&mut sql, &mut bindings, sigil_offset, source, key)?;
                    sql.push(ch);
                    state = State::Normal;
                }
            }
        }
    }

    if let State::Collecting {
        sigil_offset,
        source,
        key,
    } = state
    {
        finish_key(&mut sql, &mut bindings, sigil_offset, source, key)?;
    }

    Ok(CompiledSql { sql, bindings })
}

fn finish_key(
    sql: &mut String,
    bindings: &mut Vec<BindingInstruction>,
    sigil_offset: usize,
    source: BindingSource,
    key: String,
) -> Result<(), TemplateError> {
    if key.is_empty() {
        return Err(TemplateError::EmptyKey {
            offset: sigil_offset,
        });
    }
    bindings.push(BindingInstruction { key, source });
    sql.push('$');
    sql.push_str(&bindings.len().to_string());
    Ok(())
}
