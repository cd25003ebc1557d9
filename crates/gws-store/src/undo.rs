//! Inverting a mutation record against current state

use gws_artifact::{Mutation, MutationOperation, PathError};
use serde_json::Value;

/// Why a mutation could not be inverted
#[derive(Debug, thiserror::Error)]
pub enum UndoError {
    /// Legacy record without a prior value
    #[error("mutation {0} has no previous value")]
    NotInvertible(String),

    /// Prior value and recorded indices disagree
    #[error("mutation {0} records {1} removed indices but {2} removed values")]
    IndexMismatch(String, usize, usize),

    /// State no longer has the shape the mutation touched
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Write a mutation's prior value back into `state`
///
/// - `remove_item` reinserts what was removed, at the recorded positions
/// - every other operation overwrites the mutated path with the prior value
pub(crate) fn invert(mutation: &Mutation, state: &mut Value) -> Result<(), UndoError> {
    let previous = mutation
        .previous_value
        .clone()
        .ok_or_else(|| UndoError::NotInvertible(mutation.id.to_string()))?;

    match mutation.operation {
        MutationOperation::RemoveItem => match mutation.removed_indices() {
            Some(indices) => {
                let removed = match previous {
                    Value::Array(items) => items,
                    other => vec![other],
                };
                if removed.len() != indices.len() {
                    return Err(UndoError::IndexMismatch(
                        mutation.id.to_string(),
                        indices.len(),
                        removed.len(),
                    ));
                }
                for (index, item) in indices.into_iter().zip(removed) {
                    mutation.path.child(index).insert(state, item)?;
                }
            }
            None => mutation.path.insert(state, previous)?,
        },
        _ => {
            mutation.path.set(state, previous)?;
        }
    }
    Ok(())
}
