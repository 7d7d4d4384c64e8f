//! C3 linearization (§4.3, GLOSSARY).
//!
//! Grounded in the teacher's `Class::can_assign` superclass walk
//! (`sources/runtime/src/object/builtins.rs`), generalized from single
//! inheritance to the standard multiple-inheritance C3 merge.

use crate::error::RuntimeFault;

/// Merge `self`'s name with the MRO of each parent and the parent list
/// itself, using the standard C3 algorithm.
///
/// `parent_mros` must be in declaration order and line up with
/// `parent_names`. Returns the computed MRO (self first, most distant
/// ancestor last) or `InheritanceConflict` if no linearization exists.
pub fn c3_linearize(
    self_qualified_name: &str,
    parent_names: &[String],
    parent_mros: &[Vec<String>],
) -> Result<Vec<String>, RuntimeFault> {
    if parent_names.is_empty() {
        return Ok(vec![self_qualified_name.to_string()]);
    }

    let mut sequences: Vec<Vec<String>> = parent_mros.to_vec();
    sequences.push(parent_names.to_vec());

    let mut result = vec![self_qualified_name.to_string()];

    loop {
        sequences.retain(|seq| !seq.is_empty());
        if sequences.is_empty() {
            break;
        }

        let head = sequences.iter().find_map(|candidate| {
            let head = candidate.first()?;
            let appears_in_tail = sequences
                .iter()
                .any(|seq| seq.iter().skip(1).any(|x| x == head));
            if appears_in_tail {
                None
            } else {
                Some(head.clone())
            }
        });

        let Some(head) = head else {
            return Err(RuntimeFault::InheritanceConflict(
                self_qualified_name.to_string(),
            ));
        };

        result.push(head.clone());
        for seq in sequences.iter_mut() {
            if seq.first() == Some(&head) {
                seq.remove(0);
            }
        }
    }

    Ok(result)
}
