#![forbid(unsafe_code)]

use super::Category;

/// Finds the first category matching `matches` (depth-first, parent before
/// children, siblings in order) and hands its sibling list and index to `edit`.
///
/// Passing the sibling list rather than the node lets the same walk serve
/// in-place edits and removals. Returns `None` when nothing matched; `edit` is
/// then never called.
pub(super) fn edit_first<P, E, R>(siblings: &mut Vec<Category>, matches: P, edit: E) -> Option<R>
where
    P: Fn(&Category) -> bool,
    E: FnOnce(&mut Vec<Category>, usize) -> R,
{
    let mut edit = Some(edit);
    edit_first_in(siblings, &matches, &mut edit)
}

fn edit_first_in<P, E, R>(
    siblings: &mut Vec<Category>,
    matches: &P,
    edit: &mut Option<E>,
) -> Option<R>
where
    P: Fn(&Category) -> bool,
    E: FnOnce(&mut Vec<Category>, usize) -> R,
{
    for index in 0..siblings.len() {
        if matches(&siblings[index]) {
            let edit = edit.take()?;
            return Some(edit(siblings, index));
        }
        if let Some(out) = edit_first_in(&mut siblings[index].sub, matches, edit) {
            return Some(out);
        }
    }
    None
}

/// Visits every category in preorder, mutably.
pub(super) fn for_each_mut(siblings: &mut [Category], visit: &mut impl FnMut(&mut Category)) {
    for category in siblings.iter_mut() {
        visit(category);
        for_each_mut(&mut category.sub, visit);
    }
}
