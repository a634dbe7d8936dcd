use super::{BoardError, FieldDef};

/// Outcome of picking a grouping field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelection {
    /// A field was picked without asking the user.
    Selected(FieldDef),
    /// Several single-select fields qualify; the user has to choose.
    Choose(Vec<FieldDef>),
}

/// Pick the field to group the board by.
///
/// Rules, first match wins:
/// 1. a single-select field named "Status" (any case),
/// 2. the only single-select field,
/// 3. otherwise every single-select field is offered, in input order.
pub fn select_group_field(fields: &[FieldDef]) -> Result<FieldSelection, BoardError> {
    let candidates: Vec<&FieldDef> = fields.iter().filter(|f| f.is_single_select()).collect();

    if candidates.is_empty() {
        return Err(BoardError::NoSelectableFields);
    }

    if let Some(status) = candidates.iter().find(|f| f.name.eq_ignore_ascii_case("status")) {
        return Ok(FieldSelection::Selected((*status).clone()));
    }

    if let [only] = candidates.as_slice() {
        return Ok(FieldSelection::Selected((*only).clone()));
    }

    Ok(FieldSelection::Choose(candidates.into_iter().cloned().collect()))
}

/// Single-select fields only, in input order. Used when the user asks to
/// regroup an already loaded board.
pub fn selectable_fields(fields: &[FieldDef]) -> Vec<FieldDef> {
    fields.iter().filter(|f| f.is_single_select()).cloned().collect()
}
