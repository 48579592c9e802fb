use serde::Serialize;

pub const EMPTY_PLACEHOLDER: &str = "—";

/// One lesson cell: a (day, period) slot plus the section occupying it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRef {
    pub day: String,
    pub period: u8,
    pub class_id: String,
}

/// A class id denotes an empty cell when it is missing, whitespace-only, or
/// the placeholder glyph the grid uses for "no class".
pub fn is_empty_class(class_id: Option<&str>, placeholder: &str) -> bool {
    match class_id.map(str::trim) {
        None => true,
        Some(s) => s.is_empty() || s == placeholder.trim() || s == EMPTY_PLACEHOLDER,
    }
}

/// Cells pending a bulk edit, in the order they were picked.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    cells: Vec<CellRef>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership of the cell. Empty cells are ignored.
    /// Returns whether the selection changed.
    pub fn toggle(&mut self, day: &str, period: u8, class_id: Option<&str>, placeholder: &str) -> bool {
        let Some(class_id) = class_id.filter(|c| !is_empty_class(Some(*c), placeholder)) else {
            return false;
        };
        if let Some(pos) = self
            .cells
            .iter()
            .position(|c| c.day == day && c.period == period && c.class_id == class_id)
        {
            self.cells.remove(pos);
        } else {
            self.cells.push(CellRef {
                day: day.to_string(),
                period,
                class_id: class_id.to_string(),
            });
        }
        true
    }

    pub fn contains(&self, day: &str, period: u8, class_id: &str) -> bool {
        self.cells
            .iter()
            .any(|c| c.day == day && c.period == period && c.class_id == class_id)
    }

    /// Drops every cell the predicate rejects, keeping pick order.
    /// Returns how many were dropped.
    pub fn retain<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&CellRef) -> bool,
    {
        let before = self.cells.len();
        self.cells.retain(keep);
        before - self.cells.len()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn cells(&self) -> &[CellRef] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
