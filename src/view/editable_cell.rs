// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::error::CellError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellMode {
    Viewing,
    Editing { draft: f64 },
}

/// Value cell of one table row. It never touches the rate mapping itself;
/// a commit goes through the callback handed to [`EditableValueCell::commit`].
#[derive(Debug, Clone, PartialEq)]
pub struct EditableValueCell {
    currency_id: String,
    value: f64,
    mode: CellMode,
}

impl EditableValueCell {
    pub fn new(currency_id: impl Into<String>, value: f64) -> Self {
        Self {
            currency_id: currency_id.into(),
            value,
            mode: CellMode::Viewing,
        }
    }

    pub fn currency_id(&self) -> &str {
        &self.currency_id
    }

    /// Last committed value
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn mode(&self) -> CellMode {
        self.mode
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, CellMode::Editing { .. })
    }

    pub fn draft(&self) -> Option<f64> {
        match self.mode {
            CellMode::Editing { draft } => Some(draft),
            CellMode::Viewing => None,
        }
    }

    /// What the cell shows right now
    pub fn display_value(&self) -> f64 {
        self.draft().unwrap_or(self.value)
    }

    /// Picks up the value from the latest render of the mapping.
    pub fn sync(&mut self, value: f64) {
        self.value = value;
    }

    pub fn begin_edit(&mut self) {
        if let CellMode::Viewing = self.mode {
            self.mode = CellMode::Editing { draft: self.value };
        }
    }

    pub fn set_draft(&mut self, value: f64) -> Result<(), CellError> {
        match &mut self.mode {
            CellMode::Viewing => Err(CellError::NotEditing),
            CellMode::Editing { .. } if !value.is_finite() => {
                Err(CellError::InvalidNumber(value.to_string()))
            }
            CellMode::Editing { draft } => {
                *draft = value;
                Ok(())
            }
        }
    }

    /// Sets the draft from typed text, see [`parse_draft`].
    pub fn input(&mut self, text: &str) -> Result<(), CellError> {
        if !self.is_editing() {
            return Err(CellError::NotEditing);
        }
        let value = parse_draft(text)?;
        self.set_draft(value)
    }

    /// Hands the draft to `on_submit` and goes back to viewing. Returns `None`
    /// without calling `on_submit` when the cell was not being edited.
    pub fn commit<R>(&mut self, on_submit: impl FnOnce(&str, f64) -> R) -> Option<R> {
        let CellMode::Editing { draft } = self.mode else {
            return None;
        };
        self.mode = CellMode::Viewing;
        self.value = draft;
        Some(on_submit(&self.currency_id, draft))
    }

    /// Drops the draft. Returns whether there was one.
    pub fn cancel(&mut self) -> bool {
        let was_editing = self.is_editing();
        self.mode = CellMode::Viewing;
        was_editing
    }
}

/// Empty text reads as zero, like an emptied numeric form field.
pub fn parse_draft(text: &str) -> Result<f64, CellError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(CellError::InvalidNumber(trimmed.to_string())),
    }
}

pub fn format_value(value: f64) -> String {
    format!("{}", value)
}
