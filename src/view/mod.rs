// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

pub mod editable_cell;
pub mod table;

pub use editable_cell::EditableValueCell;
pub use table::{build_view, render_plain, TableView, TypeCase};
