// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use serde::{Deserialize, Serialize};

use crate::fetcher::FetchState;
use crate::models::{CurrencyRate, CurrencyRateResponse};
use crate::view::editable_cell::format_value;

pub const HEADING: &str = "Currency rates";
pub const LOADING_TEXT: &str = "Loading...";
pub const HEADER: [&str; 4] = ["Name", "Unit", "Value", "Type"];

/// How the type column is written. Purely cosmetic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TypeCase {
    Verbatim,
    #[default]
    Sentence,
}

impl TypeCase {
    pub fn apply(&self, text: &str) -> String {
        match self {
            TypeCase::Verbatim => text.to_string(),
            TypeCase::Sentence => to_sentence_case(text),
        }
    }
}

pub fn to_sentence_case(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One rendered row, keyed by currency id
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub value: String,
    pub kind: String,
}

impl RowView {
    pub fn new(id: &str, rate: &CurrencyRate, case: TypeCase) -> Self {
        Self {
            id: id.to_string(),
            name: rate.name.clone(),
            unit: rate.unit.clone(),
            value: format_value(rate.value),
            kind: case.apply(rate.kind.as_str()),
        }
    }

    pub fn cells(&self) -> [&str; 4] {
        [&self.name, &self.unit, &self.value, &self.kind]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableView {
    Error(String),
    Loading,
    Table(Vec<RowView>),
}

/// Error wins over data, data wins over the loading placeholder.
pub fn build_view(state: &FetchState, case: TypeCase) -> TableView {
    if let Some(error) = &state.error {
        return TableView::Error(error.to_string());
    }
    match &state.data {
        Some(data) => TableView::Table(rows(data, case)),
        None => TableView::Loading,
    }
}

pub fn rows(data: &CurrencyRateResponse, case: TypeCase) -> Vec<RowView> {
    data.rates
        .iter()
        .map(|(id, rate)| RowView::new(id, rate, case))
        .collect()
}

/// Text rendering for non-interactive output
pub fn render_plain(view: &TableView) -> String {
    let mut out = format!("{}\n\n", HEADING);
    match view {
        TableView::Error(message) => {
            out.push_str(message);
            out.push('\n');
        }
        TableView::Loading => {
            out.push_str(LOADING_TEXT);
            out.push('\n');
        }
        TableView::Table(rows) => {
            let mut widths = HEADER.map(|h| h.chars().count());
            for row in rows {
                for (width, cell) in widths.iter_mut().zip(row.cells()) {
                    *width = (*width).max(cell.chars().count());
                }
            }

            let line = |cells: [&str; 4]| -> String {
                let padded: Vec<String> = cells
                    .iter()
                    .zip(widths.iter())
                    .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                    .collect();
                padded.join(" | ").trim_end().to_string()
            };

            out.push_str(&line(HEADER));
            out.push('\n');
            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            out.push_str(&rule.join("-+-"));
            out.push('\n');
            for row in rows {
                out.push_str(&line(row.cells()));
                out.push('\n');
            }
        }
    }
    out
}
