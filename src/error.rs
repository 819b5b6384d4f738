// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use thiserror::Error;

/// Failures of a single fetch of the rates endpoint
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Rates request failed with status {status}")]
    Status { status: reqwest::StatusCode },

    #[error("Malformed rates response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    /// The request was superseded or its owner went away
    #[error("Request cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum UpdateError {
    #[error("Unknown currency `{0}`")]
    UnknownCurrency(String),

    #[error("Rate value {0} is not a finite number")]
    NonFiniteValue(f64),
}

#[derive(Debug, Error, PartialEq)]
pub enum CellError {
    #[error("`{0}` is not a number")]
    InvalidNumber(String),

    #[error("Value is not being edited")]
    NotEditing,
}
