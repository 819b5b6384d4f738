// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

pub mod rates_client;

pub use rates_client::{RateSource, RatesClient, DEFAULT_ENDPOINT};

#[cfg(test)]
pub use rates_client::MockRateSource;
