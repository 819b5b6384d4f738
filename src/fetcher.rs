// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Owner of the rate mapping.
//!
//! [`RateFetcher`] runs one cancellable request per lifecycle ("mount") on the
//! tokio runtime and hands the settlement back to whoever drives the UI loop
//! through [`RateFetcher::poll_settled`] or [`RateFetcher::settled`]. The
//! mapping is only ever written here: by a settlement of the live lifecycle or
//! by [`RateFetcher::update_currency_rate`].

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::api::RateSource;
use crate::error::{FetchError, UpdateError};
use crate::models::CurrencyRateResponse;

/// Fires the cancellation of one lifecycle
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observes the cancellation of one lifecycle
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    /// Idempotent, and fine to call after the request already settled.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CancelToken {
    /// A dropped handle counts as cancelled: nobody is left to receive the result.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// What the table view reads
#[derive(Debug, Default)]
pub struct FetchState {
    pub data: Option<CurrencyRateResponse>,
    pub error: Option<FetchError>,
}

#[derive(Debug)]
struct Settlement {
    generation: u64,
    outcome: Result<CurrencyRateResponse, FetchError>,
}

struct Lifecycle {
    generation: u64,
    cancel: CancelHandle,
    token: CancelToken,
}

pub struct RateFetcher {
    source: Arc<dyn RateSource>,
    state: FetchState,
    generation: u64,
    lifecycle: Option<Lifecycle>,
    pending: bool,
    tx: mpsc::UnboundedSender<Settlement>,
    rx: mpsc::UnboundedReceiver<Settlement>,
}

impl RateFetcher {
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            state: FetchState::default(),
            generation: 0,
            lifecycle: None,
            pending: false,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    pub fn data(&self) -> Option<&CurrencyRateResponse> {
        self.state.data.as_ref()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.state.error.as_ref()
    }

    /// True while the live lifecycle has not settled yet
    pub fn is_in_flight(&self) -> bool {
        self.pending
    }

    /// Starts a fetch cycle. Any outstanding lifecycle is cancelled first, so
    /// a slow, superseded response can never overwrite fresher state.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(&mut self) {
        if let Some(previous) = self.lifecycle.take() {
            debug!(generation = previous.generation, "cancelling superseded fetch");
            previous.cancel.cancel();
        }

        self.state.error = None;
        self.generation += 1;
        let generation = self.generation;

        let (cancel, token) = cancel_pair();
        let mut task_token = token.clone();
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = task_token.cancelled() => Err(FetchError::Cancelled),
                outcome = source.fetch_rates() => outcome,
            };

            if task_token.is_cancelled() || matches!(&outcome, Err(e) if e.is_cancelled()) {
                debug!(generation, "fetch cancelled, dropping result");
                return;
            }

            // The receiver lives as long as the fetcher; a failed send means it is gone.
            let _ = tx.send(Settlement { generation, outcome });
        });

        info!(generation, "fetch started");
        self.pending = true;
        self.lifecycle = Some(Lifecycle {
            generation,
            cancel,
            token,
        });
    }

    /// Cancels the live lifecycle, whether or not it already settled.
    pub fn unmount(&mut self) {
        if let Some(lifecycle) = self.lifecycle.take() {
            debug!(generation = lifecycle.generation, "unmounting fetch");
            lifecycle.cancel.cancel();
        }
        self.pending = false;
    }

    /// Applies every settlement that has already arrived. Returns whether the
    /// state changed.
    pub fn poll_settled(&mut self) -> bool {
        let mut changed = false;
        while let Ok(settlement) = self.rx.try_recv() {
            changed |= self.apply(settlement);
        }
        changed
    }

    /// Waits for the next settlement and applies it. Returns whether the state
    /// changed; a discarded settlement returns `false`.
    pub async fn settled(&mut self) -> bool {
        match self.rx.recv().await {
            Some(settlement) => self.apply(settlement),
            None => false,
        }
    }

    fn apply(&mut self, settlement: Settlement) -> bool {
        let live = self.lifecycle.as_ref().map_or(false, |lifecycle| {
            lifecycle.generation == settlement.generation && !lifecycle.token.is_cancelled()
        });
        if !live {
            debug!(generation = settlement.generation, "discarding stale settlement");
            return false;
        }

        self.pending = false;
        match settlement.outcome {
            Ok(response) => {
                info!(count = response.rates.len(), "exchange rates loaded");
                self.state.data = Some(response);
            }
            Err(e) if e.is_cancelled() => return false,
            Err(e) => {
                warn!("failed to fetch exchange rates: {}", e);
                self.state.error = Some(e);
            }
        }
        true
    }

    /// Replaces the value of one entry. Unknown ids are reported and leave the
    /// mapping untouched.
    pub fn update_currency_rate(&mut self, currency_id: &str, value: f64) -> Result<(), UpdateError> {
        if !value.is_finite() {
            return Err(UpdateError::NonFiniteValue(value));
        }

        let rate = self
            .state
            .data
            .as_mut()
            .and_then(|data| data.rates.get_mut(currency_id))
            .ok_or_else(|| UpdateError::UnknownCurrency(currency_id.to_string()))?;

        debug!(currency_id, old = rate.value, new = value, "updating rate");
        rate.value = value;
        Ok(())
    }
}

impl Drop for RateFetcher {
    fn drop(&mut self) {
        self.unmount();
    }
}
