//! Channel based sequence validation
//!
//! [`SliceRules::apply_stream`] moves every item exactly once: from the
//! input channel, through the item rules, into the output channel. Slices on
//! either side are bridged by a producer or collector task, so the
//! validation loop itself only ever sees channels.

use std::any::Any;
use std::fmt;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::SliceRules;
use crate::foundation::{Context, ValidationError, ValidationErrors};

/// A single sequence element of unknown type.
pub type Item = Box<dyn Any + Send>;

/// Where [`SliceRules::apply_stream`] reads items from.
pub enum SliceInput {
    /// A materialized sequence, fed through a producer task.
    Items(Vec<Item>),
    /// Items arrive until every sender is dropped.
    Channel(mpsc::Receiver<Item>),
}

impl SliceInput {
    /// Boxes every value of `values`.
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Any + Send,
    {
        Self::Items(values.into_iter().map(|v| Box::new(v) as Item).collect())
    }
}

impl fmt::Debug for SliceInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Items(items) => f.debug_tuple("Items").field(&items.len()).finish(),
            Self::Channel(_) => f.write_str("Channel"),
        }
    }
}

/// Where [`SliceRules::apply_stream`] writes coerced items to.
#[derive(Debug)]
pub enum SliceOutput<'a, T> {
    /// Replaced with the coerced items once the stream completes.
    Vec(&'a mut Vec<T>),
    /// Receives each coerced item as soon as it is validated.
    Channel(mpsc::Sender<T>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Complete,
    MaxLenExceeded,
    Cancelled,
    OutputClosed,
}

impl<T: Clone + Send + Sync + 'static> SliceRules<T> {
    /// Validates a stream of items, forwarding each coerced item as soon as
    /// it has been checked.
    ///
    /// Item failures are collected and never stop the stream. Receiving more
    /// than the maximum length, cancellation of the context's token, and a
    /// closed output channel stop it at once; in those cases a `Vec` output
    /// is left untouched.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use nebula_rules::prelude::*;
    ///
    /// let rules = slice::<i64>().with_item_rules(int().with_base(16));
    /// let mut out = Vec::new();
    /// let input = SliceInput::from_values(["ff", "10"]);
    /// rules
    ///     .apply_stream(&Context::new(), input, SliceOutput::Vec(&mut out))
    ///     .await?;
    /// assert_eq!(out, vec![255, 16]);
    /// ```
    pub async fn apply_stream(
        &self,
        ctx: &Context,
        input: SliceInput,
        output: SliceOutput<'_, T>,
    ) -> Result<(), ValidationErrors> {
        let token = ctx.cancellation().clone();
        let capacity = self.flags().buffer.max(1);
        tracing::debug!(capacity, rules = %self, "slice stream started");

        let (mut rx, producer) = match input {
            SliceInput::Channel(rx) => (rx, None),
            SliceInput::Items(items) => {
                let (tx, rx) = mpsc::channel(capacity);
                (rx, Some(tokio::spawn(produce(items, tx, token.clone()))))
            }
        };
        let (tx, target, collector) = match output {
            SliceOutput::Channel(tx) => (tx, None, None),
            SliceOutput::Vec(target) => {
                let (tx, rx) = mpsc::channel(capacity);
                (tx, Some(target), Some(tokio::spawn(collect(rx))))
            }
        };

        // Whole-sequence rules need the items after they have been sent on.
        let keep = self.head.has_rules();
        let mut kept = Vec::new();
        let mut errors = ValidationErrors::new();
        let mut count = 0;

        let outcome = loop {
            let item = tokio::select! {
                biased;
                () = token.cancelled() => break Outcome::Cancelled,
                item = rx.recv() => match item {
                    Some(item) => item,
                    None => break Outcome::Complete,
                },
            };
            if self.is_full(count) {
                break Outcome::MaxLenExceeded;
            }

            let item_ctx = ctx.with_index(count);
            let (value, result) = match item.downcast::<T>() {
                Ok(value) => self.check_item(&item_ctx, *value),
                Err(item) => self.coerce_item(&item_ctx, &*item),
            };
            count += 1;
            errors.absorb(result);

            let Some(value) = value else { continue };
            if keep {
                kept.push(value.clone());
            }
            let sent = tokio::select! {
                biased;
                () = token.cancelled() => break Outcome::Cancelled,
                sent = tx.send(value) => sent,
            };
            if sent.is_err() {
                errors.add(ValidationError::internal(ctx, "slice output channel closed"));
                break Outcome::OutputClosed;
            }
        };

        drop(rx);
        drop(tx);
        if let Some(producer) = producer {
            // The producer only stops early because the receiver is gone.
            let _ = producer.await;
        }
        let collected = match collector {
            Some(collector) => Some(collector.await),
            None => None,
        };

        match outcome {
            Outcome::Complete => {}
            Outcome::MaxLenExceeded => {
                tracing::debug!(received = count + 1, "slice stream exceeded max length");
                errors.add(self.max_len_error(ctx));
                return Err(errors);
            }
            Outcome::Cancelled => {
                tracing::debug!(received = count, "slice stream cancelled");
                errors.add(ValidationError::cancelled(ctx));
                return Err(errors);
            }
            Outcome::OutputClosed => return Err(errors),
        }

        if let (Some(target), Some(collected)) = (target, collected) {
            match collected {
                Ok(values) => *target = values,
                Err(e) => errors.add(ValidationError::internal(
                    ctx,
                    format!("slice collector failed: {e}"),
                )),
            }
        }

        errors.absorb(self.check_min_len(ctx, count));
        if keep {
            errors.absorb(self.head.evaluate(ctx, &kept));
        }
        tracing::debug!(received = count, errors = errors.len(), "slice stream finished");
        errors.into_result(())
    }
}

async fn produce(items: Vec<Item>, tx: mpsc::Sender<Item>, token: CancellationToken) {
    for item in items {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            sent = tx.send(item) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
}

async fn collect<T>(mut rx: mpsc::Receiver<T>) -> Vec<T> {
    let mut values = Vec::new();
    while let Some(value) = rx.recv().await {
        values.push(value);
    }
    values
}
