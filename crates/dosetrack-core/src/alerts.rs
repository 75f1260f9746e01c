//! Low-stock alerting.

use crate::models::{Inventory, Medicine};

/// Collaborator invoked when a stock decrement lands at or below the alert
/// threshold.
///
/// Implementations are best-effort: they receive a post-decrement snapshot,
/// handle their own failures, and must never surface errors to the dose-log
/// caller.
pub trait LowStockNotifier: Send + Sync {
    fn notify(&self, medicine: &Medicine);
}

/// Default notifier: emits a structured warning for the host to forward to
/// its push channel.
pub struct LogAlertNotifier;

impl LowStockNotifier for LogAlertNotifier {
    fn notify(&self, medicine: &Medicine) {
        if let Inventory::Stock {
            on_hand,
            low_stock_threshold,
        } = medicine.inventory
        {
            tracing::warn!(
                "LOW_STOCK_ALERT: medicine '{}' ({}) is low on stock: current {}, threshold {}",
                medicine.name,
                medicine.medicine_id,
                on_hand,
                low_stock_threshold
            );
        }
    }
}
