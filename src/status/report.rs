//! Per-observer outcomes of a fan-out pass.

use super::ObserverId;
use crate::error::NotifyError;

/// What happened to one registration during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Failed(NotifyError),
    /// The observer was dropped by its owner without being removed.
    /// Its registration is pruned after the pass.
    Dropped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationOutcome {
    pub id: ObserverId,
    /// Observer label, `None` for dropped observers.
    pub label: Option<String>,
    pub delivery: Delivery,
}

/// Outcomes of one `notify_observers` pass, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationReport {
    outcomes: Vec<NotificationOutcome>,
}

impl NotificationReport {
    pub(crate) fn push(&mut self, outcome: NotificationOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[NotificationOutcome] {
        &self.outcomes
    }

    /// Handles of observers that were notified successfully.
    pub fn delivered(&self) -> Vec<ObserverId> {
        self.outcomes
            .iter()
            .filter(|o| o.delivery == Delivery::Delivered)
            .map(|o| o.id)
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&NotificationOutcome, &NotifyError)> {
        self.outcomes.iter().filter_map(|o| match &o.delivery {
            Delivery::Failed(err) => Some((o, err)),
            _ => None,
        })
    }

    pub fn dropped(&self) -> Vec<ObserverId> {
        self.outcomes
            .iter()
            .filter(|o| o.delivery == Delivery::Dropped)
            .map(|o| o.id)
            .collect()
    }

    /// True when every registered observer received the notification.
    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(|o| o.delivery == Delivery::Delivered)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Counts suitable for logging or export.
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            delivered: self.delivered().len(),
            failed: self.failures().count(),
            dropped: self.dropped().len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub delivered: usize,
    pub failed: usize,
    pub dropped: usize,
}
