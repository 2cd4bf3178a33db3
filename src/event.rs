//! Inbound change events
//!
//! Only fact sheet updates on capabilities are actionable; everything else the
//! webhook delivers is ignored.

use crate::query::CAPABILITY_TYPE;
use serde::Deserialize;

/// Event type that signals a change in the capability hierarchy.
pub const FACT_SHEET_UPDATED: &str = "FactSheetUpdatedEvent";

/// Webhook body, read leniently: every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,

    #[serde(rename = "transactionSequenceNumber", default)]
    pub transaction_sequence_number: Option<i64>,

    #[serde(rename = "factSheet", default)]
    pub fact_sheet: Option<EventSubject>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EventSubject {
    #[serde(rename = "type", default)]
    pub subject_type: Option<String>,
}

impl ChangeEvent {
    pub fn capability_update(transaction: i64) -> Self {
        Self {
            event_type: Some(FACT_SHEET_UPDATED.to_string()),
            transaction_sequence_number: Some(transaction),
            fact_sheet: Some(EventSubject {
                subject_type: Some(CAPABILITY_TYPE.to_string()),
            }),
        }
    }

    /// Whether the event has the capability-update signature.
    pub fn is_capability_update(&self) -> bool {
        self.event_type.as_deref() == Some(FACT_SHEET_UPDATED)
            && self
                .fact_sheet
                .as_ref()
                .and_then(|subject| subject.subject_type.as_deref())
                == Some(CAPABILITY_TYPE)
    }

    /// Transaction number of an actionable event, `None` for anything else.
    pub fn actionable_transaction(&self) -> Option<i64> {
        if self.is_capability_update() {
            self.transaction_sequence_number
        } else {
            None
        }
    }
}
