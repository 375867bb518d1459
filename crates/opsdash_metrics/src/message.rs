use opsdash_contract::{Carrier, MessageStatus, SmsMessage};
use serde::Serialize;

use crate::format::format_percentage;
use crate::tally::{count_by, percentage, CategoryShare};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageStats {
    pub total: usize,
    pub delivered: usize,
    pub failed: usize,
    pub delivery_rate: f64,
    pub delivery_rate_label: String,
    pub by_status: Vec<CategoryShare<MessageStatus>>,
    pub by_carrier: Vec<CategoryShare<Carrier>>,
}

pub fn message_stats<M: AsRef<SmsMessage>>(messages: &[M]) -> MessageStats {
    let by_status = count_by(messages, &MessageStatus::ALL, |message| {
        message.as_ref().send_status
    });
    let count_of = |status: MessageStatus| {
        by_status
            .iter()
            .find(|share| share.category == status)
            .map_or(0, |share| share.count)
    };

    let delivered = count_of(MessageStatus::Delivered);
    let failed = count_of(MessageStatus::Failed);
    let delivery_rate = percentage(delivered, messages.len());
    MessageStats {
        total: messages.len(),
        delivered,
        failed,
        delivery_rate,
        delivery_rate_label: format_percentage(delivery_rate),
        by_carrier: count_by(messages, &Carrier::ALL, |message| message.as_ref().carrier_info),
        by_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;

    fn message(status: MessageStatus, carrier: Carrier) -> Arc<SmsMessage> {
        Arc::new(SmsMessage {
            message_id: "MSG001".to_string(),
            from: "+55 11 98765-4321".to_string(),
            to: "+55 11 91234-5678".to_string(),
            body: "Test".to_string(),
            send_status: status,
            send_timestamp: Utc::now(),
            delivery_confirmation: status == MessageStatus::Delivered,
            carrier_info: carrier,
        })
    }

    #[test]
    fn delivery_rate_and_carriers() {
        let messages = vec![
            message(MessageStatus::Delivered, Carrier::Vivo),
            message(MessageStatus::Delivered, Carrier::Claro),
            message(MessageStatus::Sent, Carrier::Tim),
            message(MessageStatus::Failed, Carrier::Oi),
            message(MessageStatus::Pending, Carrier::Vivo),
        ];
        let stats = message_stats(&messages);

        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.delivery_rate, 40.0);
        assert_eq!(stats.delivery_rate_label, "40.0%");
        assert_eq!(stats.by_carrier[0].count, 2);
        assert_eq!(stats.by_carrier[0].percentage, 40.0);

        let sum: f64 = stats.by_status.iter().map(|share| share.percentage).sum();
        assert!((sum - 100.0).abs() < 0.25);
    }

    #[test]
    fn empty_gateway_has_defined_rate() {
        let stats = message_stats::<Arc<SmsMessage>>(&[]);
        assert_eq!(stats.delivery_rate, 0.0);
        assert_eq!(stats.total, 0);
    }
}
