use std::time::Duration;

use chrono::{DateTime, Utc};
use opsdash_contract::{
    Carrier, MessageStatus, NewMessage, SendMessageRequest, SmsMessage, ValidationError,
};

use crate::engine::{LifecycleResource, Placement};
use crate::identity::sequence_id;

#[derive(Debug, Clone)]
pub struct MessageSettings {
    /// From creation to `sent`.
    pub sent_after: Duration,
    /// From creation to `delivered`; must be longer than `sent_after`.
    pub delivered_after: Duration,
    pub default_sender: String,
    pub default_carrier: Carrier,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            sent_after: Duration::from_secs(2),
            delivered_after: Duration::from_secs(4),
            default_sender: "+55 11 98765-4321".to_string(),
            default_carrier: Carrier::Vivo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStage {
    Send,
    Deliver,
}

impl LifecycleResource for SmsMessage {
    type Request = SendMessageRequest;
    type Draft = NewMessage;
    type Settings = MessageSettings;
    type Stage = MessageStage;
    type Status = MessageStatus;

    const KIND: &'static str = "sms";
    const PLACEMENT: Placement = Placement::NewestFirst;

    fn id(&self) -> &str {
        &self.message_id
    }

    fn status(&self) -> MessageStatus {
        self.send_status
    }

    fn validate(request: SendMessageRequest) -> Result<NewMessage, ValidationError> {
        request.validate()
    }

    fn sequence_id(sequence: usize, _now: DateTime<Utc>) -> String {
        sequence_id("MSG", sequence)
    }

    fn build(sequence: usize, draft: NewMessage, settings: &MessageSettings, now: DateTime<Utc>) -> Self {
        SmsMessage {
            message_id: Self::sequence_id(sequence, now),
            from: draft
                .from
                .unwrap_or_else(|| settings.default_sender.clone()),
            to: draft.to,
            body: draft.body,
            send_status: MessageStatus::Pending,
            send_timestamp: now,
            delivery_confirmation: false,
            carrier_info: settings.default_carrier,
        }
    }

    fn schedule(settings: &MessageSettings) -> Vec<(Duration, MessageStage)> {
        vec![
            (settings.sent_after, MessageStage::Send),
            (settings.delivered_after, MessageStage::Deliver),
        ]
    }

    fn advance(&self, stage: MessageStage, _settings: &MessageSettings, _now: DateTime<Utc>) -> Option<Self> {
        match (stage, self.send_status) {
            (MessageStage::Send, MessageStatus::Pending) => Some(SmsMessage {
                send_status: MessageStatus::Sent,
                ..self.clone()
            }),
            (MessageStage::Deliver, MessageStatus::Sent) => Some(SmsMessage {
                send_status: MessageStatus::Delivered,
                delivery_confirmation: true,
                ..self.clone()
            }),
            _ => None,
        }
    }
}
