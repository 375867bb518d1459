use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{required, ValidationError};
use crate::status::{StatusBadge, StatusDisplay, Tone};

/// Single-segment SMS limit.
pub const MAX_SMS_BODY_CHARS: usize = 160;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
}

impl MessageStatus {
    pub const ALL: [MessageStatus; 4] = [
        MessageStatus::Delivered,
        MessageStatus::Sent,
        MessageStatus::Pending,
        MessageStatus::Failed,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, MessageStatus::Delivered | MessageStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StatusDisplay for MessageStatus {
    fn badge(&self) -> StatusBadge {
        match self {
            MessageStatus::Pending => StatusBadge::new("Pending", Tone::Warning),
            MessageStatus::Sent => StatusBadge::new("Sent", Tone::Primary),
            MessageStatus::Delivered => StatusBadge::new("Delivered", Tone::Success),
            MessageStatus::Failed => StatusBadge::new("Failed", Tone::Destructive),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Carrier {
    Vivo,
    Claro,
    #[serde(rename = "TIM")]
    Tim,
    Oi,
}

impl Carrier {
    pub const ALL: [Carrier; 4] = [Carrier::Vivo, Carrier::Claro, Carrier::Tim, Carrier::Oi];

    pub fn as_str(self) -> &'static str {
        match self {
            Carrier::Vivo => "Vivo",
            Carrier::Claro => "Claro",
            Carrier::Tim => "TIM",
            Carrier::Oi => "Oi",
        }
    }
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SmsMessage {
    pub message_id: String,
    pub from: String,
    pub to: String,
    pub body: String,
    pub send_status: MessageStatus,
    pub send_timestamp: DateTime<Utc>,
    pub delivery_confirmation: bool,
    pub carrier_info: Carrier,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Falls back to the gateway's configured sender.
    pub from: Option<String>,
    pub to: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub from: Option<String>,
    pub to: String,
    pub body: String,
}

impl SendMessageRequest {
    pub fn validate(self) -> Result<NewMessage, ValidationError> {
        let to = required("to", self.to.as_deref())?.to_string();
        let body = required("body", self.body.as_deref())?.to_string();

        let length = body.chars().count();
        if length > MAX_SMS_BODY_CHARS {
            return Err(ValidationError::TooLong {
                field: "body",
                max: MAX_SMS_BODY_CHARS,
                actual: length,
            });
        }

        let from = self
            .from
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Ok(NewMessage { from, to, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(body: &str) -> SendMessageRequest {
        SendMessageRequest {
            from: None,
            to: Some("+55 11 90000-0000".to_string()),
            body: Some(body.to_string()),
        }
    }

    #[test]
    fn body_at_limit_is_accepted() {
        let body = "a".repeat(MAX_SMS_BODY_CHARS);
        let draft = request(&body).validate().expect("valid");
        assert_eq!(draft.body.len(), MAX_SMS_BODY_CHARS);
        assert_eq!(draft.from, None);
    }

    #[test]
    fn body_over_limit_is_rejected() {
        let body = "a".repeat(MAX_SMS_BODY_CHARS + 1);
        assert_eq!(
            request(&body).validate(),
            Err(ValidationError::TooLong {
                field: "body",
                max: 160,
                actual: 161
            })
        );
    }

    #[test]
    fn limit_counts_characters_not_bytes() {
        let body = "ç".repeat(MAX_SMS_BODY_CHARS);
        assert!(request(&body).validate().is_ok());
    }

    #[test]
    fn blank_recipient_is_missing() {
        let mut req = request("Test");
        req.to = Some("   ".to_string());
        assert_eq!(req.validate(), Err(ValidationError::MissingField("to")));
    }

    #[test]
    fn carrier_wire_name_is_upper_case_tim() {
        assert_eq!(serde_json::to_value(Carrier::Tim).expect("serialize"), "TIM");
    }

    #[test]
    fn delivered_and_failed_are_terminal() {
        let terminal: Vec<_> = MessageStatus::ALL
            .into_iter()
            .filter(|status| status.is_terminal())
            .collect();
        assert_eq!(terminal, vec![MessageStatus::Delivered, MessageStatus::Failed]);
    }
}
