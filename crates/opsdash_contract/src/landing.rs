use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{required, ValidationError};
use crate::status::{StatusBadge, StatusDisplay, Tone};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Active,
    Inactive,
    Expired,
}

impl PageStatus {
    pub const ALL: [PageStatus; 3] = [PageStatus::Active, PageStatus::Inactive, PageStatus::Expired];

    pub fn as_str(self) -> &'static str {
        match self {
            PageStatus::Active => "active",
            PageStatus::Inactive => "inactive",
            PageStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StatusDisplay for PageStatus {
    fn badge(&self) -> StatusBadge {
        match self {
            PageStatus::Active => StatusBadge::new("Active", Tone::Success),
            PageStatus::Inactive => StatusBadge::new("Inactive", Tone::Warning),
            PageStatus::Expired => StatusBadge::new("Expired", Tone::Destructive),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LandingPage {
    pub page_id: String,
    pub url: String,
    pub template_id: String,
    pub status: PageStatus,
    pub access_count: u64,
    pub last_access: Option<DateTime<Utc>>,
    pub expiration_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePageRequest {
    pub url: Option<String>,
    pub template_id: Option<String>,
    pub expiration_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPage {
    pub url: String,
    pub template_id: String,
    pub expiration_date: Option<NaiveDate>,
}

impl CreatePageRequest {
    pub fn validate(self) -> Result<NewPage, ValidationError> {
        let url = required("url", self.url.as_deref())?;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ValidationError::Invalid {
                field: "url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        let template_id = required("template_id", self.template_id.as_deref())?;

        Ok(NewPage {
            url: url.to_string(),
            template_id: template_id.to_string(),
            expiration_date: self.expiration_date,
        })
    }
}
