use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use opsdash_contract::{CreatePageRequest, LandingPage, NewPage, PageStatus, ValidationError};
use tracing::info;

use crate::engine::{ChangeKind, LifecycleEngine, LifecycleResource, Placement};
use crate::error::LifecycleError;
use crate::identity::sequence_id;

/// Landing pages have no timed stages; their status is set by an operator.
impl LifecycleResource for LandingPage {
    type Request = CreatePageRequest;
    type Draft = NewPage;
    type Settings = ();
    type Stage = Infallible;
    type Status = PageStatus;

    const KIND: &'static str = "landing_page";
    const PLACEMENT: Placement = Placement::OldestFirst;

    fn id(&self) -> &str {
        &self.page_id
    }

    fn status(&self) -> PageStatus {
        self.status
    }

    fn validate(request: CreatePageRequest) -> Result<NewPage, ValidationError> {
        request.validate()
    }

    fn sequence_id(sequence: usize, _now: DateTime<Utc>) -> String {
        sequence_id("LP", sequence)
    }

    fn build(sequence: usize, draft: NewPage, _settings: &(), now: DateTime<Utc>) -> Self {
        LandingPage {
            page_id: Self::sequence_id(sequence, now),
            url: draft.url,
            template_id: draft.template_id,
            status: PageStatus::Active,
            access_count: 0,
            last_access: None,
            expiration_date: draft.expiration_date,
            created_at: now,
        }
    }

    fn schedule(_settings: &()) -> Vec<(Duration, Infallible)> {
        Vec::new()
    }

    fn advance(&self, stage: Infallible, _settings: &(), _now: DateTime<Utc>) -> Option<Self> {
        match stage {}
    }
}

impl LifecycleEngine<LandingPage> {
    pub fn set_status(&self, page_id: &str, status: PageStatus) -> Result<Arc<LandingPage>, LifecycleError> {
        let page = self
            .replace(page_id, ChangeKind::Updated, |page, _| {
                Some(LandingPage {
                    status,
                    ..page.clone()
                })
            })?
            .ok_or_else(|| not_found(page_id))?;

        info!(id = %page_id, status = %status, "landing page status set");
        Ok(page)
    }

    pub fn record_access(&self, page_id: &str) -> Result<Arc<LandingPage>, LifecycleError> {
        self.replace(page_id, ChangeKind::Updated, |page, now| {
            Some(LandingPage {
                access_count: page.access_count + 1,
                last_access: Some(now),
                ..page.clone()
            })
        })?
        .ok_or_else(|| not_found(page_id))
    }
}

fn not_found(page_id: &str) -> LifecycleError {
    LifecycleError::NotFound {
        kind: LandingPage::KIND,
        id: page_id.to_string(),
    }
}
