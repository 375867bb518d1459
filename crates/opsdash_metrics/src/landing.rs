use opsdash_contract::{LandingPage, PageStatus};
use serde::Serialize;

use crate::tally::{count_by, CategoryShare};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LandingStats {
    pub total_pages: usize,
    pub active_pages: usize,
    pub total_access: u64,
    /// Rounded to the nearest whole access.
    pub average_access: u64,
    pub by_status: Vec<CategoryShare<PageStatus>>,
}

pub fn landing_stats<P: AsRef<LandingPage>>(pages: &[P]) -> LandingStats {
    let total_access: u64 = pages.iter().map(|page| page.as_ref().access_count).sum();
    let average_access = if pages.is_empty() {
        0
    } else {
        (total_access as f64 / pages.len() as f64).round() as u64
    };

    LandingStats {
        total_pages: pages.len(),
        active_pages: pages
            .iter()
            .filter(|page| page.as_ref().status == PageStatus::Active)
            .count(),
        total_access,
        average_access,
        by_status: count_by(pages, &PageStatus::ALL, |page| page.as_ref().status),
    }
}
