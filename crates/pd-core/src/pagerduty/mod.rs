//! PagerDuty REST client and wire types

mod client;
mod types;

pub use client::{PagerDutyApi, PagerDutyClient};
pub use types::*;
