use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize)]
pub struct VisitsQueryParams {
    pub page: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct VisitsSummary {
    #[serde(rename = "pageUserVisits")]
    pub page_user_visits: u64,
    #[serde(rename = "pageTotalVisits")]
    pub page_total_visits: u64,
    #[serde(rename = "userTotalVisits")]
    pub user_total_visits: u64,
    #[serde(rename = "totalVisits")]
    pub total_visits: u64,
}

pub mod config;
pub mod counter;
pub mod error;
pub mod page;
pub mod server;
pub mod template;

pub use config::{HttpConfig, PathsConfig, ServerConfig};
pub use counter::{PageId, UserId, VisitCounter};
pub use error::{AppError, TemplateError};
pub use server::{AppState, WebServer, router};
pub use template::Template;
