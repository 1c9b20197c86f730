pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::database::AssessmentStore;
use crate::services::{
    analytics_service::AnalyticsService, attempt_service::AttemptService,
    template_service::TemplateService,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub template_service: TemplateService,
    pub attempt_service: AttemptService,
    pub analytics_service: AnalyticsService,
}

impl AppState {
    pub fn new(store: Arc<dyn AssessmentStore>, config: &Config) -> Self {
        let template_service = TemplateService::new(store.clone());
        let attempt_service = AttemptService::new(store.clone(), config.submission_grace_seconds);
        let analytics_service = AnalyticsService::new(store);

        Self {
            template_service,
            attempt_service,
            analytics_service,
        }
    }
}
