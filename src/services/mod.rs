pub mod analytics_service;
pub mod attempt_service;
pub mod grading_service;
pub mod template_service;
