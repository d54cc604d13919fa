//! Repository layer for data access

pub mod campaigns;
pub mod contact_analytics;
pub mod report_configs;
pub mod scheduled_messages;
pub mod templates;

// Re-export repository traits
pub use campaigns::CampaignRepository;
pub use contact_analytics::ContactAnalyticsRepository;
pub use report_configs::ReportConfigRepository;
pub use scheduled_messages::ScheduledMessageRepository;
pub use templates::TemplateRepository;

// Re-export database implementations
pub use campaigns::DbCampaignRepository;
pub use contact_analytics::DbContactAnalyticsRepository;
pub use report_configs::DbReportConfigRepository;
pub use scheduled_messages::DbScheduledMessageRepository;
pub use templates::DbTemplateRepository;
