//! Configuration module

mod site;

pub use site::CmsConfig;
pub use site::LabelsConfig;
pub use site::ReadingConfig;
pub use site::ServerConfig;
pub use site::SiteConfig;
