pub mod db;
pub mod environment;
pub mod fetch;
pub mod logging;
pub mod normalize;
pub mod pipeline;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_DB: &str = "db_query";
pub const TARGET_PIPELINE: &str = "pipeline";
