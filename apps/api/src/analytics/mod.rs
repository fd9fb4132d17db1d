// Analytics API: read-only reports computed by the store over the mirror.

pub mod handlers;
pub mod stats;
