pub mod job;
pub mod review;
pub mod user;
