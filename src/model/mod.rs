pub mod filters;
pub mod property;
pub mod response;
