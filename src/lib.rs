pub mod catalog;
pub mod maven;
pub mod store;
pub mod util;
