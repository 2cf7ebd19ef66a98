//! Application services

pub mod navigation;

pub use navigation::{Crumb, ExportFormat, Location, NavigationService};
