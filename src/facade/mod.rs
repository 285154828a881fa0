mod service;

pub use service::{AdminService, MARKER_COLLECTION};
