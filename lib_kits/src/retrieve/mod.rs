pub mod knack;
pub mod socrata;
