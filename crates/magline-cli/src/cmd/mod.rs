pub mod fos_stats;
pub mod full;
pub mod get;
pub mod stats;
