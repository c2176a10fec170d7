pub mod catalog_filter;
pub mod cluster_engine;
pub mod listing;
pub mod normalizer;
pub mod proximity;
pub mod sample_data;
pub mod translations;
pub mod utils;
