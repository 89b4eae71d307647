// Vixel image service library
//
// Uploads images to S3-compatible storage and derives new variants through
// a composable transformation pipeline (resize, crop, rotate, flip, format
// conversion, filter, watermark).

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod service;
pub mod storage;
pub mod transform;
pub mod watermark;
