pub mod backfill_service;
pub mod cache_service;
pub mod tag_service;
