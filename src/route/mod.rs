pub mod tag_api;
