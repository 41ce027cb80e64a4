pub mod media_service;
