pub mod replicate_service;
