pub mod classifier_service;
