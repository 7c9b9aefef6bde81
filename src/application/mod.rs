pub mod builders;
pub mod response_consumer;
pub mod services;
