pub mod dispatcher;
pub mod mapping;
pub mod processor;
pub mod queue;
pub mod store;
pub mod tracker;
pub mod ups;
