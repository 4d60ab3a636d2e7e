pub mod context;
pub mod controller;
pub mod event;
pub mod frontend;
pub mod r#loop;
pub mod mode;
pub mod poller;
