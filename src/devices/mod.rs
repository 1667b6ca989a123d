pub mod service;

pub use service::DeviceStateService;
