pub mod models;
pub mod notify;
pub mod panel;
pub mod services;
pub mod store;

pub use notify::Notifier;
pub use panel::PanelClient;
pub use store::JsonStore;
