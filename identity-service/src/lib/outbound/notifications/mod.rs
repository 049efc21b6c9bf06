pub mod logger;

pub use logger::LogNotifier;
