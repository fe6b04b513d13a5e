pub mod course;
pub mod message;
pub mod reservation;
pub mod settings;
pub mod slot;
