pub mod booking_data;
pub mod health;
pub mod reservation;
pub mod time_blocks;
