pub mod commands;
pub mod dto;
pub mod holidays;
pub mod session;
