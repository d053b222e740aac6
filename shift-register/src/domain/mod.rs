pub mod calendar_logic;
pub mod conflict;
pub mod date_selection;
pub mod error;
pub mod job_registry;
pub mod models;
pub mod summary;
pub mod time_calc;
pub mod time_resolver;
pub mod work_day;
