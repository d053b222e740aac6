pub mod persisted;
pub mod settings_repo;
