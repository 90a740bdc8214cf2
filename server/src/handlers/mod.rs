pub mod job_handlers;
pub mod settings_handlers;
