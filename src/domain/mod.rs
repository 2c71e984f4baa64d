pub mod calendar_date;
pub mod date_range;
pub mod lanes;
pub mod layout;
pub mod merge;
pub mod models;
pub mod week;
pub mod week_layout;
