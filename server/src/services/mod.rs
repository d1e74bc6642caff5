pub mod api_sport;
pub mod bot;
pub mod reminders;
