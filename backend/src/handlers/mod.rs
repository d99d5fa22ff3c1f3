pub mod admin;
pub mod cron;
pub mod health;
pub mod hunts;
pub mod participants;
