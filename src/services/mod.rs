pub mod locations;
pub mod reports;
pub mod uptime;
