pub mod balance;
pub mod portfolio;
pub mod setup;
pub mod ui;
pub mod watch;
