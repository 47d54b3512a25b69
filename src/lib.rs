pub mod card;
pub mod catalog;
pub mod config;
pub mod doctor;
pub mod episodes;
pub mod notice;
pub mod playback;
pub mod search;
pub mod tui;
pub mod watch;
