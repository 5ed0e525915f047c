pub mod alert;
pub mod chat;
pub mod describe;
pub mod error;
pub mod events;
pub mod game;
pub mod models;
pub mod shell;
pub mod ticket;
