//! Telegram transport for the Wird reminder engine.
//!
//! - [`telegram::TelegramChannel`] delivers reminders (`DeliveryChannel`)
//! - [`telegram::TelegramInbound`] long-polls updates and forwards commands to a `CommandSink`
//! - [`telegram_commands`] parses and executes the bot's slash commands

// --------------- Telegram ---------------
pub mod telegram;
pub mod telegram_commands;

pub use telegram::{TelegramChannel, TelegramInbound};
pub use telegram_commands::{parse_command, BotCommand, TelegramCommands};
