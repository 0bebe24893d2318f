pub mod cli;
pub mod command_handlers;
pub mod command_support;
pub mod flag_parsing;
