pub mod codec;
pub mod command;
