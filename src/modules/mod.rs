//! Standalone modules the game wires in: chat prefixes, chat rendering and
//! demo world management.

pub mod chat;
pub mod manager;
pub mod prefix;
pub mod worlddemo;

pub use chat::ChatModule;
pub use prefix::PrefixModule;
pub use worlddemo::WorldDemoModule;
