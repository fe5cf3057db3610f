pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Daemon, Decrypt, Encrypt, File, Health, Init, Key, Keygen, Recrypt, Version};
