pub use deepletters_core as letters;

pub mod cli;
pub mod client;
pub mod color;
pub mod keygen;
pub mod open;
pub mod seal;
pub mod wrap;
