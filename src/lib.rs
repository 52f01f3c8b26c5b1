pub mod config;
pub mod crypto_serde;
pub mod group;
pub mod logging;
pub mod padding;
pub mod proof;
pub mod purb;
pub mod shuffle;

#[cfg(test)]
pub mod test_utils;

pub use config::PurbParams;
