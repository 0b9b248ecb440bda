//! CLI command implementations

pub mod config;
pub mod key;
pub mod list;
pub mod lookup;

pub use config::execute as config;
pub use key::execute as key;
pub use list::execute as list;
pub use lookup::execute as lookup;
