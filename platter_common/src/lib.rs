mod price;

pub mod helpers;
pub mod op;
mod secret;

pub use price::Price;
pub use secret::Secret;
