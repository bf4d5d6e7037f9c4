#[macro_use]
extern crate serde;

mod ballot;
mod election;
mod error;
mod group;
mod keys;
mod ledger;
mod proof;
mod secret_share;
pub mod serde_dec;
mod tally;
mod voter;

pub use ballot::*;
pub use election::*;
pub use error::*;
pub use group::*;
pub use keys::*;
pub use ledger::*;
pub use proof::*;
pub use secret_share::*;
pub use tally::*;
pub use voter::*;

#[cfg(test)]
mod tests;
