//! It exposes all common structs and types shared by the auction contracts.
#![cfg_attr(not(feature = "std"), no_std)]
pub use crate::{cis2::*, constants::*, errors::*, types::*};
use concordium_cis2::*;
use concordium_std::*;

mod cis2;
mod constants;
mod errors;
mod types;
