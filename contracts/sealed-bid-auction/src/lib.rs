//! Sealed-bid second-price auction for CIS-2 NFTs.
//!
//! Bidders commit to hidden bids backed by collateral in a CIS-2 payment token, open them in the reveal period,
//! and the highest bidder buys the NFT for the second highest bid. Everyone else withdraws their collateral.
#![cfg_attr(not(feature = "std"), no_std)]
use concordium_std::concordium_cfg_test;

pub mod commitment;
mod contract;
mod events;
pub mod external;
mod state;

#[concordium_cfg_test]
mod mock;
