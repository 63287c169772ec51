use commons::{ContractTokenAmount, Token};
use concordium_std::*;

use crate::commitment::{Commitment, Nonce};

/// Generation counter of auctions for a single token. Bids are bound to the run they were committed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, SchemaType)]
pub struct AuctionIndex(pub u64);

impl AuctionIndex {
    pub fn next(self) -> Self {
        AuctionIndex(self.0 + 1)
    }
}

#[derive(Debug, Clone, Serialize, SchemaType)]
pub struct CreateAuctionParams {
    /// NFT put up for auction. Sender must own it and have this contract as an operator.
    pub token: Token,
    /// Fungible CIS-2 token collateral and payment are denominated in.
    pub payment_token: Token,
    /// Bidding start, must be in the future.
    pub start_time: Timestamp,
    /// Duration of the bidding period.
    pub bid_period: Duration,
    /// Duration of the reveal period that follows bidding.
    pub reveal_period: Duration,
    /// Smallest price the token is sold for.
    pub reserve_price: ContractTokenAmount,
}

#[derive(Debug, Clone, Serialize, SchemaType)]
pub struct CommitBidParams {
    pub token: Token,
    /// Bid commitment, see `commitment::compute_commitment`.
    pub commitment: Commitment,
    /// Payment token amount pulled from the sender into escrow.
    pub collateral: ContractTokenAmount,
}

#[derive(Debug, Clone, Serialize, SchemaType)]
pub struct RevealBidParams {
    pub token: Token,
    pub bid_value: ContractTokenAmount,
    pub nonce: Nonce,
}

#[derive(Debug, Clone, Serialize, SchemaType)]
pub struct WithdrawCollateralParams {
    pub token: Token,
    /// Auction run the collateral was committed for.
    pub index: AuctionIndex,
}

#[derive(Debug, Clone, Serialize, SchemaType)]
pub struct GetBidParams {
    pub token: Token,
    pub index: AuctionIndex,
    pub bidder: AccountAddress,
}

#[derive(Debug, Clone, Serialize, SchemaType, PartialEq, Eq)]
pub struct AuctionView {
    pub seller: AccountAddress,
    pub payment_token: Token,
    pub start_time: Timestamp,
    pub end_of_bidding_period: Timestamp,
    pub end_of_reveal_period: Timestamp,
    pub num_unrevealed_bids: u64,
    pub reserve_price: ContractTokenAmount,
    pub highest_bid: ContractTokenAmount,
    pub second_highest_bid: ContractTokenAmount,
    pub highest_bidder: Option<AccountAddress>,
    pub index: AuctionIndex,
    pub settled: bool,
}

#[derive(Debug, Clone, Serialize, SchemaType, PartialEq, Eq)]
pub struct BidView {
    pub commitment: Commitment,
    pub collateral: ContractTokenAmount,
}
