use commons::{
    ContractTokenAmount, Token, AUCTION_CREATED_TAG, AUCTION_ENDED_TAG, BID_COMMITTED_TAG,
    BID_REVEALED_TAG, COLLATERAL_WITHDRAWN_TAG,
};
use concordium_std::*;

use crate::external::AuctionIndex;
use crate::state::AuctionData;

/// Auction creation event data.
#[derive(Debug, Serial)]
pub struct AuctionCreatedEvent<'a> {
    /// Auctioned NFT.
    pub token: &'a Token,
    /// Auction run.
    pub index: AuctionIndex,
    /// Seller account address.
    pub seller: &'a AccountAddress,
    /// Token collateral and payment are denominated in.
    pub payment_token: &'a Token,
    pub start_time: Timestamp,
    pub end_of_bidding_period: Timestamp,
    pub end_of_reveal_period: Timestamp,
    pub reserve_price: ContractTokenAmount,
}

/// Bid commitment event data. The commitment itself is not published.
#[derive(Debug, Serial)]
pub struct BidCommittedEvent<'a> {
    pub token: &'a Token,
    pub index: AuctionIndex,
    pub bidder: &'a AccountAddress,
    /// Escrowed collateral.
    pub collateral: ContractTokenAmount,
}

/// Opened bid event data.
#[derive(Debug, Serial)]
pub struct BidRevealedEvent<'a> {
    pub token: &'a Token,
    pub index: AuctionIndex,
    pub bidder: &'a AccountAddress,
    pub bid_value: ContractTokenAmount,
}

/// Auction settlement event data.
#[derive(Debug, Serial)]
pub struct AuctionEndedEvent<'a> {
    pub token: &'a Token,
    pub index: AuctionIndex,
    /// Highest bidder, if any bid exceeded the reserve price.
    pub winner: Option<AccountAddress>,
    /// Clearing price, zero if the token was not sold.
    pub price: ContractTokenAmount,
}

/// Collateral refund event data.
#[derive(Debug, Serial)]
pub struct CollateralWithdrawnEvent<'a> {
    pub token: &'a Token,
    pub index: AuctionIndex,
    pub bidder: &'a AccountAddress,
    pub amount: ContractTokenAmount,
}

/// Tagged Custom event to be serialized for the event log.
#[derive(Debug)]
pub enum AuctionEvents<'a> {
    AuctionCreated(AuctionCreatedEvent<'a>),
    BidCommitted(BidCommittedEvent<'a>),
    BidRevealed(BidRevealedEvent<'a>),
    AuctionEnded(AuctionEndedEvent<'a>),
    CollateralWithdrawn(CollateralWithdrawnEvent<'a>),
}

impl<'a> AuctionEvents<'a> {
    pub fn auction_created(token: &'a Token, auction: &'a AuctionData) -> Self {
        Self::AuctionCreated(AuctionCreatedEvent {
            token,
            index: auction.index,
            seller: &auction.seller,
            payment_token: &auction.payment_token,
            start_time: auction.start_time,
            end_of_bidding_period: auction.end_of_bidding_period,
            end_of_reveal_period: auction.end_of_reveal_period,
            reserve_price: auction.reserve_price,
        })
    }

    pub fn bid_committed(
        token: &'a Token,
        index: AuctionIndex,
        bidder: &'a AccountAddress,
        collateral: ContractTokenAmount,
    ) -> Self {
        Self::BidCommitted(BidCommittedEvent {
            token,
            index,
            bidder,
            collateral,
        })
    }

    pub fn bid_revealed(
        token: &'a Token,
        index: AuctionIndex,
        bidder: &'a AccountAddress,
        bid_value: ContractTokenAmount,
    ) -> Self {
        Self::BidRevealed(BidRevealedEvent {
            token,
            index,
            bidder,
            bid_value,
        })
    }

    pub fn auction_ended(
        token: &'a Token,
        index: AuctionIndex,
        winner: Option<AccountAddress>,
        price: ContractTokenAmount,
    ) -> Self {
        Self::AuctionEnded(AuctionEndedEvent {
            token,
            index,
            winner,
            price,
        })
    }

    pub fn collateral_withdrawn(
        token: &'a Token,
        index: AuctionIndex,
        bidder: &'a AccountAddress,
        amount: ContractTokenAmount,
    ) -> Self {
        Self::CollateralWithdrawn(CollateralWithdrawnEvent {
            token,
            index,
            bidder,
            amount,
        })
    }
}

impl<'a> Serial for AuctionEvents<'a> {
    fn serial<W: Write>(&self, out: &mut W) -> Result<(), W::Err> {
        match self {
            AuctionEvents::AuctionCreated(event) => {
                out.write_u8(AUCTION_CREATED_TAG)?;
                event.serial(out)
            }
            AuctionEvents::BidCommitted(event) => {
                out.write_u8(BID_COMMITTED_TAG)?;
                event.serial(out)
            }
            AuctionEvents::BidRevealed(event) => {
                out.write_u8(BID_REVEALED_TAG)?;
                event.serial(out)
            }
            AuctionEvents::AuctionEnded(event) => {
                out.write_u8(AUCTION_ENDED_TAG)?;
                event.serial(out)
            }
            AuctionEvents::CollateralWithdrawn(event) => {
                out.write_u8(COLLATERAL_WITHDRAWN_TAG)?;
                event.serial(out)
            }
        }
    }
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use concordium_cis2::{TokenAmountU64, TokenIdVec};

    #[concordium_test]
    fn test_event_tag_prefix() {
        let token = Token::new(
            ContractAddress {
                index: 1,
                subindex: 0,
            },
            TokenIdVec(vec![5]),
        );
        let bidder = AccountAddress([2; 32]);

        let bytes = to_bytes(&AuctionEvents::bid_revealed(
            &token,
            AuctionIndex(3),
            &bidder,
            TokenAmountU64(42),
        ));

        claim_eq!(bytes[0], BID_REVEALED_TAG);
        claim_eq!(
            &bytes[1..],
            &to_bytes(&BidRevealedEvent {
                token: &token,
                index: AuctionIndex(3),
                bidder: &bidder,
                bid_value: TokenAmountU64(42),
            })[..]
        );
    }
}
