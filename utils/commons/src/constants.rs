/// Tag for the AuctionCreated event.
pub const AUCTION_CREATED_TAG: u8 = u8::MAX - 1;

/// Tag for the BidCommitted event.
pub const BID_COMMITTED_TAG: u8 = u8::MAX - 2;

/// Tag for the BidRevealed event.
pub const BID_REVEALED_TAG: u8 = u8::MAX - 3;

/// Tag for the AuctionEnded settlement event.
pub const AUCTION_ENDED_TAG: u8 = u8::MAX - 4;

/// Tag for the CollateralWithdrawn event.
pub const COLLATERAL_WITHDRAWN_TAG: u8 = u8::MAX - 5;

/// Entrypoint the contract exposes to CIS-2 contracts transferring tokens into custody.
pub const ON_RECEIVING_CIS2: &str = "onReceivingCIS2";
