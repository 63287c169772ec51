use commons::{ContractTokenAmount, CustomContractError, Token};
use concordium_cis2::TokenAmountU64;
use concordium_std::*;

use crate::commitment::{self, Commitment, Nonce};
use crate::external::{AuctionIndex, AuctionView, BidView, CreateAuctionParams};

/// Auction phase. It is never stored, every operation derives it from slot time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SchemaType)]
pub enum AuctionPhase {
    /// No auction was ever created for the token.
    NoAuction,
    /// Auction is created, bidding has not started yet.
    Created,
    /// Bids are committed.
    Bidding,
    /// Bids are opened. Late commitments are still accepted.
    Reveal,
    /// Reveal period is over, auction can be settled.
    Ended,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuctionData {
    /// Seller account address.
    pub seller: AccountAddress,
    /// Token that collateral and payment are denominated in.
    pub payment_token: Token,
    pub start_time: Timestamp,
    pub end_of_bidding_period: Timestamp,
    pub end_of_reveal_period: Timestamp,
    /// Commitments not opened yet.
    pub num_unrevealed_bids: u64,
    pub reserve_price: ContractTokenAmount,
    pub highest_bid: ContractTokenAmount,
    pub second_highest_bid: ContractTokenAmount,
    /// Set once a revealed bid exceeds the reserve price.
    pub highest_bidder: Option<AccountAddress>,
    pub index: AuctionIndex,
    /// Payouts and token transfer were done.
    pub settled: bool,
}

impl AuctionData {
    /// Get auction phase at given slot_time
    pub fn phase(&self, slot_time: Timestamp) -> AuctionPhase {
        if slot_time < self.start_time {
            AuctionPhase::Created
        } else if slot_time < self.end_of_bidding_period {
            AuctionPhase::Bidding
        } else if slot_time < self.end_of_reveal_period {
            AuctionPhase::Reveal
        } else {
            AuctionPhase::Ended
        }
    }

    /// Account an opened bid. Ties keep the earlier bidder.
    fn record_reveal(&mut self, bidder: AccountAddress, bid_value: ContractTokenAmount) {
        if bid_value.0 > self.highest_bid.0 {
            self.second_highest_bid = self.highest_bid;
            self.highest_bid = bid_value;
            self.highest_bidder = Some(bidder);
        } else if bid_value.0 > self.second_highest_bid.0 {
            self.second_highest_bid = bid_value;
        }
    }

    fn view(&self) -> AuctionView {
        AuctionView {
            seller: self.seller,
            payment_token: self.payment_token.clone(),
            start_time: self.start_time,
            end_of_bidding_period: self.end_of_bidding_period,
            end_of_reveal_period: self.end_of_reveal_period,
            num_unrevealed_bids: self.num_unrevealed_bids,
            reserve_price: self.reserve_price,
            highest_bid: self.highest_bid,
            second_highest_bid: self.second_highest_bid,
            highest_bidder: self.highest_bidder,
            index: self.index,
            settled: self.settled,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BidKey {
    pub token: Token,
    pub index: AuctionIndex,
    pub bidder: AccountAddress,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BidData {
    /// Zeroed once the bid is opened.
    pub commitment: Commitment,
    /// Escrowed amount. Zeroed on withdrawal or settlement payout.
    pub collateral: ContractTokenAmount,
    /// Token the collateral was escrowed in. Later runs of the auction may use another one.
    pub payment_token: Token,
}

/// Collateral that MUST be pulled from the bidder into escrow.
#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub struct Deposit {
    pub index: AuctionIndex,
    pub payment_token: Token,
    pub amount: ContractTokenAmount,
}

/// Outcome of auction settlement. Every transfer in it MUST be executed.
#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub enum Settlement {
    /// Highest bidder buys the token for the second highest bid.
    Sold {
        index: AuctionIndex,
        seller: AccountAddress,
        winner: AccountAddress,
        payment_token: Token,
        price: ContractTokenAmount,
        refund: ContractTokenAmount,
    },
    /// No bid exceeded the reserve price, token returns to the seller.
    Unsold {
        index: AuctionIndex,
        seller: AccountAddress,
    },
}

/// Collateral that MUST be refunded to the bidder.
#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub struct Withdrawal {
    pub payment_token: Token,
    pub amount: ContractTokenAmount,
}

/// The contract state.
///
/// Methods only check and update bookkeeping. Token movements they require are returned to the caller, which
/// performs them after the state is final.
#[derive(Serial, DeserialWithState, StateClone)]
#[concordium(state_parameter = "S")]
pub struct State<S: HasStateApi> {
    /// Live auction per token.
    pub auctions: StateMap<Token, AuctionData, S>,
    /// Bids per token, auction run and bidder. Bids of previous runs are kept for withdrawal.
    pub bids: StateMap<BidKey, BidData, S>,
}

impl<S: HasStateApi> State<S> {
    /// Create a new state with no auctions.
    pub fn new(state_builder: &mut StateBuilder<S>) -> Self {
        State {
            auctions: state_builder.new_map(),
            bids: state_builder.new_map(),
        }
    }

    pub fn phase(&self, token: &Token, slot_time: Timestamp) -> AuctionPhase {
        self.auctions
            .get(token)
            .map(|auction| auction.phase(slot_time))
            .unwrap_or(AuctionPhase::NoAuction)
    }

    /// Validate auction parameters and build the next auction record. Nothing is stored.
    pub fn prepare_auction(
        &self,
        seller: AccountAddress,
        params: &CreateAuctionParams,
        slot_time: Timestamp,
    ) -> Result<AuctionData, CustomContractError> {
        let previous_index = match self.auctions.get(&params.token) {
            Some(auction) => {
                // Previous run must be over and paid out
                ensure!(
                    auction.phase(slot_time) == AuctionPhase::Ended && auction.settled,
                    CustomContractError::AuctionAlreadyActive
                );
                auction.index
            }
            None => AuctionIndex::default(),
        };

        ensure!(
            params.start_time > slot_time,
            CustomContractError::InvalidStartTime
        );

        ensure!(
            params.bid_period.millis() > 0,
            CustomContractError::InvalidBidPeriod
        );
        let end_of_bidding_period = params
            .start_time
            .checked_add(params.bid_period)
            .ok_or(CustomContractError::InvalidBidPeriod)?;

        ensure!(
            params.reveal_period.millis() > 0,
            CustomContractError::InvalidRevealPeriod
        );
        let end_of_reveal_period = end_of_bidding_period
            .checked_add(params.reveal_period)
            .ok_or(CustomContractError::InvalidRevealPeriod)?;

        ensure!(
            params.reserve_price.0 > 0,
            CustomContractError::InvalidReservePrice
        );

        Ok(AuctionData {
            seller,
            payment_token: params.payment_token.clone(),
            start_time: params.start_time,
            end_of_bidding_period,
            end_of_reveal_period,
            num_unrevealed_bids: 0,
            reserve_price: params.reserve_price,
            highest_bid: params.reserve_price,
            second_highest_bid: params.reserve_price,
            highest_bidder: None,
            index: previous_index.next(),
            settled: false,
        })
    }

    /// Store auction record built by `prepare_auction`, replacing the settled previous run.
    pub fn start_auction(&mut self, token: Token, auction: AuctionData) {
        self.auctions.insert(token, auction);
    }

    /// Record a bid commitment, superseding an unopened one of the same bidder.
    pub fn commit_bid(
        &mut self,
        token: &Token,
        bidder: AccountAddress,
        commitment: Commitment,
        collateral: ContractTokenAmount,
        slot_time: Timestamp,
    ) -> Result<Deposit, CustomContractError> {
        let mut entry = self
            .auctions
            .get_mut(token)
            .ok_or(CustomContractError::AuctionNotFound)?;
        let auction = entry.get_mut();

        match auction.phase(slot_time) {
            AuctionPhase::NoAuction => bail!(CustomContractError::AuctionNotFound),
            AuctionPhase::Created => bail!(CustomContractError::BiddingNotStarted),
            AuctionPhase::Bidding | AuctionPhase::Reveal => (),
            AuctionPhase::Ended => bail!(CustomContractError::BiddingEnded),
        }

        ensure!(collateral.0 > 0, CustomContractError::ZeroCollateral);
        ensure!(!commitment.is_zero(), CustomContractError::ZeroCommitment);

        let key = BidKey {
            token: token.clone(),
            index: auction.index,
            bidder,
        };

        let first_commitment = match self.bids.get(&key) {
            // Opened bid is final, replacing it would also replace the collateral backing it
            Some(bid) if bid.commitment.is_zero() => {
                bail!(CustomContractError::BidAlreadyRevealed)
            }
            Some(_) => false,
            None => true,
        };

        if first_commitment {
            auction.num_unrevealed_bids += 1;
        }

        self.bids.insert(
            key,
            BidData {
                commitment,
                collateral,
                payment_token: auction.payment_token.clone(),
            },
        );

        Ok(Deposit {
            index: auction.index,
            payment_token: auction.payment_token.clone(),
            amount: collateral,
        })
    }

    /// Open a committed bid and update the highest bids. Returns the auction run the bid belongs to.
    pub fn reveal_bid(
        &mut self,
        token: &Token,
        bidder: AccountAddress,
        bid_value: ContractTokenAmount,
        nonce: &Nonce,
        slot_time: Timestamp,
    ) -> Result<AuctionIndex, CustomContractError> {
        let mut entry = self
            .auctions
            .get_mut(token)
            .ok_or(CustomContractError::AuctionNotFound)?;
        let auction = entry.get_mut();

        match auction.phase(slot_time) {
            AuctionPhase::NoAuction => bail!(CustomContractError::AuctionNotFound),
            AuctionPhase::Created | AuctionPhase::Bidding => {
                bail!(CustomContractError::RevealNotStarted)
            }
            AuctionPhase::Reveal => (),
            AuctionPhase::Ended => bail!(CustomContractError::RevealEnded),
        }

        let key = BidKey {
            token: token.clone(),
            index: auction.index,
            bidder,
        };
        let mut bid_entry = self
            .bids
            .get_mut(&key)
            .ok_or(CustomContractError::NoCommitment)?;
        let bid = bid_entry.get_mut();

        ensure!(
            !bid.commitment.is_zero(),
            CustomContractError::NoCommitment
        );
        ensure!(
            commitment::verify(&bid.commitment, nonce, bid_value, token, auction.index),
            CustomContractError::CommitmentMismatch
        );
        ensure!(
            bid.collateral.0 >= bid_value.0,
            CustomContractError::InsufficientCollateral
        );

        bid.commitment = Commitment::ZERO;
        auction.num_unrevealed_bids = auction.num_unrevealed_bids.saturating_sub(1);
        auction.record_reveal(bidder, bid_value);

        Ok(auction.index)
    }

    /// Close the auction and release the winner collateral. Succeeds once per auction run.
    pub fn settle(
        &mut self,
        token: &Token,
        slot_time: Timestamp,
    ) -> Result<Settlement, CustomContractError> {
        let mut entry = self
            .auctions
            .get_mut(token)
            .ok_or(CustomContractError::AuctionNotFound)?;
        let auction = entry.get_mut();

        ensure_eq!(
            auction.phase(slot_time),
            AuctionPhase::Ended,
            CustomContractError::RevealPhaseNotOver
        );
        ensure!(!auction.settled, CustomContractError::AuctionAlreadySettled);

        let settlement = match auction.highest_bidder {
            Some(winner) => {
                let key = BidKey {
                    token: token.clone(),
                    index: auction.index,
                    bidder: winner,
                };
                let mut bid_entry = self
                    .bids
                    .get_mut(&key)
                    .ok_or(CustomContractError::NoCommitment)?;
                let bid = bid_entry.get_mut();

                let price = auction.second_highest_bid;
                let refund = bid
                    .collateral
                    .0
                    .checked_sub(price.0)
                    .ok_or(CustomContractError::AmountOverflow)?;

                // Winner collateral is paid out below
                bid.collateral = TokenAmountU64(0);

                Settlement::Sold {
                    index: auction.index,
                    seller: auction.seller,
                    winner,
                    payment_token: bid.payment_token.clone(),
                    price,
                    refund: TokenAmountU64(refund),
                }
            }
            None => Settlement::Unsold {
                index: auction.index,
                seller: auction.seller,
            },
        };

        auction.settled = true;

        Ok(settlement)
    }

    /// Release collateral of a bidder that did not win the given auction run.
    pub fn withdraw_collateral(
        &mut self,
        token: &Token,
        index: AuctionIndex,
        bidder: AccountAddress,
        slot_time: Timestamp,
    ) -> Result<Withdrawal, CustomContractError> {
        let auction = self
            .auctions
            .get(token)
            .ok_or(CustomContractError::AuctionNotFound)?;

        ensure_eq!(
            auction.phase(slot_time),
            AuctionPhase::Ended,
            CustomContractError::RevealPhaseNotOver
        );
        ensure!(
            !(index == auction.index && auction.highest_bidder == Some(bidder)),
            CustomContractError::WinnerCannotWithdraw
        );

        let key = BidKey {
            token: token.clone(),
            index,
            bidder,
        };
        let mut bid_entry = self
            .bids
            .get_mut(&key)
            .ok_or(CustomContractError::NoCommitment)?;
        let bid = bid_entry.get_mut();

        ensure!(bid.collateral.0 > 0, CustomContractError::AlreadyWithdrawn);

        let amount = bid.collateral;
        bid.collateral = TokenAmountU64(0);

        Ok(Withdrawal {
            payment_token: bid.payment_token.clone(),
            amount,
        })
    }

    pub fn auction_view(&self, token: &Token) -> Result<AuctionView, CustomContractError> {
        self.auctions
            .get(token)
            .map(|auction| auction.view())
            .ok_or(CustomContractError::AuctionNotFound)
    }

    /// Bid projection. Missing bids are shown as empty.
    pub fn bid_view(&self, token: &Token, index: AuctionIndex, bidder: AccountAddress) -> BidView {
        let key = BidKey {
            token: token.clone(),
            index,
            bidder,
        };
        self.bids
            .get(&key)
            .map(|bid| BidView {
                commitment: bid.commitment,
                collateral: bid.collateral,
            })
            .unwrap_or(BidView {
                commitment: Commitment::ZERO,
                collateral: TokenAmountU64(0),
            })
    }
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use crate::commitment::{compute_commitment, NONCE_SIZE};
    use concordium_cis2::TokenIdVec;
    use concordium_std::test_infrastructure::*;

    const NFT_CONTRACT: ContractAddress = ContractAddress {
        index: 1,
        subindex: 0,
    };
    const PAYMENT_CONTRACT: ContractAddress = ContractAddress {
        index: 2,
        subindex: 0,
    };

    const SELLER: AccountAddress = AccountAddress([1; 32]);
    const ALICE: AccountAddress = AccountAddress([16; 32]);
    const BOB: AccountAddress = AccountAddress([17; 32]);
    const CAROL: AccountAddress = AccountAddress([18; 32]);

    const START: u64 = 1_000;
    const BID_PERIOD: u64 = 100;
    const REVEAL_PERIOD: u64 = 50;
    const RESERVE: u64 = 100;

    fn token() -> Token {
        Token::new(NFT_CONTRACT, TokenIdVec(vec![0, 1]))
    }

    fn payment_token() -> Token {
        Token::new(PAYMENT_CONTRACT, TokenIdVec(vec![]))
    }

    fn at(millis: u64) -> Timestamp {
        Timestamp::from_timestamp_millis(millis)
    }

    fn bidding_time() -> Timestamp {
        at(START)
    }

    fn reveal_time() -> Timestamp {
        at(START + BID_PERIOD)
    }

    fn end_time() -> Timestamp {
        at(START + BID_PERIOD + REVEAL_PERIOD)
    }

    fn nonce(seed: u8) -> Nonce {
        Nonce([seed; NONCE_SIZE])
    }

    fn create_params() -> CreateAuctionParams {
        CreateAuctionParams {
            token: token(),
            payment_token: payment_token(),
            start_time: at(START),
            bid_period: Duration::from_millis(BID_PERIOD),
            reveal_period: Duration::from_millis(REVEAL_PERIOD),
            reserve_price: TokenAmountU64(RESERVE),
        }
    }

    fn new_state(state_builder: &mut TestStateBuilder) -> State<TestStateApi> {
        let mut state = State::new(state_builder);
        let auction = state
            .prepare_auction(SELLER, &create_params(), at(0))
            .expect_report("Auction parameters are valid");
        state.start_auction(token(), auction);
        state
    }

    fn commit(
        state: &mut State<TestStateApi>,
        bidder: AccountAddress,
        bid: u64,
        collateral: u64,
        seed: u8,
    ) {
        let index = state.auction_view(&token()).expect_report("Auction exists").index;
        let commitment = compute_commitment(&nonce(seed), TokenAmountU64(bid), &token(), index);
        let result = state.commit_bid(
            &token(),
            bidder,
            commitment,
            TokenAmountU64(collateral),
            bidding_time(),
        );
        claim_eq!(
            result,
            Ok(Deposit {
                index,
                payment_token: payment_token(),
                amount: TokenAmountU64(collateral),
            })
        );
    }

    fn reveal(state: &mut State<TestStateApi>, bidder: AccountAddress, bid: u64, seed: u8) {
        let result = state.reveal_bid(
            &token(),
            bidder,
            TokenAmountU64(bid),
            &nonce(seed),
            reveal_time(),
        );
        claim!(result.is_ok());
    }

    #[concordium_test]
    fn test_phase_boundaries() {
        let mut state_builder = TestStateBuilder::new();
        let state = new_state(&mut state_builder);

        claim_eq!(state.phase(&token(), at(START - 1)), AuctionPhase::Created);
        claim_eq!(state.phase(&token(), at(START)), AuctionPhase::Bidding);
        claim_eq!(
            state.phase(&token(), at(START + BID_PERIOD - 1)),
            AuctionPhase::Bidding
        );
        claim_eq!(state.phase(&token(), reveal_time()), AuctionPhase::Reveal);
        claim_eq!(
            state.phase(&token(), at(START + BID_PERIOD + REVEAL_PERIOD - 1)),
            AuctionPhase::Reveal
        );
        claim_eq!(state.phase(&token(), end_time()), AuctionPhase::Ended);
        claim_eq!(
            state.phase(&Token::new(NFT_CONTRACT, TokenIdVec(vec![9])), end_time()),
            AuctionPhase::NoAuction
        );
    }

    #[concordium_test]
    fn test_prepare_auction_error_precedence() {
        let mut state_builder = TestStateBuilder::new();
        let state = State::new(&mut state_builder);

        // Every parameter is wrong, start time is reported first
        let mut params = create_params();
        params.start_time = at(START);
        params.bid_period = Duration::from_millis(0);
        params.reveal_period = Duration::from_millis(0);
        params.reserve_price = TokenAmountU64(0);
        claim_eq!(
            state.prepare_auction(SELLER, &params, at(START)).map(|_| ()),
            Err(CustomContractError::InvalidStartTime)
        );

        params.start_time = at(START + 1);
        claim_eq!(
            state.prepare_auction(SELLER, &params, at(START)).map(|_| ()),
            Err(CustomContractError::InvalidBidPeriod)
        );

        params.bid_period = Duration::from_millis(BID_PERIOD);
        claim_eq!(
            state.prepare_auction(SELLER, &params, at(START)).map(|_| ()),
            Err(CustomContractError::InvalidRevealPeriod)
        );

        params.reveal_period = Duration::from_millis(REVEAL_PERIOD);
        claim_eq!(
            state.prepare_auction(SELLER, &params, at(START)).map(|_| ()),
            Err(CustomContractError::InvalidReservePrice)
        );

        params.reserve_price = TokenAmountU64(1);
        claim!(state.prepare_auction(SELLER, &params, at(START)).is_ok());
    }

    #[concordium_test]
    fn test_prepare_auction_overflow() {
        let mut state_builder = TestStateBuilder::new();
        let state = State::new(&mut state_builder);

        let mut params = create_params();
        params.bid_period = Duration::from_millis(u64::MAX);
        claim_eq!(
            state.prepare_auction(SELLER, &params, at(0)).map(|_| ()),
            Err(CustomContractError::InvalidBidPeriod)
        );

        let mut params = create_params();
        params.reveal_period = Duration::from_millis(u64::MAX - START);
        claim_eq!(
            state.prepare_auction(SELLER, &params, at(0)).map(|_| ()),
            Err(CustomContractError::InvalidRevealPeriod)
        );
    }

    #[concordium_test]
    fn test_new_auction_trackers() {
        let mut state_builder = TestStateBuilder::new();
        let state = new_state(&mut state_builder);
        let view = state.auction_view(&token()).expect_report("Auction exists");

        claim_eq!(view.highest_bid, TokenAmountU64(RESERVE));
        claim_eq!(view.second_highest_bid, TokenAmountU64(RESERVE));
        claim_eq!(view.highest_bidder, None);
        claim_eq!(view.index, AuctionIndex(1));
        claim_eq!(view.end_of_bidding_period, reveal_time());
        claim_eq!(view.end_of_reveal_period, end_time());
        claim!(!view.settled);
    }

    #[concordium_test]
    fn test_reveal_order_and_ties() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = new_state(&mut state_builder);

        commit(&mut state, ALICE, 300, 300, 1);
        commit(&mut state, BOB, 300, 400, 2);
        commit(&mut state, CAROL, 200, 200, 3);
        claim_eq!(
            state.auction_view(&token()).map(|v| v.num_unrevealed_bids),
            Ok(3)
        );

        reveal(&mut state, ALICE, 300, 1);
        // Equal bid does not displace Alice, but becomes second highest
        reveal(&mut state, BOB, 300, 2);
        reveal(&mut state, CAROL, 200, 3);

        let view = state.auction_view(&token()).expect_report("Auction exists");
        claim_eq!(view.highest_bidder, Some(ALICE));
        claim_eq!(view.highest_bid, TokenAmountU64(300));
        claim_eq!(view.second_highest_bid, TokenAmountU64(300));
        claim_eq!(view.num_unrevealed_bids, 0);
    }

    #[concordium_test]
    fn test_reveal_below_reserve() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = new_state(&mut state_builder);

        commit(&mut state, ALICE, 50, 50, 1);
        commit(&mut state, BOB, 100, 100, 2);
        reveal(&mut state, ALICE, 50, 1);
        reveal(&mut state, BOB, 100, 2);

        // Bids must strictly exceed the reserve price
        let view = state.auction_view(&token()).expect_report("Auction exists");
        claim_eq!(view.highest_bidder, None);
        claim_eq!(view.highest_bid, TokenAmountU64(RESERVE));
        claim_eq!(view.second_highest_bid, TokenAmountU64(RESERVE));

        claim_eq!(
            state.settle(&token(), end_time()),
            Ok(Settlement::Unsold {
                index: AuctionIndex(1),
                seller: SELLER,
            })
        );
    }

    #[concordium_test]
    fn test_second_highest_follows_outbid() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = new_state(&mut state_builder);

        commit(&mut state, ALICE, 150, 150, 1);
        commit(&mut state, BOB, 400, 500, 2);
        commit(&mut state, CAROL, 250, 250, 3);
        reveal(&mut state, ALICE, 150, 1);
        reveal(&mut state, BOB, 400, 2);
        reveal(&mut state, CAROL, 250, 3);

        let view = state.auction_view(&token()).expect_report("Auction exists");
        claim_eq!(view.highest_bidder, Some(BOB));
        claim_eq!(view.highest_bid, TokenAmountU64(400));
        claim_eq!(view.second_highest_bid, TokenAmountU64(250));

        claim_eq!(
            state.settle(&token(), end_time()),
            Ok(Settlement::Sold {
                index: AuctionIndex(1),
                seller: SELLER,
                winner: BOB,
                payment_token: payment_token(),
                price: TokenAmountU64(250),
                refund: TokenAmountU64(250),
            })
        );
        // Winner collateral is released by settlement only
        claim_eq!(
            state.bid_view(&token(), AuctionIndex(1), BOB).collateral,
            TokenAmountU64(0)
        );
    }

    #[concordium_test]
    fn test_recommit_replaces_bid() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = new_state(&mut state_builder);

        commit(&mut state, ALICE, 200, 200, 1);
        commit(&mut state, ALICE, 300, 350, 2);

        let bid = state.bid_view(&token(), AuctionIndex(1), ALICE);
        claim_eq!(bid.collateral, TokenAmountU64(350));
        claim_eq!(
            state.auction_view(&token()).map(|v| v.num_unrevealed_bids),
            Ok(1)
        );

        // First commitment is superseded
        claim_eq!(
            state.reveal_bid(
                &token(),
                ALICE,
                TokenAmountU64(200),
                &nonce(1),
                reveal_time()
            ),
            Err(CustomContractError::CommitmentMismatch)
        );
        reveal(&mut state, ALICE, 300, 2);
    }

    #[concordium_test]
    fn test_commit_after_reveal() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = new_state(&mut state_builder);

        commit(&mut state, ALICE, 200, 200, 1);
        reveal(&mut state, ALICE, 200, 1);

        let commitment =
            compute_commitment(&nonce(2), TokenAmountU64(1), &token(), AuctionIndex(1));
        claim_eq!(
            state.commit_bid(
                &token(),
                ALICE,
                commitment,
                TokenAmountU64(1),
                reveal_time()
            ),
            Err(CustomContractError::BidAlreadyRevealed)
        );

        // Late commitment of another bidder during reveal is accepted
        claim_eq!(
            state
                .commit_bid(
                    &token(),
                    BOB,
                    commitment,
                    TokenAmountU64(1),
                    reveal_time()
                )
                .map(|deposit| deposit.index),
            Ok(AuctionIndex(1))
        );
    }

    #[concordium_test]
    fn test_reveal_twice() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = new_state(&mut state_builder);

        commit(&mut state, ALICE, 200, 200, 1);
        reveal(&mut state, ALICE, 200, 1);

        claim_eq!(
            state.reveal_bid(
                &token(),
                ALICE,
                TokenAmountU64(200),
                &nonce(1),
                reveal_time()
            ),
            Err(CustomContractError::NoCommitment)
        );
    }

    #[concordium_test]
    fn test_settle_once() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = new_state(&mut state_builder);

        claim_eq!(
            state.settle(&token(), at(START + BID_PERIOD + REVEAL_PERIOD - 1)),
            Err(CustomContractError::RevealPhaseNotOver)
        );
        claim!(state.settle(&token(), end_time()).is_ok());
        claim_eq!(
            state.settle(&token(), end_time()),
            Err(CustomContractError::AuctionAlreadySettled)
        );
    }

    #[concordium_test]
    fn test_withdraw_previous_run() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = new_state(&mut state_builder);

        commit(&mut state, ALICE, 300, 300, 1);
        commit(&mut state, BOB, 200, 250, 2);
        reveal(&mut state, ALICE, 300, 1);
        claim!(state.settle(&token(), end_time()).is_ok());

        // Token is auctioned again
        let mut params = create_params();
        params.start_time = at(START * 10);
        let auction = state
            .prepare_auction(SELLER, &params, end_time())
            .expect_report("Previous run is settled");
        claim_eq!(auction.index, AuctionIndex(2));
        state.start_auction(token(), auction);

        // Withdrawal is gated by the current run
        claim_eq!(
            state.withdraw_collateral(&token(), AuctionIndex(1), BOB, end_time()),
            Err(CustomContractError::RevealPhaseNotOver)
        );

        let later = at(START * 10 + BID_PERIOD + REVEAL_PERIOD);
        claim_eq!(
            state.withdraw_collateral(&token(), AuctionIndex(1), BOB, later),
            Ok(Withdrawal {
                payment_token: payment_token(),
                amount: TokenAmountU64(250),
            })
        );
        // Previous winner was paid out on settlement
        claim_eq!(
            state.withdraw_collateral(&token(), AuctionIndex(1), ALICE, later),
            Err(CustomContractError::AlreadyWithdrawn)
        );
        // Nothing was committed for runs that do not exist yet
        claim_eq!(
            state.withdraw_collateral(&token(), AuctionIndex(3), BOB, later),
            Err(CustomContractError::NoCommitment)
        );
    }
}
