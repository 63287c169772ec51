use commons::{
    handle_call_error, handle_read_error, ContractTokenAmount, ContractTokenId, CustomContractError,
    HostCis2Ext, Token, ON_RECEIVING_CIS2,
};
use concordium_cis2::{OnReceivingCis2Params, Receiver, TokenAmountU64};
use concordium_std::*;

use crate::events::AuctionEvents;
use crate::external::*;
use crate::state::{AuctionPhase, Settlement, State};

/// Auctioned tokens are non-fungible.
const NFT_AMOUNT: ContractTokenAmount = TokenAmountU64(1);

/// Initialize the auction contract with no auctions.
#[init(contract = "SealedBidAuction")]
fn contract_init<S: HasStateApi>(
    _ctx: &impl HasInitContext,
    state_builder: &mut StateBuilder<S>,
) -> InitResult<State<S>> {
    Ok(State::new(state_builder))
}

/// Put an NFT up for auction.
///
/// The sender must own the token and have this contract as an operator on the token contract. The token is kept in
/// custody of this contract until the auction is settled.
///
/// It rejects if:
/// - Fails to parse `CreateAuctionParams` parameters.
/// - Sender is not an account.
/// - Previous auction of the token is not over and settled.
/// - Start time is not in the future, either period is empty or auction end overflows.
/// - Reserve price is zero.
/// - Sender does not own the token, or the token can not be transferred.
#[receive(
    mutable,
    contract = "SealedBidAuction",
    name = "createAuction",
    parameter = "CreateAuctionParams",
    enable_logger
)]
fn contract_create_auction<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ReceiveResult<()> {
    let params = CreateAuctionParams::deserial(&mut ctx.parameter_cursor())?;
    let seller = sender_account(ctx)?;

    let auction = host
        .state()
        .prepare_auction(seller, &params, ctx.metadata().slot_time())?;

    let balance = host
        .cis2_balance_of(&params.token, Address::Account(seller))
        .map_err(handle_read_error)?;
    ensure!(balance.0 > 0, CustomContractError::NotAssetOwner.into());

    logger.log(&AuctionEvents::auction_created(&params.token, &auction))?;

    host.state_mut().start_auction(params.token.clone(), auction);

    // Take custody of the token
    let receiver = Receiver::Contract(
        ctx.self_address(),
        OwnedEntrypointName::new_unchecked(ON_RECEIVING_CIS2.into()),
    );
    host.cis2_transfer(
        &params.token,
        NFT_AMOUNT,
        Address::Account(seller),
        receiver,
    )
    .map_err(handle_call_error)?;

    Ok(())
}

/// Commit to a hidden bid and escrow collateral for it.
///
/// Commitments are accepted from the auction start until the end of the reveal period. Committing again replaces
/// the unopened commitment together with its collateral. Collateral pulled for the replaced commitment stays in
/// escrow and is not accounted for the bid anymore.
///
/// It rejects if:
/// - Fails to parse `CommitBidParams` parameters.
/// - Sender is not an account.
/// - There is no auction for the token, or it is not accepting commitments.
/// - Collateral or commitment is zero.
/// - Sender has already opened a bid for this auction.
/// - Collateral can not be transferred from the sender.
#[receive(
    mutable,
    contract = "SealedBidAuction",
    name = "commitBid",
    parameter = "CommitBidParams",
    enable_logger
)]
fn contract_commit_bid<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ReceiveResult<()> {
    let params = CommitBidParams::deserial(&mut ctx.parameter_cursor())?;
    let bidder = sender_account(ctx)?;

    let deposit = host.state_mut().commit_bid(
        &params.token,
        bidder,
        params.commitment,
        params.collateral,
        ctx.metadata().slot_time(),
    )?;

    logger.log(&AuctionEvents::bid_committed(
        &params.token,
        deposit.index,
        &bidder,
        deposit.amount,
    ))?;

    let receiver = Receiver::Contract(
        ctx.self_address(),
        OwnedEntrypointName::new_unchecked(ON_RECEIVING_CIS2.into()),
    );
    host.cis2_transfer(
        &deposit.payment_token,
        deposit.amount,
        Address::Account(bidder),
        receiver,
    )
    .map_err(handle_call_error)?;

    Ok(())
}

/// Open a committed bid.
///
/// It rejects if:
/// - Fails to parse `RevealBidParams` parameters.
/// - Sender is not an account.
/// - There is no auction for the token, or it is not in the reveal period.
/// - Sender has no unopened commitment, or the bid and nonce do not open it.
/// - Bid exceeds the escrowed collateral.
#[receive(
    mutable,
    contract = "SealedBidAuction",
    name = "revealBid",
    parameter = "RevealBidParams",
    enable_logger
)]
fn contract_reveal_bid<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ReceiveResult<()> {
    let params = RevealBidParams::deserial(&mut ctx.parameter_cursor())?;
    let bidder = sender_account(ctx)?;

    let index = host.state_mut().reveal_bid(
        &params.token,
        bidder,
        params.bid_value,
        &params.nonce,
        ctx.metadata().slot_time(),
    )?;

    logger.log(&AuctionEvents::bid_revealed(
        &params.token,
        index,
        &bidder,
        params.bid_value,
    ))?;

    Ok(())
}

/// Settle the auction after the reveal period.
///
/// The seller receives the second highest bid, the winner receives the token and the rest of the collateral. If no
/// bid exceeded the reserve price, the token is returned to the seller. Can be called by any account.
///
/// It rejects if:
/// - Fails to parse `Token` parameter.
/// - Sender is not an account.
/// - There is no auction for the token, or the reveal period is not over.
/// - Auction is already settled.
/// - Any of the payouts fail.
#[receive(
    mutable,
    contract = "SealedBidAuction",
    name = "endAuction",
    parameter = "Token",
    enable_logger
)]
fn contract_end_auction<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ReceiveResult<()> {
    let token = Token::deserial(&mut ctx.parameter_cursor())?;
    sender_account(ctx)?;

    let settlement = host
        .state_mut()
        .settle(&token, ctx.metadata().slot_time())?;

    let custody = Address::Contract(ctx.self_address());

    match settlement {
        Settlement::Sold {
            index,
            seller,
            winner,
            payment_token,
            price,
            refund,
        } => {
            logger.log(&AuctionEvents::auction_ended(
                &token,
                index,
                Some(winner),
                price,
            ))?;

            host.cis2_transfer(&payment_token, price, custody, Receiver::Account(seller))
                .map_err(handle_call_error)?;

            if refund.0 > 0 {
                host.cis2_transfer(&payment_token, refund, custody, Receiver::Account(winner))
                    .map_err(handle_call_error)?;
            }

            host.cis2_transfer(&token, NFT_AMOUNT, custody, Receiver::Account(winner))
                .map_err(handle_call_error)?;
        }
        Settlement::Unsold { index, seller } => {
            logger.log(&AuctionEvents::auction_ended(
                &token,
                index,
                None,
                TokenAmountU64(0),
            ))?;

            host.cis2_transfer(&token, NFT_AMOUNT, custody, Receiver::Account(seller))
                .map_err(handle_call_error)?;
        }
    }

    Ok(())
}

/// Withdraw collateral of a bid that did not win.
///
/// Works for any past run of the auction, as long as the current run is over. Unopened bids are refunded as well.
///
/// It rejects if:
/// - Fails to parse `WithdrawCollateralParams` parameters.
/// - Sender is not an account.
/// - There is no auction for the token, or the reveal period of its current run is not over.
/// - Sender won the current run.
/// - Sender has no bid for the run, or it was already withdrawn.
#[receive(
    mutable,
    contract = "SealedBidAuction",
    name = "withdrawCollateral",
    parameter = "WithdrawCollateralParams",
    enable_logger
)]
fn contract_withdraw_collateral<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ReceiveResult<()> {
    let params = WithdrawCollateralParams::deserial(&mut ctx.parameter_cursor())?;
    let bidder = sender_account(ctx)?;

    let withdrawal = host.state_mut().withdraw_collateral(
        &params.token,
        params.index,
        bidder,
        ctx.metadata().slot_time(),
    )?;

    logger.log(&AuctionEvents::collateral_withdrawn(
        &params.token,
        params.index,
        &bidder,
        withdrawal.amount,
    ))?;

    host.cis2_transfer(
        &withdrawal.payment_token,
        withdrawal.amount,
        Address::Contract(ctx.self_address()),
        Receiver::Account(bidder),
    )
    .map_err(handle_call_error)?;

    Ok(())
}

#[receive(
    contract = "SealedBidAuction",
    name = "getAuction",
    parameter = "Token",
    return_value = "AuctionView"
)]
fn contract_get_auction<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<AuctionView> {
    let token = Token::deserial(&mut ctx.parameter_cursor())?;
    Ok(host.state().auction_view(&token)?)
}

/// View bid of an account. Missing bids have zero commitment and collateral.
#[receive(
    contract = "SealedBidAuction",
    name = "getBid",
    parameter = "GetBidParams",
    return_value = "BidView"
)]
fn contract_get_bid<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<BidView> {
    let params = GetBidParams::deserial(&mut ctx.parameter_cursor())?;
    Ok(host
        .state()
        .bid_view(&params.token, params.index, params.bidder))
}

/// View auction phase at the current slot time.
#[receive(
    contract = "SealedBidAuction",
    name = "getPhase",
    parameter = "Token",
    return_value = "AuctionPhase"
)]
fn contract_get_phase<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<AuctionPhase> {
    let token = Token::deserial(&mut ctx.parameter_cursor())?;
    Ok(host.state().phase(&token, ctx.metadata().slot_time()))
}

/// Accept CIS-2 tokens transferred into escrow.
#[receive(
    contract = "SealedBidAuction",
    name = "onReceivingCIS2",
    parameter = "OnReceivingCis2Params<ContractTokenId, ContractTokenAmount>"
)]
fn contract_on_cis2_received<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    _host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<()> {
    ensure!(
        matches!(ctx.sender(), Address::Contract(_)),
        CustomContractError::ContractOnly.into()
    );
    OnReceivingCis2Params::<ContractTokenId, ContractTokenAmount>::deserial(
        &mut ctx.parameter_cursor(),
    )?;
    Ok(())
}

fn sender_account(ctx: &impl HasReceiveContext) -> Result<AccountAddress, CustomContractError> {
    match ctx.sender() {
        Address::Account(account) => Ok(account),
        Address::Contract(_) => Err(CustomContractError::OnlyAccountAddress),
    }
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use crate::commitment::{compute_commitment, Commitment, Nonce, NONCE_SIZE};
    use crate::mock::*;
    use commons::{ContractBalanceOfQueryParams, AUCTION_CREATED_TAG, BID_COMMITTED_TAG};
    use concordium_cis2::{BalanceOfQueryResponse, TokenIdVec};
    use concordium_std::test_infrastructure::*;

    const AUCTION_CONTRACT: ContractAddress = ContractAddress {
        index: 100,
        subindex: 0,
    };
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

    const CREATED_AT: u64 = 10;
    const START: u64 = 1_000;
    const BID_PERIOD: u64 = 100;
    const REVEAL_PERIOD: u64 = 50;
    const BIDDING: u64 = START;
    const REVEAL: u64 = START + BID_PERIOD;
    const ENDED: u64 = START + BID_PERIOD + REVEAL_PERIOD;
    const RESERVE: u64 = 100;

    fn token() -> Token {
        Token::new(NFT_CONTRACT, TokenIdVec(vec![0, 1]))
    }

    fn payment_token() -> Token {
        Token::new(PAYMENT_CONTRACT, TokenIdVec(vec![]))
    }

    fn nonce(seed: u8) -> Nonce {
        Nonce([seed; NONCE_SIZE])
    }

    fn create_params(start: u64) -> CreateAuctionParams {
        CreateAuctionParams {
            token: token(),
            payment_token: payment_token(),
            start_time: Timestamp::from_timestamp_millis(start),
            bid_period: Duration::from_millis(BID_PERIOD),
            reveal_period: Duration::from_millis(REVEAL_PERIOD),
            reserve_price: TokenAmountU64(RESERVE),
        }
    }

    fn receive_ctx(sender: AccountAddress, slot_time: u64, parameter: &[u8]) -> TestReceiveContext {
        let mut ctx = TestReceiveContext::empty();
        ctx.set_sender(Address::Account(sender))
            .set_invoker(sender)
            .set_self_address(AUCTION_CONTRACT)
            .set_parameter(parameter)
            .set_metadata_slot_time(Timestamp::from_timestamp_millis(slot_time));
        ctx
    }

    fn default_host() -> TestHost<State<TestStateApi>> {
        let ctx = TestInitContext::empty();
        let mut state_builder = TestStateBuilder::new();

        let state = contract_init(&ctx, &mut state_builder)
            .expect_report("Failed during init_SealedBidAuction");

        TestHost::new(state, state_builder)
    }

    /// Mock both token contracts. The seller owns the auctioned NFT.
    fn setup_tokens(host: &mut TestHost<State<TestStateApi>>) -> TransferLog {
        let log = TransferLog::default();

        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked(String::from("balanceOf")),
            parse_and_map_mock::<ContractBalanceOfQueryParams, _, _>(|params| {
                let balances = params
                    .queries
                    .iter()
                    .map(|query| {
                        if query.address == Address::Account(SELLER) {
                            TokenAmountU64(1)
                        } else {
                            TokenAmountU64(0)
                        }
                    })
                    .collect();
                Some(BalanceOfQueryResponse(balances))
            }),
        );
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked(String::from("transfer")),
            recording_transfer_mock(NFT_CONTRACT, log.clone()),
        );
        host.setup_mock_entrypoint(
            PAYMENT_CONTRACT,
            OwnedEntrypointName::new_unchecked(String::from("transfer")),
            recording_transfer_mock(PAYMENT_CONTRACT, log.clone()),
        );

        log
    }

    fn nft_transfer(from: Address, to: Address) -> TransferRecord {
        TransferRecord {
            contract: NFT_CONTRACT,
            token_id: token().id,
            amount: 1,
            from,
            to,
        }
    }

    fn payment_transfer(amount: u64, from: Address, to: Address) -> TransferRecord {
        TransferRecord {
            contract: PAYMENT_CONTRACT,
            token_id: payment_token().id,
            amount,
            from,
            to,
        }
    }

    fn create_auction(
        host: &mut TestHost<State<TestStateApi>>,
        sender: AccountAddress,
        slot_time: u64,
        start: u64,
    ) -> ReceiveResult<()> {
        let bytes = to_bytes(&create_params(start));
        let ctx = receive_ctx(sender, slot_time, &bytes);
        let mut logger = TestLogger::init();
        contract_create_auction(&ctx, host, &mut logger)
    }

    fn commit_bid(
        host: &mut TestHost<State<TestStateApi>>,
        bidder: AccountAddress,
        slot_time: u64,
        bid: u64,
        collateral: u64,
        seed: u8,
    ) -> ReceiveResult<()> {
        let index = host
            .state()
            .auction_view(&token())
            .map(|view| view.index)
            .unwrap_or_default();
        let params = CommitBidParams {
            token: token(),
            commitment: compute_commitment(&nonce(seed), TokenAmountU64(bid), &token(), index),
            collateral: TokenAmountU64(collateral),
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(bidder, slot_time, &bytes);
        let mut logger = TestLogger::init();
        contract_commit_bid(&ctx, host, &mut logger)
    }

    fn reveal_bid(
        host: &mut TestHost<State<TestStateApi>>,
        bidder: AccountAddress,
        slot_time: u64,
        bid: u64,
        seed: u8,
    ) -> ReceiveResult<()> {
        let params = RevealBidParams {
            token: token(),
            bid_value: TokenAmountU64(bid),
            nonce: nonce(seed),
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(bidder, slot_time, &bytes);
        let mut logger = TestLogger::init();
        contract_reveal_bid(&ctx, host, &mut logger)
    }

    fn end_auction(
        host: &mut TestHost<State<TestStateApi>>,
        logger: &mut TestLogger,
        slot_time: u64,
    ) -> ReceiveResult<()> {
        let bytes = to_bytes(&token());
        let ctx = receive_ctx(CAROL, slot_time, &bytes);
        contract_end_auction(&ctx, host, logger)
    }

    fn withdraw_collateral(
        host: &mut TestHost<State<TestStateApi>>,
        bidder: AccountAddress,
        slot_time: u64,
        index: u64,
    ) -> ReceiveResult<()> {
        let params = WithdrawCollateralParams {
            token: token(),
            index: AuctionIndex(index),
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(bidder, slot_time, &bytes);
        let mut logger = TestLogger::init();
        contract_withdraw_collateral(&ctx, host, &mut logger)
    }

    fn get_phase(host: &TestHost<State<TestStateApi>>, slot_time: u64) -> AuctionPhase {
        let bytes = to_bytes(&token());
        let ctx = receive_ctx(CAROL, slot_time, &bytes);
        contract_get_phase(&ctx, host).expect_report("Phase is always available")
    }

    fn auction_view(host: &TestHost<State<TestStateApi>>) -> AuctionView {
        let bytes = to_bytes(&token());
        let ctx = receive_ctx(CAROL, CREATED_AT, &bytes);
        contract_get_auction(&ctx, host).expect_report("Auction exists")
    }

    fn bid_view(host: &TestHost<State<TestStateApi>>, bidder: AccountAddress, index: u64) -> BidView {
        let params = GetBidParams {
            token: token(),
            index: AuctionIndex(index),
            bidder,
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(CAROL, CREATED_AT, &bytes);
        contract_get_bid(&ctx, host).expect_report("Bid view never fails")
    }

    #[concordium_test]
    fn test_init() {
        let host = default_host();

        claim_eq!(get_phase(&host, CREATED_AT), AuctionPhase::NoAuction);

        let bytes = to_bytes(&token());
        let ctx = receive_ctx(CAROL, CREATED_AT, &bytes);
        claim_eq!(
            contract_get_auction(&ctx, &host),
            Err(CustomContractError::AuctionNotFound.into())
        );
    }

    #[concordium_test]
    fn test_create_auction() {
        let mut host = default_host();
        let transfers = setup_tokens(&mut host);

        let bytes = to_bytes(&create_params(START));
        let ctx = receive_ctx(SELLER, CREATED_AT, &bytes);
        let mut logger = TestLogger::init();
        let result = contract_create_auction(&ctx, &mut host, &mut logger);

        claim_eq!(result, Ok(()));
        claim_eq!(
            *transfers.borrow(),
            vec![nft_transfer(
                Address::Account(SELLER),
                Address::Contract(AUCTION_CONTRACT)
            )]
        );
        claim_eq!(logger.logs.len(), 1);
        claim_eq!(logger.logs[0][0], AUCTION_CREATED_TAG);

        let view = auction_view(&host);
        claim_eq!(view.seller, SELLER);
        claim_eq!(view.payment_token, payment_token());
        claim_eq!(view.highest_bid, TokenAmountU64(RESERVE));
        claim_eq!(view.second_highest_bid, TokenAmountU64(RESERVE));
        claim_eq!(view.highest_bidder, None);
        claim_eq!(view.index, AuctionIndex(1));
        claim_eq!(view.num_unrevealed_bids, 0);

        claim_eq!(get_phase(&host, CREATED_AT), AuctionPhase::Created);
        claim_eq!(get_phase(&host, BIDDING), AuctionPhase::Bidding);
        claim_eq!(get_phase(&host, REVEAL), AuctionPhase::Reveal);
        claim_eq!(get_phase(&host, ENDED), AuctionPhase::Ended);
    }

    #[concordium_test]
    fn test_create_auction_not_owner() {
        let mut host = default_host();
        let transfers = setup_tokens(&mut host);

        let result = create_auction(&mut host, ALICE, CREATED_AT, START);

        claim_eq!(result, Err(CustomContractError::NotAssetOwner.into()));
        claim!(transfers.borrow().is_empty());
        claim_eq!(get_phase(&host, CREATED_AT), AuctionPhase::NoAuction);
    }

    #[concordium_test]
    fn test_create_auction_checks_parameters_first() {
        let mut host = default_host();
        // Token contract reports no balance for anyone
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked(String::from("balanceOf")),
            parse_and_ok_mock::<ContractBalanceOfQueryParams, _>(BalanceOfQueryResponse(vec![
                TokenAmountU64(0),
            ])),
        );

        claim_eq!(
            create_auction(&mut host, SELLER, START, START),
            Err(CustomContractError::InvalidStartTime.into())
        );
        claim_eq!(
            create_auction(&mut host, SELLER, CREATED_AT, START),
            Err(CustomContractError::NotAssetOwner.into())
        );
    }

    #[concordium_test]
    fn test_create_auction_from_contract() {
        let mut host = default_host();
        setup_tokens(&mut host);

        let bytes = to_bytes(&create_params(START));
        let mut ctx = receive_ctx(SELLER, CREATED_AT, &bytes);
        ctx.set_sender(Address::Contract(PAYMENT_CONTRACT));
        let mut logger = TestLogger::init();

        claim_eq!(
            contract_create_auction(&ctx, &mut host, &mut logger),
            Err(CustomContractError::OnlyAccountAddress.into())
        );
    }

    #[concordium_test]
    fn test_create_auction_without_operator_rights() {
        let mut host = default_host();
        setup_tokens(&mut host);
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked(String::from("transfer")),
            rejecting_mock(),
        );

        claim_eq!(
            create_auction(&mut host, SELLER, CREATED_AT, START),
            Err(CustomContractError::InvokeContractError.into())
        );
    }

    #[concordium_test]
    fn test_create_auction_twice() {
        let mut host = default_host();
        setup_tokens(&mut host);

        claim_eq!(create_auction(&mut host, SELLER, CREATED_AT, START), Ok(()));
        claim_eq!(
            create_auction(&mut host, SELLER, CREATED_AT, START),
            Err(CustomContractError::AuctionAlreadyActive.into())
        );
        // Reveal period is over, but the auction was not settled yet
        claim_eq!(
            create_auction(&mut host, SELLER, ENDED, ENDED + 1),
            Err(CustomContractError::AuctionAlreadyActive.into())
        );
    }

    #[concordium_test]
    fn test_commit_bid() {
        let mut host = default_host();
        let transfers = setup_tokens(&mut host);
        claim_eq!(create_auction(&mut host, SELLER, CREATED_AT, START), Ok(()));
        transfers.borrow_mut().clear();

        let commitment = compute_commitment(&nonce(1), TokenAmountU64(300), &token(), AuctionIndex(1));
        let params = CommitBidParams {
            token: token(),
            commitment,
            collateral: TokenAmountU64(400),
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(ALICE, BIDDING, &bytes);
        let mut logger = TestLogger::init();
        let result = contract_commit_bid(&ctx, &mut host, &mut logger);

        claim_eq!(result, Ok(()));
        claim_eq!(
            *transfers.borrow(),
            vec![payment_transfer(
                400,
                Address::Account(ALICE),
                Address::Contract(AUCTION_CONTRACT)
            )]
        );
        claim_eq!(
            logger.logs,
            vec![to_bytes(&AuctionEvents::bid_committed(
                &token(),
                AuctionIndex(1),
                &ALICE,
                TokenAmountU64(400)
            ))]
        );
        claim_eq!(logger.logs[0][0], BID_COMMITTED_TAG);
        claim_eq!(
            bid_view(&host, ALICE, 1),
            BidView {
                commitment,
                collateral: TokenAmountU64(400),
            }
        );
        claim_eq!(auction_view(&host).num_unrevealed_bids, 1);
    }

    #[concordium_test]
    fn test_commit_bid_rejects_zero_values() {
        let mut host = default_host();
        setup_tokens(&mut host);
        claim_eq!(create_auction(&mut host, SELLER, CREATED_AT, START), Ok(()));

        claim_eq!(
            commit_bid(&mut host, ALICE, BIDDING, 0, 0, 1),
            Err(CustomContractError::ZeroCollateral.into())
        );

        let params = CommitBidParams {
            token: token(),
            commitment: Commitment::ZERO,
            collateral: TokenAmountU64(10),
        };
        let bytes = to_bytes(&params);
        let ctx = receive_ctx(ALICE, BIDDING, &bytes);
        let mut logger = TestLogger::init();
        claim_eq!(
            contract_commit_bid(&ctx, &mut host, &mut logger),
            Err(CustomContractError::ZeroCommitment.into())
        );
    }

    #[concordium_test]
    fn test_commit_bid_without_allowance() {
        let mut host = default_host();
        setup_tokens(&mut host);
        claim_eq!(create_auction(&mut host, SELLER, CREATED_AT, START), Ok(()));
        host.setup_mock_entrypoint(
            PAYMENT_CONTRACT,
            OwnedEntrypointName::new_unchecked(String::from("transfer")),
            rejecting_mock(),
        );

        claim_eq!(
            commit_bid(&mut host, ALICE, BIDDING, 300, 300, 1),
            Err(CustomContractError::InvokeContractError.into())
        );
    }

    #[concordium_test]
    fn test_out_of_window_calls() {
        let mut host = default_host();
        setup_tokens(&mut host);

        claim_eq!(
            commit_bid(&mut host, ALICE, BIDDING, 300, 300, 1),
            Err(CustomContractError::AuctionNotFound.into())
        );

        claim_eq!(create_auction(&mut host, SELLER, CREATED_AT, START), Ok(()));

        claim_eq!(
            commit_bid(&mut host, ALICE, START - 1, 300, 300, 1),
            Err(CustomContractError::BiddingNotStarted.into())
        );
        claim_eq!(commit_bid(&mut host, ALICE, BIDDING, 300, 300, 1), Ok(()));
        claim_eq!(
            reveal_bid(&mut host, ALICE, REVEAL - 1, 300, 1),
            Err(CustomContractError::RevealNotStarted.into())
        );

        let mut logger = TestLogger::init();
        claim_eq!(
            end_auction(&mut host, &mut logger, ENDED - 1),
            Err(CustomContractError::RevealPhaseNotOver.into())
        );
        claim_eq!(
            withdraw_collateral(&mut host, ALICE, ENDED - 1, 1),
            Err(CustomContractError::RevealPhaseNotOver.into())
        );

        claim_eq!(
            commit_bid(&mut host, BOB, ENDED, 300, 300, 2),
            Err(CustomContractError::BiddingEnded.into())
        );
        claim_eq!(
            reveal_bid(&mut host, ALICE, ENDED, 300, 1),
            Err(CustomContractError::RevealEnded.into())
        );
    }

    #[concordium_test]
    fn test_reveal_bid() {
        let mut host = default_host();
        setup_tokens(&mut host);
        claim_eq!(create_auction(&mut host, SELLER, CREATED_AT, START), Ok(()));
        claim_eq!(commit_bid(&mut host, ALICE, BIDDING, 300, 300, 1), Ok(()));
        claim_eq!(commit_bid(&mut host, BOB, BIDDING, 500, 400, 2), Ok(()));

        // Wrong nonce
        claim_eq!(
            reveal_bid(&mut host, ALICE, REVEAL, 300, 9),
            Err(CustomContractError::CommitmentMismatch.into())
        );
        // Wrong value
        claim_eq!(
            reveal_bid(&mut host, ALICE, REVEAL, 301, 1),
            Err(CustomContractError::CommitmentMismatch.into())
        );
        // Bid is not covered by collateral
        claim_eq!(
            reveal_bid(&mut host, BOB, REVEAL, 500, 2),
            Err(CustomContractError::InsufficientCollateral.into())
        );
        claim_eq!(
            reveal_bid(&mut host, CAROL, REVEAL, 300, 3),
            Err(CustomContractError::NoCommitment.into())
        );

        // Bid equal to collateral is covered
        let bytes = to_bytes(&RevealBidParams {
            token: token(),
            bid_value: TokenAmountU64(300),
            nonce: nonce(1),
        });
        let ctx = receive_ctx(ALICE, REVEAL, &bytes);
        let mut logger = TestLogger::init();
        claim_eq!(contract_reveal_bid(&ctx, &mut host, &mut logger), Ok(()));
        claim_eq!(
            logger.logs,
            vec![to_bytes(&AuctionEvents::bid_revealed(
                &token(),
                AuctionIndex(1),
                &ALICE,
                TokenAmountU64(300)
            ))]
        );

        let view = auction_view(&host);
        claim_eq!(view.highest_bidder, Some(ALICE));
        claim_eq!(view.highest_bid, TokenAmountU64(300));
        claim_eq!(view.second_highest_bid, TokenAmountU64(RESERVE));
        claim_eq!(view.num_unrevealed_bids, 1);
        claim_eq!(bid_view(&host, ALICE, 1).commitment, Commitment::ZERO);
        claim_eq!(bid_view(&host, ALICE, 1).collateral, TokenAmountU64(300));

        claim_eq!(
            reveal_bid(&mut host, ALICE, REVEAL, 300, 1),
            Err(CustomContractError::NoCommitment.into())
        );
    }

    #[concordium_test]
    fn test_end_to_end() {
        let mut host = default_host();
        let transfers = setup_tokens(&mut host);
        claim_eq!(create_auction(&mut host, SELLER, CREATED_AT, START), Ok(()));

        claim_eq!(commit_bid(&mut host, ALICE, BIDDING, 500, 500, 1), Ok(()));
        claim_eq!(commit_bid(&mut host, BOB, BIDDING, 300, 300, 2), Ok(()));
        claim_eq!(reveal_bid(&mut host, ALICE, REVEAL, 500, 1), Ok(()));
        claim_eq!(reveal_bid(&mut host, BOB, REVEAL, 300, 2), Ok(()));
        transfers.borrow_mut().clear();

        let mut logger = TestLogger::init();
        claim_eq!(end_auction(&mut host, &mut logger, ENDED), Ok(()));

        let custody = Address::Contract(AUCTION_CONTRACT);
        claim_eq!(
            *transfers.borrow(),
            vec![
                payment_transfer(300, custody, Address::Account(SELLER)),
                payment_transfer(200, custody, Address::Account(ALICE)),
                nft_transfer(custody, Address::Account(ALICE)),
            ]
        );
        claim_eq!(
            logger.logs,
            vec![to_bytes(&AuctionEvents::auction_ended(
                &token(),
                AuctionIndex(1),
                Some(ALICE),
                TokenAmountU64(300)
            ))]
        );
        claim!(auction_view(&host).settled);
        transfers.borrow_mut().clear();

        claim_eq!(
            withdraw_collateral(&mut host, ALICE, ENDED, 1),
            Err(CustomContractError::WinnerCannotWithdraw.into())
        );
        claim_eq!(withdraw_collateral(&mut host, BOB, ENDED, 1), Ok(()));
        claim_eq!(
            withdraw_collateral(&mut host, BOB, ENDED, 1),
            Err(CustomContractError::AlreadyWithdrawn.into())
        );
        claim_eq!(
            *transfers.borrow(),
            vec![payment_transfer(300, custody, Address::Account(BOB))]
        );
    }

    #[concordium_test]
    fn test_exact_collateral_no_refund() {
        let mut host = default_host();
        let transfers = setup_tokens(&mut host);
        claim_eq!(create_auction(&mut host, SELLER, CREATED_AT, START), Ok(()));

        claim_eq!(commit_bid(&mut host, ALICE, BIDDING, 250, 250, 1), Ok(()));
        claim_eq!(reveal_bid(&mut host, ALICE, REVEAL, 250, 1), Ok(()));
        transfers.borrow_mut().clear();

        let mut logger = TestLogger::init();
        claim_eq!(end_auction(&mut host, &mut logger, ENDED), Ok(()));

        // Single bidder pays the reserve price and gets the rest back
        let custody = Address::Contract(AUCTION_CONTRACT);
        claim_eq!(
            *transfers.borrow(),
            vec![
                payment_transfer(RESERVE, custody, Address::Account(SELLER)),
                payment_transfer(150, custody, Address::Account(ALICE)),
                nft_transfer(custody, Address::Account(ALICE)),
            ]
        );
    }

    #[concordium_test]
    fn test_no_qualifying_bids() {
        let mut host = default_host();
        let transfers = setup_tokens(&mut host);
        claim_eq!(create_auction(&mut host, SELLER, CREATED_AT, START), Ok(()));

        claim_eq!(commit_bid(&mut host, ALICE, BIDDING, 80, 80, 1), Ok(()));
        claim_eq!(commit_bid(&mut host, BOB, BIDDING, 400, 400, 2), Ok(()));
        claim_eq!(reveal_bid(&mut host, ALICE, REVEAL, 80, 1), Ok(()));
        // Bob never reveals
        transfers.borrow_mut().clear();

        let mut logger = TestLogger::init();
        claim_eq!(end_auction(&mut host, &mut logger, ENDED), Ok(()));

        let custody = Address::Contract(AUCTION_CONTRACT);
        claim_eq!(
            *transfers.borrow(),
            vec![nft_transfer(custody, Address::Account(SELLER))]
        );
        claim_eq!(
            logger.logs,
            vec![to_bytes(&AuctionEvents::auction_ended(
                &token(),
                AuctionIndex(1),
                None,
                TokenAmountU64(0)
            ))]
        );
        transfers.borrow_mut().clear();

        // Unopened bids are refunded as well
        claim_eq!(withdraw_collateral(&mut host, ALICE, ENDED, 1), Ok(()));
        claim_eq!(withdraw_collateral(&mut host, BOB, ENDED, 1), Ok(()));
        claim_eq!(
            withdraw_collateral(&mut host, CAROL, ENDED, 1),
            Err(CustomContractError::NoCommitment.into())
        );
        claim_eq!(
            *transfers.borrow(),
            vec![
                payment_transfer(80, custody, Address::Account(ALICE)),
                payment_transfer(400, custody, Address::Account(BOB)),
            ]
        );
    }

    #[concordium_test]
    fn test_end_auction_twice() {
        let mut host = default_host();
        let transfers = setup_tokens(&mut host);
        claim_eq!(create_auction(&mut host, SELLER, CREATED_AT, START), Ok(()));
        claim_eq!(commit_bid(&mut host, ALICE, BIDDING, 500, 500, 1), Ok(()));
        claim_eq!(reveal_bid(&mut host, ALICE, REVEAL, 500, 1), Ok(()));

        let mut logger = TestLogger::init();
        claim_eq!(end_auction(&mut host, &mut logger, ENDED), Ok(()));
        transfers.borrow_mut().clear();

        let mut logger = TestLogger::init();
        claim_eq!(
            end_auction(&mut host, &mut logger, ENDED + 1),
            Err(CustomContractError::AuctionAlreadySettled.into())
        );
        claim!(transfers.borrow().is_empty());
        claim!(logger.logs.is_empty());
    }

    #[concordium_test]
    fn test_auction_rerun() {
        let mut host = default_host();
        let transfers = setup_tokens(&mut host);
        claim_eq!(create_auction(&mut host, SELLER, CREATED_AT, START), Ok(()));
        claim_eq!(commit_bid(&mut host, ALICE, BIDDING, 300, 300, 1), Ok(()));
        claim_eq!(commit_bid(&mut host, BOB, BIDDING, 200, 200, 2), Ok(()));

        // Nobody reveals, token goes back to the seller
        let mut logger = TestLogger::init();
        claim_eq!(end_auction(&mut host, &mut logger, ENDED), Ok(()));

        let second_start = ENDED + START;
        claim_eq!(
            create_auction(&mut host, SELLER, ENDED, second_start),
            Ok(())
        );
        claim_eq!(auction_view(&host).index, AuctionIndex(2));

        // Previous run commitments do not carry over
        claim_eq!(
            reveal_bid(&mut host, ALICE, second_start + BID_PERIOD, 300, 1),
            Err(CustomContractError::NoCommitment.into())
        );
        claim_eq!(
            bid_view(&host, ALICE, 2),
            BidView {
                commitment: Commitment::ZERO,
                collateral: TokenAmountU64(0),
            }
        );

        let second_end = second_start + BID_PERIOD + REVEAL_PERIOD;
        claim_eq!(
            withdraw_collateral(&mut host, BOB, second_end - 1, 1),
            Err(CustomContractError::RevealPhaseNotOver.into())
        );
        transfers.borrow_mut().clear();
        claim_eq!(withdraw_collateral(&mut host, BOB, second_end, 1), Ok(()));
        claim_eq!(
            *transfers.borrow(),
            vec![payment_transfer(
                200,
                Address::Contract(AUCTION_CONTRACT),
                Address::Account(BOB)
            )]
        );
    }

    #[concordium_test]
    fn test_on_receiving_cis2() {
        let host = default_host();
        let params = OnReceivingCis2Params {
            token_id: token().id,
            amount: TokenAmountU64(1),
            from: Address::Account(SELLER),
            data: concordium_cis2::AdditionalData::empty(),
        };
        let bytes = to_bytes(&params);

        let mut ctx = receive_ctx(SELLER, CREATED_AT, &bytes);
        claim_eq!(
            contract_on_cis2_received(&ctx, &host),
            Err(CustomContractError::ContractOnly.into())
        );

        ctx.set_sender(Address::Contract(NFT_CONTRACT));
        claim_eq!(contract_on_cis2_received(&ctx, &host), Ok(()));
    }
}
