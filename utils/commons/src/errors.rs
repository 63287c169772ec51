use super::*;

/// The custom errors the contract can produce.
#[derive(Serialize, Debug, PartialEq, Eq, Reject, SchemaType)]
pub enum CustomContractError {
    /// Failed parsing the parameter (Error code: -1).
    #[from(ParseError)]
    ParseParams,
    /// Failed logging: Log is full (Error code: -2).
    LogFull,
    /// Failed logging: Log is malformed (Error code: -3).
    LogMalformed,
    /// Only account addresses can call this function (Error code: -4).
    OnlyAccountAddress,
    /// This function must only be called by a contract (Error code: -5)
    ContractOnly,
    /// Failed to invoke a contract (Error code: -6).
    InvokeContractError,
    /// Incompatible contract (Error code: -7)
    Incompatible,
    /// Token already has an auction that is running or not settled yet (Error code: -8)
    AuctionAlreadyActive,
    /// Auction start time must be in the future (Error code: -9)
    InvalidStartTime,
    /// Bidding period must be non-zero (Error code: -10)
    InvalidBidPeriod,
    /// Reveal period must be non-zero (Error code: -11)
    InvalidRevealPeriod,
    /// Reserve price must be non-zero (Error code: -12)
    InvalidReservePrice,
    /// Sender does not own the token put up for auction (Error code: -13)
    NotAssetOwner,
    /// No auction exists for the token (Error code: -14)
    AuctionNotFound,
    /// Auction has not started accepting bids yet (Error code: -15)
    BiddingNotStarted,
    /// Auction does not accept bids anymore (Error code: -16)
    BiddingEnded,
    /// Bid must be backed by non-zero collateral (Error code: -17)
    ZeroCollateral,
    /// All-zero commitment is reserved (Error code: -18)
    ZeroCommitment,
    /// Bid was already opened and can not be replaced (Error code: -19)
    BidAlreadyRevealed,
    /// Reveal period has not started yet (Error code: -20)
    RevealNotStarted,
    /// Reveal period is over (Error code: -21)
    RevealEnded,
    /// Sender has no unopened bid for this auction (Error code: -22)
    NoCommitment,
    /// Revealed bid and nonce do not match the commitment (Error code: -23)
    CommitmentMismatch,
    /// Revealed bid exceeds posted collateral (Error code: -24)
    InsufficientCollateral,
    /// Operation is only allowed after the reveal period (Error code: -25)
    RevealPhaseNotOver,
    /// Auction was already settled (Error code: -26)
    AuctionAlreadySettled,
    /// Auction winner collateral is paid out on settlement (Error code: -27)
    WinnerCannotWithdraw,
    /// Collateral was already withdrawn or paid out (Error code: -28)
    AlreadyWithdrawn,
    /// Arithmetic overflow or underflow on token amounts (Error code: -29)
    AmountOverflow,
}

/// Mapping the logging errors to CustomContractError.
impl From<LogError> for CustomContractError {
    fn from(le: LogError) -> Self {
        match le {
            LogError::Full => Self::LogFull,
            LogError::Malformed => Self::LogMalformed,
        }
    }
}

/// Mapping errors related to contract invocations to CustomContractError.
impl<T> From<CallContractError<T>> for CustomContractError {
    fn from(_cce: CallContractError<T>) -> Self {
        Self::InvokeContractError
    }
}

/// Failure of a read-only query to another contract.
#[derive(Debug)]
pub enum ContractReadError<R> {
    Call(CallContractError<R>),
    Compatibility,
    Parse,
}

/// Map a failed contract invocation to a rejection of the calling entrypoint.
pub fn handle_call_error<R>(error: CallContractError<R>) -> Reject {
    match error {
        CallContractError::MissingEntrypoint | CallContractError::MessageFailed => {
            CustomContractError::Incompatible.into()
        }
        CallContractError::LogicReject { .. } => CustomContractError::InvokeContractError.into(),
        e => e.into(),
    }
}

/// Map a failed read-only query to a rejection of the calling entrypoint.
pub fn handle_read_error<R>(error: ContractReadError<R>) -> Reject {
    match error {
        ContractReadError::Call(e) => handle_call_error(e),
        ContractReadError::Compatibility => CustomContractError::Incompatible.into(),
        ContractReadError::Parse => CustomContractError::InvokeContractError.into(),
    }
}

#[concordium_cfg_test]
mod tests {
    use super::*;

    #[concordium_test]
    fn test_error_codes() {
        claim_eq!(
            Reject::from(CustomContractError::ParseParams).error_code.get(),
            -1
        );
        claim_eq!(
            Reject::from(CustomContractError::AuctionAlreadyActive)
                .error_code
                .get(),
            -8
        );
        claim_eq!(
            Reject::from(CustomContractError::AmountOverflow)
                .error_code
                .get(),
            -29
        );
    }

    #[concordium_test]
    fn test_call_error_mapping() {
        claim_eq!(
            handle_call_error(CallContractError::<()>::MissingEntrypoint),
            Reject::from(CustomContractError::Incompatible)
        );
        claim_eq!(
            handle_call_error(CallContractError::LogicReject {
                reason: -1,
                return_value: ()
            }),
            Reject::from(CustomContractError::InvokeContractError)
        );
        claim_eq!(
            handle_read_error(ContractReadError::<()>::Compatibility),
            Reject::from(CustomContractError::Incompatible)
        );
        claim_eq!(
            handle_read_error(ContractReadError::<()>::Parse),
            Reject::from(CustomContractError::InvokeContractError)
        );
    }
}
