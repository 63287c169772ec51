use super::*;

/// Contract token ID type.
pub type ContractTokenId = TokenIdVec;

/// Token amount type. CIS-2 amounts are LEB128 encoded on the wire, so this also reads balances of contracts using
/// smaller amount types.
pub type ContractTokenAmount = TokenAmountU64;

pub type TransferParameter = TransferParams<ContractTokenId, ContractTokenAmount>;

pub type ContractBalanceOfQueryParams = BalanceOfQueryParams<ContractTokenId>;

pub type ContractBalanceOfQueryResponse = BalanceOfQueryResponse<ContractTokenAmount>;

/// CIS-2 token, identified by its contract and id within that contract.
#[derive(Debug, Serialize, SchemaType, PartialEq, Eq, Clone)]
pub struct Token {
    pub contract: ContractAddress,
    pub id: ContractTokenId,
}

impl Token {
    pub fn new(contract: ContractAddress, id: ContractTokenId) -> Self {
        Self { contract, id }
    }
}
