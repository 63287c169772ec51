//! Commit-reveal codec. A bid is committed as a truncated Keccak-256 digest of the bid value, a secret nonce and
//! the auction run it belongs to, so that a commitment can neither be opened to another value nor replayed on
//! another token or a later run of the same token.
use commons::{ContractTokenAmount, Token};
use concordium_std::*;
use sha3::{Digest, Keccak256};

use crate::external::AuctionIndex;

/// Commitment size in bytes.
pub const COMMITMENT_SIZE: usize = 20;

/// Nonce size in bytes.
pub const NONCE_SIZE: usize = 32;

/// Bid commitment. All zeroes stand for "no commitment".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Commitment(pub [u8; COMMITMENT_SIZE]);

impl Commitment {
    pub const ZERO: Commitment = Commitment([0; COMMITMENT_SIZE]);

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// Secret chosen by the bidder, disclosed on reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Serial for Commitment {
    fn serial<W: Write>(&self, out: &mut W) -> Result<(), W::Err> {
        out.write_all(&self.0)
    }
}

impl Deserial for Commitment {
    fn deserial<R: Read>(source: &mut R) -> ParseResult<Self> {
        let mut bytes = [0u8; COMMITMENT_SIZE];
        for byte in bytes.iter_mut() {
            *byte = source.read_u8()?;
        }
        Ok(Commitment(bytes))
    }
}

impl SchemaType for Commitment {
    fn get_type() -> schema::Type {
        schema::Type::Array(COMMITMENT_SIZE as u32, Box::new(schema::Type::U8))
    }
}

impl Serial for Nonce {
    fn serial<W: Write>(&self, out: &mut W) -> Result<(), W::Err> {
        out.write_all(&self.0)
    }
}

impl Deserial for Nonce {
    fn deserial<R: Read>(source: &mut R) -> ParseResult<Self> {
        let mut bytes = [0u8; NONCE_SIZE];
        for byte in bytes.iter_mut() {
            *byte = source.read_u8()?;
        }
        Ok(Nonce(bytes))
    }
}

impl SchemaType for Nonce {
    fn get_type() -> schema::Type {
        schema::Type::Array(NONCE_SIZE as u32, Box::new(schema::Type::U8))
    }
}

/// Hashed data. Off-chain clients compute commitments over the same serialization.
#[derive(Serial)]
struct CommitmentPreimage<'a> {
    nonce: &'a Nonce,
    bid_value: u64,
    token: &'a Token,
    index: AuctionIndex,
}

pub fn compute_commitment(
    nonce: &Nonce,
    bid_value: ContractTokenAmount,
    token: &Token,
    index: AuctionIndex,
) -> Commitment {
    let preimage = to_bytes(&CommitmentPreimage {
        nonce,
        bid_value: bid_value.0,
        token,
        index,
    });

    let mut hasher = Keccak256::default();
    hasher.update(&preimage);
    let digest = hasher.finalize();

    let mut commitment = [0u8; COMMITMENT_SIZE];
    commitment.copy_from_slice(&digest[..COMMITMENT_SIZE]);
    Commitment(commitment)
}

/// Check that `nonce` and `bid_value` open `commitment` for the given auction run.
pub fn verify(
    commitment: &Commitment,
    nonce: &Nonce,
    bid_value: ContractTokenAmount,
    token: &Token,
    index: AuctionIndex,
) -> bool {
    compute_commitment(nonce, bid_value, token, index) == *commitment
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use concordium_cis2::{TokenAmountU64, TokenIdVec};

    const NFT_CONTRACT: ContractAddress = ContractAddress {
        index: 1,
        subindex: 0,
    };

    fn token() -> Token {
        Token::new(NFT_CONTRACT, TokenIdVec(vec![0, 1]))
    }

    #[concordium_test]
    fn test_commitment_opens() {
        let nonce = Nonce([7; NONCE_SIZE]);
        let commitment = compute_commitment(&nonce, TokenAmountU64(500), &token(), AuctionIndex(1));

        claim!(!commitment.is_zero());
        claim!(verify(
            &commitment,
            &nonce,
            TokenAmountU64(500),
            &token(),
            AuctionIndex(1)
        ));
        // Deterministic
        claim_eq!(
            commitment,
            compute_commitment(&nonce, TokenAmountU64(500), &token(), AuctionIndex(1))
        );
    }

    #[concordium_test]
    fn test_commitment_binds_every_input() {
        let nonce = Nonce([7; NONCE_SIZE]);
        let commitment = compute_commitment(&nonce, TokenAmountU64(500), &token(), AuctionIndex(1));

        // Other nonce
        claim!(!verify(
            &commitment,
            &Nonce([8; NONCE_SIZE]),
            TokenAmountU64(500),
            &token(),
            AuctionIndex(1)
        ));
        // Other bid value
        claim!(!verify(
            &commitment,
            &nonce,
            TokenAmountU64(501),
            &token(),
            AuctionIndex(1)
        ));
        // Other token id
        claim!(!verify(
            &commitment,
            &nonce,
            TokenAmountU64(500),
            &Token::new(NFT_CONTRACT, TokenIdVec(vec![0, 2])),
            AuctionIndex(1)
        ));
        // Same token id on another contract
        claim!(!verify(
            &commitment,
            &nonce,
            TokenAmountU64(500),
            &Token::new(
                ContractAddress {
                    index: 2,
                    subindex: 0
                },
                TokenIdVec(vec![0, 1])
            ),
            AuctionIndex(1)
        ));
        // Later run of the same auction
        claim!(!verify(
            &commitment,
            &nonce,
            TokenAmountU64(500),
            &token(),
            AuctionIndex(2)
        ));
    }

    #[concordium_test]
    fn test_zero_commitment_never_verifies() {
        let nonce = Nonce([0; NONCE_SIZE]);
        claim!(!verify(
            &Commitment::ZERO,
            &nonce,
            TokenAmountU64(0),
            &token(),
            AuctionIndex(0)
        ));
    }

    #[concordium_test]
    fn test_commitment_parameter_layout() {
        let commitment = Commitment([3; COMMITMENT_SIZE]);
        let bytes = to_bytes(&commitment);

        // Raw bytes without length prefix
        claim_eq!(bytes.len(), COMMITMENT_SIZE);
        claim_eq!(from_bytes::<Commitment>(&bytes), Ok(commitment));
    }
}
