//! Mocked CIS-2 token contracts for unit tests.
use std::cell::RefCell;
use std::rc::Rc;

use commons::{ContractTokenId, TransferParameter};
use concordium_std::test_infrastructure::MockFn;
use concordium_std::*;

/// Single transfer received by a mocked token contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub contract: ContractAddress,
    pub token_id: ContractTokenId,
    pub amount: u64,
    pub from: Address,
    pub to: Address,
}

/// Transfers shared between all mocked token contracts, in invocation order.
pub type TransferLog = Rc<RefCell<Vec<TransferRecord>>>;

pub fn parse_and_ok_mock<D: Deserial, S>(
    return_value: impl Clone + Serial + 'static,
) -> MockFn<S> {
    MockFn::new(move |parameter, _amount, _balance, _state| {
        D::deserial(&mut Cursor::new(parameter)).map_err(|_| CallContractError::Trap)?;
        Ok((false, Some(return_value.clone())))
    })
}

pub fn parse_and_map_mock<D: Deserial, T: Serial, S>(
    f: impl Fn(&D) -> Option<T> + 'static,
) -> MockFn<S> {
    MockFn::new(move |parameter, _, _, _state| {
        let value =
            D::deserial(&mut Cursor::new(parameter)).map_err(|_| CallContractError::Trap)?;
        f(&value)
            .map(|r| (false, Some(r)))
            .ok_or(CallContractError::Trap)
    })
}

/// CIS-2 `transfer` entrypoint that accepts every transfer and appends it to `log`.
pub fn recording_transfer_mock<S>(contract: ContractAddress, log: TransferLog) -> MockFn<S> {
    MockFn::new(move |parameter, _, _, _state| {
        let params = TransferParameter::deserial(&mut Cursor::new(parameter))
            .map_err(|_| CallContractError::Trap)?;

        let mut log = log.borrow_mut();
        for transfer in params.0 {
            let to = transfer.to.address();
            log.push(TransferRecord {
                contract,
                token_id: transfer.token_id,
                amount: transfer.amount.0,
                from: transfer.from,
                to,
            });
        }

        Ok((false, Some(())))
    })
}

/// Entrypoint that rejects every call, e.g. a transfer without operator rights.
pub fn rejecting_mock<S>() -> MockFn<S> {
    MockFn::new(|_, _, _, _state| -> CallContractResult<()> {
        Err(CallContractError::LogicReject {
            reason: -1,
            return_value: (),
        })
    })
}
