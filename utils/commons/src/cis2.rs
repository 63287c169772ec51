use super::*;

/// Calls into CIS-2 token contracts. Used for custody of auctioned NFTs as well as fungible collateral.
pub trait HostCis2Ext<S>: HasHost<S> {
    /// Balance of `address` for a single token.
    fn cis2_balance_of(
        &self,
        token: &Token,
        address: Address,
    ) -> Result<ContractTokenAmount, ContractReadError<Self::ReturnValueType>> {
        let params = ContractBalanceOfQueryParams {
            queries: vec![BalanceOfQuery {
                token_id: token.id.clone(),
                address,
            }],
        };

        let mut response = self
            .invoke_contract_read_only(
                &token.contract,
                &params,
                EntrypointName::new_unchecked("balanceOf"),
                Amount::zero(),
            )
            .map_err(ContractReadError::Call)?
            .ok_or(ContractReadError::Compatibility)?;

        let mut balances = ContractBalanceOfQueryResponse::deserial(&mut response)
            .map_err(|_| ContractReadError::Parse)?;

        // Exactly one balance is expected for a single query
        ensure_eq!(balances.0.len(), 1, ContractReadError::Compatibility);
        balances.0.pop().ok_or(ContractReadError::Compatibility)
    }

    /// Transfer `amount` of `token` between addresses. The caller has to be `from` or an operator of `from`.
    fn cis2_transfer(
        &mut self,
        token: &Token,
        amount: ContractTokenAmount,
        from: Address,
        to: Receiver,
    ) -> Result<(), CallContractError<Self::ReturnValueType>> {
        let params: TransferParameter = TransferParams(vec![Transfer {
            token_id: token.id.clone(),
            amount,
            from,
            to,
            data: AdditionalData::empty(),
        }]);

        self.invoke_contract(
            &token.contract,
            &params,
            EntrypointName::new_unchecked("transfer"),
            Amount::zero(),
        )?;

        Ok(())
    }
}

impl<S, H: HasHost<S>> HostCis2Ext<S> for H {}
