use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::ForestError;

/// Owner and the single authorized signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    owner: Address,
    signer: Option<Address>,
}

impl AccessControl {
    pub fn new(owner: Address) -> Result<Self, ForestError> {
        if owner.is_zero() {
            return Err(ForestError::ZeroAddress);
        }
        Ok(Self {
            owner,
            signer: None,
        })
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn signer(&self) -> Option<Address> {
        self.signer
    }

    pub fn ensure_owner(&self, caller: Address) -> Result<(), ForestError> {
        if caller != self.owner {
            return Err(ForestError::Unauthorized);
        }
        Ok(())
    }

    /// The signer every action must be authorized by. An unset signer
    /// authorizes nothing.
    pub fn authorized_signer(&self) -> Result<Address, ForestError> {
        self.signer.ok_or(ForestError::InvalidSignature)
    }

    /// Replace the signer, returning the previous one.
    pub fn set_signer(
        &mut self,
        caller: Address,
        signer: Address,
    ) -> Result<Option<Address>, ForestError> {
        self.ensure_owner(caller)?;
        if signer.is_zero() {
            return Err(ForestError::ZeroAddress);
        }
        Ok(self.signer.replace(signer))
    }

    /// One-step ownership handover, returning the previous owner.
    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        new_owner: Address,
    ) -> Result<Address, ForestError> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(ForestError::ZeroAddress);
        }
        Ok(std::mem::replace(&mut self.owner, new_owner))
    }
}
