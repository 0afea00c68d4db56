use k256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};

use crate::actions::{
    ActionKind, ActionParams, Authorized, RewardParams, SigninParams, StealParams,
    TurntableParams,
};
use crate::address::Address;
use crate::clock::Clock;
use crate::eip712::{self, Domain, RawSignature};
use crate::error::{CodecError, ForestError};
use crate::forest::MintForest;

/// One signed action as exchanged between signer, user and ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAction<P> {
    pub user: Address,
    pub params: P,
    pub signature: RawSignature,
}

impl<P: ActionParams> SignedAction<P> {
    pub fn sign(
        domain: &Domain,
        key: &SigningKey,
        user: Address,
        params: P,
    ) -> Result<Self, CodecError> {
        let signature = eip712::sign(domain, &Authorized::new(user, params), key)?;
        Ok(Self {
            user,
            params,
            signature: signature.into(),
        })
    }

    pub fn recover(&self, domain: &Domain) -> Result<Address, ForestError> {
        eip712::recover(
            domain,
            &Authorized::new(self.user, self.params),
            self.signature.as_bytes(),
        )
    }
}

/// JSON form: `{"signin": {"user": "0x…", "params": {…}, "signature": "0x…"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionRequest {
    Signin(SignedAction<SigninParams>),
    Steal(SignedAction<StealParams>),
    OpenReward(SignedAction<RewardParams>),
    Turntable(SignedAction<TurntableParams>),
}

impl ActionRequest {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRequest::Signin(_) => ActionKind::Signin,
            ActionRequest::Steal(_) => ActionKind::Steal,
            ActionRequest::OpenReward(_) => ActionKind::OpenReward,
            ActionRequest::Turntable(_) => ActionKind::Turntable,
        }
    }

    pub fn user(&self) -> Address {
        match self {
            ActionRequest::Signin(action) => action.user,
            ActionRequest::Steal(action) => action.user,
            ActionRequest::OpenReward(action) => action.user,
            ActionRequest::Turntable(action) => action.user,
        }
    }

    pub fn recover(&self, domain: &Domain) -> Result<Address, ForestError> {
        match self {
            ActionRequest::Signin(action) => action.recover(domain),
            ActionRequest::Steal(action) => action.recover(domain),
            ActionRequest::OpenReward(action) => action.recover(domain),
            ActionRequest::Turntable(action) => action.recover(domain),
        }
    }

    /// Submit to `forest` with the request's `user` as the caller.
    pub fn apply(&self, forest: &mut MintForest, clock: &dyn Clock) -> Result<(), ForestError> {
        match self {
            ActionRequest::Signin(action) => {
                forest.signin(clock, action.user, action.params, action.signature.as_bytes())
            }
            ActionRequest::Steal(action) => {
                forest.steal(clock, action.user, action.params, action.signature.as_bytes())
            }
            ActionRequest::OpenReward(action) => {
                forest.open_reward(clock, action.user, action.params, action.signature.as_bytes())
            }
            ActionRequest::Turntable(action) => {
                forest.turntable(clock, action.user, action.params, action.signature.as_bytes())
            }
        }
    }
}

impl From<SignedAction<SigninParams>> for ActionRequest {
    fn from(action: SignedAction<SigninParams>) -> Self {
        ActionRequest::Signin(action)
    }
}

impl From<SignedAction<StealParams>> for ActionRequest {
    fn from(action: SignedAction<StealParams>) -> Self {
        ActionRequest::Steal(action)
    }
}

impl From<SignedAction<RewardParams>> for ActionRequest {
    fn from(action: SignedAction<RewardParams>) -> Self {
        ActionRequest::OpenReward(action)
    }
}

impl From<SignedAction<TurntableParams>> for ActionRequest {
    fn from(action: SignedAction<TurntableParams>) -> Self {
        ActionRequest::Turntable(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eip712::{key_address, signing_key_from_hex};

    fn domain() -> Domain {
        Domain {
            name: "www.mintchain.io".to_string(),
            version: "1".to_string(),
            chain_id: 1687,
            verifying_contract: Address([0x42; 20]),
        }
    }

    #[test]
    fn json_round_trip_keeps_signature_valid() {
        let key = signing_key_from_hex(&"11".repeat(32)).unwrap();
        let user = Address([0xa1; 20]);
        let request: ActionRequest = SignedAction::sign(
            &domain(),
            &key,
            user,
            RewardParams { reward_id: 1, point: 123123 },
        )
        .unwrap()
        .into();

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.starts_with("{\"openReward\":"));
        assert!(json.contains("\"rewardId\":1"));
        let back: ActionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
        assert_eq!(back.kind(), ActionKind::OpenReward);
        assert_eq!(back.user(), user);
        assert_eq!(back.recover(&domain()).unwrap(), key_address(&key));
    }
}
