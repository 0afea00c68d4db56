//! The ledger engine: access control, signature gating, replay protection
//! and the four action handlers.
//!
//! Every handler runs the same pipeline:
//!
//! 1. day rule for actions pinned to a calendar day (`InvalidTime`)
//! 2. signature over the action's own schema with `user = caller`
//!    (`InvalidSignature`)
//! 3. replay guard on the action key (`DuplicateData`)
//! 4. commit, then emit
//!
//! Nothing is written before step 4, so a rejected call leaves no trace.
//! Mutating calls take `&mut self`; exclusive access is the single execution
//! lane that makes check-then-write atomic.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::access::AccessControl;
use crate::actions::{
    ActionKind, ActionParams, Authorized, RewardParams, SigninParams, StealParams,
    TurntableParams,
};
use crate::address::Address;
use crate::clock::Clock;
use crate::eip712::{self, Domain};
use crate::error::ForestError;
use crate::events::ForestEvent;
use crate::ledger::LedgerStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintForest {
    domain: Domain,
    access: AccessControl,
    ledger: LedgerStore,
    events: Vec<ForestEvent>,
}

impl MintForest {
    /// Create an instance bound to `domain` and owned by `owner`. The signer
    /// starts unset.
    pub fn initialize(domain: Domain, owner: Address) -> Result<Self, ForestError> {
        let access = AccessControl::new(owner)?;
        info!(%owner, chain_id = domain.chain_id, contract = %domain.verifying_contract, "forest initialized");
        Ok(Self {
            domain,
            access,
            ledger: LedgerStore::new(),
            events: vec![ForestEvent::Initialized { owner }],
        })
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn owner(&self) -> Address {
        self.access.owner()
    }

    pub fn signer(&self) -> Option<Address> {
        self.access.signer()
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    pub fn events(&self) -> &[ForestEvent] {
        &self.events
    }

    pub fn set_signer(&mut self, caller: Address, signer: Address) -> Result<(), ForestError> {
        let previous = self.access.set_signer(caller, signer).map_err(|err| {
            debug!(%caller, %err, "set_signer rejected");
            err
        })?;
        info!(%signer, "signer changed");
        self.events.push(ForestEvent::SignerChanged {
            previous,
            current: signer,
        });
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), ForestError> {
        let previous = self
            .access
            .transfer_ownership(caller, new_owner)
            .map_err(|err| {
                debug!(%caller, %err, "transfer_ownership rejected");
                err
            })?;
        info!(%previous, %new_owner, "ownership transferred");
        self.events.push(ForestEvent::OwnershipTransferred {
            previous,
            current: new_owner,
        });
        Ok(())
    }

    /// Daily check-in. Key `(caller, time)`.
    pub fn signin(
        &mut self,
        clock: &dyn Clock,
        caller: Address,
        params: SigninParams,
        signature: &[u8],
    ) -> Result<(), ForestError> {
        self.authorize(clock, caller, params, signature)?;
        let key = (caller, params.time);
        self.ledger
            .signin
            .consume(key, params.point)
            .map_err(|err| rejected(ActionKind::Signin, caller, err))?;
        self.commit(
            ActionKind::Signin,
            ForestEvent::Signin {
                user: caller,
                time: params.time,
                point: params.point,
            },
        );
        Ok(())
    }

    /// Take unclaimed points from `target`. Keyed by the target, so one
    /// target-day can be stolen from once no matter who calls.
    pub fn steal(
        &mut self,
        clock: &dyn Clock,
        caller: Address,
        params: StealParams,
        signature: &[u8],
    ) -> Result<(), ForestError> {
        self.authorize(clock, caller, params, signature)?;
        let key = (params.target, params.time);
        self.ledger
            .steal
            .consume(key, params.point)
            .map_err(|err| rejected(ActionKind::Steal, caller, err))?;
        self.commit(
            ActionKind::Steal,
            ForestEvent::Steal {
                user: caller,
                target: params.target,
                time: params.time,
                point: params.point,
            },
        );
        Ok(())
    }

    /// Redeem a reward id. No day rule. Key `(caller, reward_id)`.
    pub fn open_reward(
        &mut self,
        clock: &dyn Clock,
        caller: Address,
        params: RewardParams,
        signature: &[u8],
    ) -> Result<(), ForestError> {
        self.authorize(clock, caller, params, signature)?;
        let key = (caller, params.reward_id);
        self.ledger
            .reward
            .consume(key, params.point)
            .map_err(|err| rejected(ActionKind::OpenReward, caller, err))?;
        self.commit(
            ActionKind::OpenReward,
            ForestEvent::RewardOpened {
                user: caller,
                reward_id: params.reward_id,
                point: params.point,
            },
        );
        Ok(())
    }

    /// Randomized draw. `count` is the draw index within the day. Key
    /// `(caller, time, count)`.
    pub fn turntable(
        &mut self,
        clock: &dyn Clock,
        caller: Address,
        params: TurntableParams,
        signature: &[u8],
    ) -> Result<(), ForestError> {
        self.authorize(clock, caller, params, signature)?;
        let key = (caller, params.time, params.count);
        self.ledger
            .turntable
            .consume(key, params.point)
            .map_err(|err| rejected(ActionKind::Turntable, caller, err))?;
        self.commit(
            ActionKind::Turntable,
            ForestEvent::Turntable {
                user: caller,
                time: params.time,
                count: params.count,
                point: params.point,
            },
        );
        Ok(())
    }

    pub fn signin_record(&self, user: Address, time: u64) -> u128 {
        self.ledger.signin_record(user, time)
    }

    pub fn steal_record(&self, target: Address, time: u64) -> u128 {
        self.ledger.steal_record(target, time)
    }

    pub fn reward_record(&self, user: Address, reward_id: u128) -> u128 {
        self.ledger.reward_record(user, reward_id)
    }

    pub fn turntable_record(&self, user: Address, time: u64, count: u16) -> u128 {
        self.ledger.turntable_record(user, time, count)
    }

    /// SHA-256 over the domain, roles and every record. Two instances with
    /// the same committed state have the same root.
    pub fn state_root(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.domain.separator());
        hasher.update(self.access.owner().0);
        match self.access.signer() {
            Some(signer) => {
                hasher.update([1u8]);
                hasher.update(signer.0);
            }
            None => hasher.update([0u8]),
        }
        self.ledger.digest_into(&mut hasher);
        hasher.finalize().into()
    }

    /// Day rule then signature check, shared by every handler.
    fn authorize<P: ActionParams>(
        &self,
        clock: &dyn Clock,
        caller: Address,
        params: P,
        signature: &[u8],
    ) -> Result<(), ForestError> {
        if let Some(time) = params.day() {
            ensure_today(clock, time).map_err(|err| rejected(P::KIND, caller, err))?;
        }
        let signer = self
            .access
            .authorized_signer()
            .map_err(|err| rejected(P::KIND, caller, err))?;
        let payload = Authorized::new(caller, params);
        eip712::verify(&self.domain, &payload, signature, signer)
            .map_err(|err| rejected(P::KIND, caller, err))?;
        Ok(())
    }

    fn commit(&mut self, kind: ActionKind, event: ForestEvent) {
        info!(action = %kind, ?event, "action committed");
        self.events.push(event);
    }
}

fn ensure_today(clock: &dyn Clock, time: u64) -> Result<(), ForestError> {
    let today = clock.today();
    if i64::try_from(time).ok() != Some(today) {
        return Err(ForestError::InvalidTime);
    }
    Ok(())
}

fn rejected(kind: ActionKind, caller: Address, err: ForestError) -> ForestError {
    debug!(action = %kind, %caller, %err, "action rejected");
    err
}
