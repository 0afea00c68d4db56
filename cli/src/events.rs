use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Emitted on every committed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ForestEvent {
    Initialized {
        owner: Address,
    },
    OwnershipTransferred {
        previous: Address,
        current: Address,
    },
    SignerChanged {
        previous: Option<Address>,
        current: Address,
    },
    Signin {
        user: Address,
        time: u64,
        point: u128,
    },
    Steal {
        user: Address,
        target: Address,
        time: u64,
        point: u128,
    },
    RewardOpened {
        user: Address,
        #[serde(rename = "rewardId")]
        reward_id: u128,
        point: u128,
    },
    Turntable {
        user: Address,
        time: u64,
        count: u16,
        point: u128,
    },
}
