use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::eip712::{uint_word, Field, SolType, TypedPayload};

/// The four user-facing action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Signin,
    Steal,
    OpenReward,
    Turntable,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Signin,
        ActionKind::Steal,
        ActionKind::OpenReward,
        ActionKind::Turntable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Signin => "signin",
            ActionKind::Steal => "steal",
            ActionKind::OpenReward => "openReward",
            ActionKind::Turntable => "turntable",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signin" => Ok(ActionKind::Signin),
            "steal" => Ok(ActionKind::Steal),
            "openReward" | "open-reward" | "reward" => Ok(ActionKind::OpenReward),
            "turntable" => Ok(ActionKind::Turntable),
            other => Err(format!("unknown action kind: {other}")),
        }
    }
}

/// Caller-supplied parameters of one action kind. The acting user is never
/// part of the params; it is bound in by [`Authorized`] from the caller.
pub trait ActionParams: Copy {
    const KIND: ActionKind;
    const PRIMARY_TYPE: &'static str;
    /// Full signed schema, `user` first.
    const FIELDS: &'static [Field];

    fn encode_params(&self) -> Vec<[u8; 32]>;

    /// Day timestamp the action is pinned to, if any.
    fn day(&self) -> Option<u64> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninParams {
    pub time: u64,
    pub point: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StealParams {
    pub target: Address,
    pub time: u64,
    pub point: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardParams {
    pub reward_id: u128,
    pub point: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurntableParams {
    pub time: u64,
    pub count: u16,
    pub point: u128,
}

impl ActionParams for SigninParams {
    const KIND: ActionKind = ActionKind::Signin;
    const PRIMARY_TYPE: &'static str = "SigninParams";
    const FIELDS: &'static [Field] = &[
        Field::new("user", SolType::Address),
        Field::new("time", SolType::Uint(64)),
        Field::new("point", SolType::Uint(256)),
    ];

    fn encode_params(&self) -> Vec<[u8; 32]> {
        vec![uint_word(u128::from(self.time)), uint_word(self.point)]
    }

    fn day(&self) -> Option<u64> {
        Some(self.time)
    }
}

impl ActionParams for StealParams {
    const KIND: ActionKind = ActionKind::Steal;
    const PRIMARY_TYPE: &'static str = "StealParams";
    const FIELDS: &'static [Field] = &[
        Field::new("user", SolType::Address),
        Field::new("target", SolType::Address),
        Field::new("time", SolType::Uint(64)),
        Field::new("point", SolType::Uint(256)),
    ];

    fn encode_params(&self) -> Vec<[u8; 32]> {
        vec![
            self.target.to_word(),
            uint_word(u128::from(self.time)),
            uint_word(self.point),
        ]
    }

    fn day(&self) -> Option<u64> {
        Some(self.time)
    }
}

impl ActionParams for RewardParams {
    const KIND: ActionKind = ActionKind::OpenReward;
    const PRIMARY_TYPE: &'static str = "RewardParams";
    const FIELDS: &'static [Field] = &[
        Field::new("user", SolType::Address),
        Field::new("rewardId", SolType::Uint(256)),
        Field::new("point", SolType::Uint(256)),
    ];

    fn encode_params(&self) -> Vec<[u8; 32]> {
        vec![uint_word(self.reward_id), uint_word(self.point)]
    }
}

impl ActionParams for TurntableParams {
    const KIND: ActionKind = ActionKind::Turntable;
    const PRIMARY_TYPE: &'static str = "TurntableParams";
    const FIELDS: &'static [Field] = &[
        Field::new("user", SolType::Address),
        Field::new("time", SolType::Uint(64)),
        Field::new("count", SolType::Uint(16)),
        Field::new("point", SolType::Uint(256)),
    ];

    fn encode_params(&self) -> Vec<[u8; 32]> {
        vec![
            uint_word(u128::from(self.time)),
            uint_word(u128::from(self.count)),
            uint_word(self.point),
        ]
    }

    fn day(&self) -> Option<u64> {
        Some(self.time)
    }
}

/// The payload actually signed: params with the acting user bound in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorized<P> {
    pub user: Address,
    pub params: P,
}

impl<P> Authorized<P> {
    pub fn new(user: Address, params: P) -> Self {
        Self { user, params }
    }
}

impl<P: ActionParams> TypedPayload for Authorized<P> {
    const PRIMARY_TYPE: &'static str = P::PRIMARY_TYPE;
    const FIELDS: &'static [Field] = P::FIELDS;

    fn encode_data(&self) -> Vec<[u8; 32]> {
        let mut words = Vec::with_capacity(P::FIELDS.len());
        words.push(self.user.to_word());
        words.extend(self.params.encode_params());
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schemas_match_client_type_strings() {
        assert_eq!(
            Authorized::<SigninParams>::type_string(),
            "SigninParams(address user,uint64 time,uint256 point)"
        );
        assert_eq!(
            Authorized::<StealParams>::type_string(),
            "StealParams(address user,address target,uint64 time,uint256 point)"
        );
        assert_eq!(
            Authorized::<RewardParams>::type_string(),
            "RewardParams(address user,uint256 rewardId,uint256 point)"
        );
        assert_eq!(
            Authorized::<TurntableParams>::type_string(),
            "TurntableParams(address user,uint64 time,uint16 count,uint256 point)"
        );
    }

    #[test]
    fn every_schema_encodes_one_word_per_field() {
        let user = Address([1; 20]);
        let signin = Authorized::new(user, SigninParams { time: 1, point: 2 });
        let steal = Authorized::new(
            user,
            StealParams { target: Address([2; 20]), time: 1, point: 2 },
        );
        let reward = Authorized::new(user, RewardParams { reward_id: 1, point: 2 });
        let turntable = Authorized::new(user, TurntableParams { time: 1, count: 1, point: 2 });
        assert_eq!(signin.encode_data().len(), SigninParams::FIELDS.len());
        assert_eq!(steal.encode_data().len(), StealParams::FIELDS.len());
        assert_eq!(reward.encode_data().len(), RewardParams::FIELDS.len());
        assert_eq!(turntable.encode_data().len(), TurntableParams::FIELDS.len());
    }

    #[test]
    fn params_use_abi_field_names() {
        let json = serde_json::to_value(RewardParams { reward_id: 1, point: 123123 }).unwrap();
        assert_eq!(json["rewardId"], 1);
        assert_eq!(json["point"], 123123);
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
        }
    }
}
