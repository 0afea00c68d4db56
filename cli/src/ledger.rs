use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::replay::RecordMap;

pub type DayKey = (Address, u64);
pub type RewardKey = (Address, u128);
pub type DrawKey = (Address, u64, u16);

/// The four write-once record mappings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStore {
    pub(crate) signin: RecordMap<DayKey>,
    /// Indexed by the target the points were taken from.
    pub(crate) steal: RecordMap<DayKey>,
    pub(crate) reward: RecordMap<RewardKey>,
    pub(crate) turntable: RecordMap<DrawKey>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signin_record(&self, user: Address, time: u64) -> u128 {
        self.signin.points(&(user, time))
    }

    pub fn steal_record(&self, target: Address, time: u64) -> u128 {
        self.steal.points(&(target, time))
    }

    pub fn reward_record(&self, user: Address, reward_id: u128) -> u128 {
        self.reward.points(&(user, reward_id))
    }

    pub fn turntable_record(&self, user: Address, time: u64, count: u16) -> u128 {
        self.turntable.points(&(user, time, count))
    }

    pub fn signins(&self) -> &RecordMap<DayKey> {
        &self.signin
    }

    pub fn steals(&self) -> &RecordMap<DayKey> {
        &self.steal
    }

    pub fn rewards(&self) -> &RecordMap<RewardKey> {
        &self.reward
    }

    pub fn turntables(&self) -> &RecordMap<DrawKey> {
        &self.turntable
    }

    /// Feed every record into `hasher` in canonical key order.
    pub(crate) fn digest_into(&self, hasher: &mut Sha256) {
        digest_map(hasher, b"signin", &self.signin, |(user, time), out| {
            out.extend_from_slice(&user.0);
            out.extend_from_slice(&time.to_be_bytes());
        });
        digest_map(hasher, b"steal", &self.steal, |(target, time), out| {
            out.extend_from_slice(&target.0);
            out.extend_from_slice(&time.to_be_bytes());
        });
        digest_map(hasher, b"reward", &self.reward, |(user, reward_id), out| {
            out.extend_from_slice(&user.0);
            out.extend_from_slice(&reward_id.to_be_bytes());
        });
        digest_map(hasher, b"turntable", &self.turntable, |(user, time, count), out| {
            out.extend_from_slice(&user.0);
            out.extend_from_slice(&time.to_be_bytes());
            out.extend_from_slice(&count.to_be_bytes());
        });
    }
}

fn digest_map<K: Ord>(
    hasher: &mut Sha256,
    tag: &[u8],
    map: &RecordMap<K>,
    encode_key: impl Fn(&K, &mut Vec<u8>),
) {
    hasher.update((tag.len() as u32).to_be_bytes());
    hasher.update(tag);
    hasher.update((map.len() as u64).to_be_bytes());
    let mut buf = Vec::with_capacity(64);
    for (key, points) in map.iter() {
        buf.clear();
        encode_key(key, &mut buf);
        buf.extend_from_slice(&points.to_be_bytes());
        hasher.update(&buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_records_read_as_zero() {
        let ledger = LedgerStore::new();
        let user = Address([9; 20]);
        assert_eq!(ledger.signin_record(user, 0), 0);
        assert_eq!(ledger.steal_record(user, 0), 0);
        assert_eq!(ledger.reward_record(user, 1), 0);
        assert_eq!(ledger.turntable_record(user, 0, 1), 0);
    }

    #[test]
    fn digest_depends_on_which_map_holds_the_record() {
        let user = Address([9; 20]);
        let mut a = LedgerStore::new();
        a.signin.consume((user, 86_400), 5).unwrap();
        let mut b = LedgerStore::new();
        b.steal.consume((user, 86_400), 5).unwrap();

        let mut ha = Sha256::new();
        a.digest_into(&mut ha);
        let mut hb = Sha256::new();
        b.digest_into(&mut hb);
        assert_ne!(ha.finalize(), hb.finalize());
    }
}
