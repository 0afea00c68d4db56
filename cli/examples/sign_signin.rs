use anyhow::Result;
use mintforest::clock::{Clock, SystemClock};
use mintforest::eip712::key_address;
use mintforest::{
    load_config_with_overrides, load_signing_key, Address, MintForest, SignedAction,
    SigninParams,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = load_config_with_overrides(None, None)?;
    let key = load_signing_key(&config)?;
    let signer = key_address(&key);

    // Sign today's check-in for a user, then apply it to a throwaway ledger
    // owned by the signer.
    let user: Address = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse()?;
    let params = SigninParams {
        time: SystemClock.today() as u64,
        point: 500,
    };
    let action = SignedAction::sign(&config.domain(), &key, user, params)?;
    println!("{}", serde_json::to_string_pretty(&action)?);

    let mut forest = MintForest::initialize(config.domain(), signer)?;
    forest.set_signer(signer, signer)?;
    forest.signin(&SystemClock, user, params, action.signature.as_bytes())?;
    println!(
        "signin_record({}, {}) = {}",
        user,
        params.time,
        forest.signin_record(user, params.time)
    );
    Ok(())
}
