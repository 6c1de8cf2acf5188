//! Chain params document sent with `test_setChainParams`

use replay_primitives::U256;
use replay_vectors::TestCase;
use serde_json::{json, Map, Value};

/// Build the chain params for a case.
///
/// `block_reward` is the client profile's reward for the case's network; it
/// is omitted when the profile does not list one.
pub fn chain_params(case: &TestCase, chain_id: u64, block_reward: Option<U256>) -> Value {
    let mut params = Map::new();
    params.insert("fork".into(), json!(case.network));
    params.insert("chainID".into(), json!(format!("{:#x}", chain_id)));
    if let Some(reward) = block_reward {
        params.insert("blockReward".into(), json!(format!("{:#x}", reward)));
    }

    json!({
        "params": Value::Object(params),
        "sealEngine": case.seal_engine.as_str(),
        "genesis": case.environment.genesis_json(),
        "accounts": case.pre.to_json(),
    })
}
