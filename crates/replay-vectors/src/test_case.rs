//! Test vector files and test cases

use std::path::Path;

use replay_primitives::{HexBytes, H256};
use serde_json::{Map, Value};

use crate::account::State;
use crate::block::BlockEntry;
use crate::environment::{Environment, GenesisFields};
use crate::error::{VectorError, VectorResult};
use crate::exception::ExceptionId;
use crate::header::BlockHeader;

/// JSON type a case field must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldType {
    Object,
    Array,
    String,
}

impl FieldType {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldType::Object => value.is_object(),
            FieldType::Array => value.is_array(),
            FieldType::String => value.is_string(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            FieldType::Object => "an object",
            FieldType::Array => "an array",
            FieldType::String => "a string",
        }
    }
}

/// Case fields: name, type, required
const CASE_FIELDS: &[(&str, FieldType, bool)] = &[
    ("_info", FieldType::Object, true),
    ("sealEngine", FieldType::String, false),
    ("genesisBlockHeader", FieldType::Object, true),
    ("postState", FieldType::Object, false),
    ("postStateHash", FieldType::String, false),
    ("exceptions", FieldType::Array, false),
    ("genesisRLP", FieldType::String, true),
    ("lastblockhash", FieldType::String, true),
    ("network", FieldType::String, true),
    ("pre", FieldType::Object, true),
    ("blocks", FieldType::Array, true),
];

/// Block sealing mode requested from the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SealEngine {
    /// No proof-of-work check
    #[default]
    NoProof,
    /// Full ethash verification
    Ethash,
}

impl SealEngine {
    /// Name used in chain params
    pub fn as_str(&self) -> &'static str {
        match self {
            SealEngine::NoProof => "NoProof",
            SealEngine::Ethash => "Ethash",
        }
    }
}

/// `_info` metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Info {
    /// Free-form comment
    pub comment: Option<String>,
    /// Source filler
    pub source: Option<String>,
    /// Remaining keys as written
    pub extra: Map<String, Value>,
}

impl Info {
    fn from_object(object: &Map<String, Value>) -> Self {
        let mut extra = object.clone();
        let mut take = |key: &str| extra.remove(key).and_then(|v| v.as_str().map(str::to_string));
        let comment = take("comment");
        let source = take("source");
        Self { comment, source, extra }
    }
}

/// Expected final state: the full account set or only its root hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostExpectation {
    /// Every account of the post-state
    State(State),
    /// State root only
    Hash(H256),
}

/// One parsed blockchain test
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Test name (key in the vector file)
    pub name: String,
    /// `_info` metadata
    pub info: Info,
    /// Genesis header as written
    pub genesis_header: BlockHeader,
    /// Fork family chosen from the genesis header
    pub environment: Environment,
    /// Sealing mode
    pub seal_engine: SealEngine,
    /// Encoded genesis block
    pub genesis_rlp: HexBytes,
    /// Blocks to import, in order
    pub blocks: Vec<BlockEntry>,
    /// Expected final state
    pub post: PostExpectation,
    /// Expected head hash after all imports
    pub last_block_hash: H256,
    /// Case-level expected exceptions, in file order
    pub exceptions: Vec<ExceptionId>,
    /// Fork name
    pub network: String,
    /// Initial accounts
    pub pre: State,
}

impl TestCase {
    /// Network of an unparsed case, used to filter before parsing
    pub fn network_of(value: &Value) -> Option<&str> {
        value.get("network").and_then(Value::as_str)
    }

    /// Parse and validate one case
    pub fn from_json(name: &str, value: &Value) -> VectorResult<Self> {
        let object = value.as_object().ok_or_else(|| VectorError::Shape {
            case: name.to_string(),
            message: "test case must be an object".to_string(),
        })?;
        check_fields(name, object)?;

        let str_field = |key: &str| object.get(key).and_then(Value::as_str).unwrap_or_default();

        let genesis_object = object
            .get("genesisBlockHeader")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let genesis_header = BlockHeader::from_json(&genesis_object).map_err(|(field, reason)| {
            VectorError::field(name, format!("genesisBlockHeader.{}", field), reason)
        })?;
        GenesisFields::validate(&genesis_header).map_err(|(field, reason)| {
            VectorError::field(name, format!("genesisBlockHeader.{}", field), reason)
        })?;
        let environment = Environment::select(&genesis_header);

        let seal_engine = match object.get("sealEngine").and_then(Value::as_str) {
            Some("Ethash") => SealEngine::Ethash,
            _ => SealEngine::NoProof,
        };

        let post = match (object.get("postState"), object.get("postStateHash")) {
            (Some(state), None) => PostExpectation::State(State::from_json(name, "postState", state)?),
            (None, Some(hash)) => {
                let hash = hash.as_str().unwrap_or_default();
                PostExpectation::Hash(
                    H256::from_hex(hash).map_err(|e| VectorError::field(name, "postStateHash", e))?,
                )
            }
            (Some(_), Some(_)) => {
                return Err(VectorError::Shape {
                    case: name.to_string(),
                    message: "both postState and postStateHash are present".to_string(),
                })
            }
            (None, None) => {
                return Err(VectorError::Shape {
                    case: name.to_string(),
                    message: "one of postState or postStateHash is required".to_string(),
                })
            }
        };

        let genesis_rlp = HexBytes::from_hex(str_field("genesisRLP"))
            .map_err(|e| VectorError::field(name, "genesisRLP", e))?;
        let last_block_hash = H256::from_hex(str_field("lastblockhash"))
            .map_err(|e| VectorError::field(name, "lastblockhash", e))?;

        let blocks = object
            .get("blocks")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(i, block)| BlockEntry::from_json(name, i, block))
            .collect::<VectorResult<Vec<_>>>()?;

        let mut exceptions = Vec::new();
        if let Some(list) = object.get("exceptions").and_then(Value::as_array) {
            for (i, item) in list.iter().enumerate() {
                let text = item.as_str().ok_or_else(|| {
                    VectorError::field(name, format!("exceptions[{}]", i), "expected a string")
                })?;
                exceptions.push(ExceptionId::parse(text));
            }
        }

        let pre = State::from_json(name, "pre", object.get("pre").unwrap_or(&Value::Null))?;
        let info = Info::from_object(object.get("_info").and_then(Value::as_object).unwrap_or(&Map::new()));

        Ok(Self {
            name: name.to_string(),
            info,
            genesis_header,
            environment,
            seal_engine,
            genesis_rlp,
            blocks,
            post,
            last_block_hash,
            exceptions,
            network: str_field("network").to_string(),
            pre,
        })
    }
}

fn check_fields(case: &str, object: &Map<String, Value>) -> VectorResult<()> {
    for (key, ty, required) in CASE_FIELDS {
        match object.get(*key) {
            Some(value) if !ty.matches(value) => {
                return Err(VectorError::Shape {
                    case: case.to_string(),
                    message: format!("field '{}' must be {}", key, ty.name()),
                })
            }
            None if *required => {
                return Err(VectorError::Shape {
                    case: case.to_string(),
                    message: format!("missing required field '{}'", key),
                })
            }
            _ => {}
        }
    }
    for key in object.keys() {
        if !CASE_FIELDS.iter().any(|(name, _, _)| *name == key.as_str()) {
            tracing::debug!(case, field = %key, "ignoring unknown test field");
        }
    }
    Ok(())
}

/// A vector file: test name → unparsed case, in file order
#[derive(Debug, Clone, Default)]
pub struct TestVectorFile {
    entries: Vec<(String, Value)>,
}

impl TestVectorFile {
    /// Parse the file envelope; cases are parsed one by one later
    pub fn from_json_str(content: &str) -> VectorResult<Self> {
        let value: Value = serde_json::from_str(content)?;
        let Value::Object(tests) = value else {
            return Err(VectorError::File("a test file must contain an object".to_string()));
        };
        if tests.is_empty() {
            return Err(VectorError::File("a test file must contain at least one test".to_string()));
        }
        Ok(Self {
            entries: tests.into_iter().collect(),
        })
    }

    /// Read and parse a file from disk
    pub fn from_path(path: &Path) -> VectorResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Cases in file order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of cases
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the file has no cases
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
