//! Typed decoding of RPC requests.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{RpcError, RpcRequest};
use crate::infohash::StableId;

/// Methods that are accepted and answered with success without doing anything.
pub const NO_OP_METHODS: &[&str] = &[
    "torrent-start",
    "torrent-start-now",
    "torrent-stop",
    "torrent-verify",
    "torrent-reannounce",
    "torrent-set",
    "torrent-remove",
    "torrent-set-location",
    "torrent-rename-path",
    "free-space",
    // Empty method: connection probe sent by some clients.
    "",
];

/// A decoded request.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcCall {
    SessionGet,
    TorrentAdd(TorrentAddArgs),
    TorrentGet(TorrentGetArgs),
    NoOp(String),
    Unknown(String),
}

impl RpcCall {
    /// Decode the method's arguments.
    ///
    /// Keys a method does not use are ignored; keys it uses with the wrong
    /// type yield [`RpcError::MalformedArguments`].
    pub fn decode(request: &RpcRequest) -> Result<Self, RpcError> {
        let method = request.method.as_str();
        let call = match method {
            "session-get" => RpcCall::SessionGet,
            "torrent-add" => {
                let args: TorrentAddArgs = decode_args(method, request.arguments.as_ref())?;
                if args.filename.is_none() && args.metainfo.is_none() {
                    return Err(RpcError::MalformedArguments(
                        "torrent-add requires filename or metainfo".to_string(),
                    ));
                }
                RpcCall::TorrentAdd(args)
            }
            "torrent-get" => RpcCall::TorrentGet(decode_args(method, request.arguments.as_ref())?),
            m if NO_OP_METHODS.contains(&m) => RpcCall::NoOp(m.to_string()),
            m => RpcCall::Unknown(m.to_string()),
        };
        Ok(call)
    }
}

fn decode_args<T: DeserializeOwned + Default>(
    method: &str,
    arguments: Option<&Value>,
) -> Result<T, RpcError> {
    match arguments {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| RpcError::MalformedArguments(format!("{}: {}", method, e))),
    }
}

/// `torrent-add` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TorrentAddArgs {
    /// Magnet URI or URL of a `.torrent` file.
    #[serde(default)]
    pub filename: Option<String>,
    /// Base64-encoded `.torrent` contents.
    #[serde(default)]
    pub metainfo: Option<String>,
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

/// `torrent-get` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentGetArgs {
    #[serde(default)]
    pub ids: Option<IdSelector>,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

/// A single entry of an `ids` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdRef {
    Id(i64),
    Hash(String),
}

/// Which torrents a request refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawIds", into = "RawIds")]
pub enum IdSelector {
    /// No filter (`recently-active` is treated the same way).
    All,
    List(Vec<IdRef>),
}

impl IdSelector {
    pub fn matches(&self, stable: &StableId) -> bool {
        match self {
            IdSelector::All => true,
            IdSelector::List(refs) => refs.iter().any(|r| match r {
                IdRef::Id(id) => *id == stable.id,
                IdRef::Hash(hash) => stable.matches_hash(hash),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawIds {
    One(i64),
    Many(Vec<IdRef>),
    Keyword(String),
}

const RECENTLY_ACTIVE: &str = "recently-active";

impl From<RawIds> for IdSelector {
    fn from(raw: RawIds) -> Self {
        match raw {
            RawIds::One(id) => IdSelector::List(vec![IdRef::Id(id)]),
            RawIds::Many(refs) => IdSelector::List(refs),
            RawIds::Keyword(k) if k == RECENTLY_ACTIVE => IdSelector::All,
            RawIds::Keyword(hash) => IdSelector::List(vec![IdRef::Hash(hash)]),
        }
    }
}

impl From<IdSelector> for RawIds {
    fn from(selector: IdSelector) -> Self {
        match selector {
            IdSelector::All => RawIds::Keyword(RECENTLY_ACTIVE.to_string()),
            IdSelector::List(refs) => RawIds::Many(refs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(method: &str, args: Value) -> Result<RpcCall, RpcError> {
        RpcCall::decode(&RpcRequest::new(method, Some(args)))
    }

    fn stable(id: i64, hash: &str) -> StableId {
        StableId {
            id,
            hash: hash.to_string(),
        }
    }

    #[test]
    fn test_decode_session_get_ignores_arguments() {
        assert_eq!(
            decode("session-get", json!({"fields": ["version"]})).unwrap(),
            RpcCall::SessionGet
        );
    }

    #[test]
    fn test_decode_torrent_add() {
        let call = decode(
            "torrent-add",
            json!({"filename": "magnet:?xt=urn:btih:abc", "download-dir": "/dl/tv", "paused": false}),
        )
        .unwrap();
        match call {
            RpcCall::TorrentAdd(args) => {
                assert_eq!(args.filename.as_deref(), Some("magnet:?xt=urn:btih:abc"));
                assert_eq!(args.download_dir, Some(PathBuf::from("/dl/tv")));
                assert!(args.metainfo.is_none());
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn test_decode_torrent_add_wrong_type() {
        let err = decode("torrent-add", json!({"filename": 42})).unwrap_err();
        assert!(matches!(err, RpcError::MalformedArguments(_)));
    }

    #[test]
    fn test_decode_torrent_add_without_source() {
        let err = decode("torrent-add", json!({"download-dir": "/dl"})).unwrap_err();
        assert!(matches!(err, RpcError::MalformedArguments(_)));
    }

    #[test]
    fn test_decode_torrent_get_ids_forms() {
        let ids = |v: Value| match decode("torrent-get", json!({ "ids": v })).unwrap() {
            RpcCall::TorrentGet(args) => args.ids,
            other => panic!("unexpected call {:?}", other),
        };

        assert_eq!(ids(json!(7)), Some(IdSelector::List(vec![IdRef::Id(7)])));
        assert_eq!(
            ids(json!([7, "ABCDEF"])),
            Some(IdSelector::List(vec![
                IdRef::Id(7),
                IdRef::Hash("ABCDEF".to_string())
            ]))
        );
        assert_eq!(ids(json!("recently-active")), Some(IdSelector::All));
    }

    #[test]
    fn test_decode_torrent_get_bad_fields() {
        let err = decode("torrent-get", json!({"fields": "name"})).unwrap_err();
        assert!(matches!(err, RpcError::MalformedArguments(_)));
    }

    #[test]
    fn test_decode_torrent_get_without_arguments() {
        let call = RpcCall::decode(&RpcRequest::new("torrent-get", None)).unwrap();
        assert_eq!(call, RpcCall::TorrentGet(TorrentGetArgs::default()));
    }

    #[test]
    fn test_decode_no_op_and_unknown() {
        assert_eq!(
            decode("torrent-remove", json!({"ids": [1]})).unwrap(),
            RpcCall::NoOp("torrent-remove".to_string())
        );
        assert_eq!(
            RpcCall::decode(&RpcRequest::default()).unwrap(),
            RpcCall::NoOp(String::new())
        );
        assert_eq!(
            decode("session-stats", json!({})).unwrap(),
            RpcCall::Unknown("session-stats".to_string())
        );
    }

    #[test]
    fn test_id_selector_matches() {
        let s = stable(42, "c12fe1c06bba254a9dc9f519b335aa7c1367a88a");
        assert!(IdSelector::All.matches(&s));
        assert!(IdSelector::List(vec![IdRef::Id(42)]).matches(&s));
        assert!(IdSelector::List(vec![IdRef::Hash(
            "C12FE1C06BBA254A9DC9F519B335AA7C1367A88A".to_string()
        )])
        .matches(&s));
        assert!(!IdSelector::List(vec![IdRef::Id(1), IdRef::Hash("ff".to_string())]).matches(&s));
    }
}
