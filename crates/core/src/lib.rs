pub mod config;
pub mod infohash;
pub mod ingest;
pub mod orchestrator;
pub mod remote;
pub mod rpc;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, BlackholeConfig, Config, ConfigError,
    PutioConfig, SanitizedConfig, ServerConfig,
};
pub use infohash::{
    HttpMetainfoFetcher, InfoHash, InfoHashResolver, Magnet, MetainfoFetcher, ResolveError,
    StableId,
};
pub use ingest::{download_dir_for, BlackholeWatcher, IngestError};
pub use orchestrator::{
    create_result_sink, BackoffPolicy, FetchError, FetchResult, OrchestratorConfig, ResultHandle,
    ResultLogger, Submission, SubmissionSource, TransferOrchestrator,
};
pub use remote::{PutioClient, RemoteError, RemoteFile, RemoteService, RemoteTransfer, TransferStatus};
pub use rpc::{RpcAdapter, RpcError, RpcRequest, RpcResponse, SessionId, SESSION_ID_HEADER};
