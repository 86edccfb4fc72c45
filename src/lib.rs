//! One-shot diagnostic probe for the Rorschach analysis service's
//! `upload_rotate` endpoint: a multipart POST carrying a synthetic rotation
//! document, with an in-memory mock transport for fully deterministic tests.

pub mod adapter;
pub mod config;
pub mod mock;
pub mod multipart;
pub mod rotate;

pub use reqwest::Method;

pub use adapter::{
    Client, DEFAULT_REQUEST_TIMEOUT, ReqwestTransport, RestBytes, RestError, RestErrorKind,
    RestFuture, RestRequest, RestResponse, RestResult, RestTransport, RestTransportState,
};
pub use config::{ConfigError, ProbeConfig, UPLOAD_ROTATE_PATH};
pub use mock::{
    MockBehavior, MockBehaviorPlan, MockResponse, MockRestAdapter, MockRestStateSnapshot,
};
pub use multipart::FormData;
pub use rotate::{
    ProbeOutcome, RotatePayload, UploadReply, build_upload_request, run_upload_rotate,
};
