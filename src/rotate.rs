//! The `upload_rotate` probe: a ten-slot rotation document uploaded as a JSON
//! file attachment, and the interpretation of the service's reply envelope.

use serde::Deserialize;
use serde::ser::{Serialize, SerializeMap, Serializer};
use sonic_rs::to_vec;
use tracing::{error, info};

use super::adapter::{Client, RestBytes, RestRequest, RestResult};
use super::config::ProbeConfig;
use super::multipart::FormData;

pub const ROTATE_SLOT_COUNT: u8 = 10;
pub const ROTATE_FILE_FIELD: &str = "file";
pub const ROTATE_FILE_NAME: &str = "rotate.json";
pub const ROTATE_FILE_CONTENT_TYPE: &str = "application/json";
pub const USER_ID_FIELD: &str = "user_id";

/// Rotation degrees per inkblot slot, keyed `"1"`..`"10"`. Slots serialize in
/// numeric order so the uploaded document is byte-stable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RotatePayload {
    slots: Vec<(String, i64)>,
}

impl RotatePayload {
    /// The synthetic probe document: every slot rotated by zero degrees.
    pub fn zeroed() -> Self {
        Self {
            slots: (1..=ROTATE_SLOT_COUNT)
                .map(|slot| (slot.to_string(), 0))
                .collect(),
        }
    }

    /// Overwrites one slot's rotation. Slots outside `1..=10` are ignored.
    pub fn set_slot(&mut self, slot: u8, degrees: i64) {
        let key = slot.to_string();
        if let Some(entry) = self.slots.iter_mut().find(|(name, _)| *name == key) {
            entry.1 = degrees;
        }
    }

    pub fn slot(&self, slot: u8) -> Option<i64> {
        let key = slot.to_string();
        self.slots
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, degrees)| *degrees)
    }

    pub fn to_json(&self) -> RestResult<RestBytes> {
        Ok(to_vec(self)?.into())
    }
}

impl Serialize for RotatePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.slots.len()))?;
        for (slot, degrees) in &self.slots {
            map.serialize_entry(slot, degrees)?;
        }
        map.end()
    }
}

/// The service's reply envelope. `code == 0` means the upload was accepted;
/// anything else carries a message and sometimes an exception detail.
#[derive(Clone, Debug, Deserialize)]
pub struct UploadReply {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub exception: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    Accepted,
    Rejected { reason: String },
}

impl ProbeOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Builds the multipart POST for `upload_rotate`: bearer + `User-Id` headers,
/// a plain `user_id` field, and the payload as an attached `rotate.json`.
pub fn build_upload_request(
    config: &ProbeConfig,
    payload: &RotatePayload,
) -> RestResult<RestRequest> {
    let document = payload.to_json()?;
    let form = FormData::new()
        .text(USER_ID_FIELD, &config.user_id)
        .file(
            ROTATE_FILE_FIELD,
            ROTATE_FILE_NAME,
            ROTATE_FILE_CONTENT_TYPE,
            document,
        );
    let content_type = form.content_type();

    Ok(RestRequest::post(config.upload_rotate_url())
        .with_header("Authorization", config.bearer_header())
        .with_header("User-Id", config.user_id.clone())
        .with_header("Content-Type", content_type)
        .with_body(form.finish()))
}

/// One-shot diagnostic call. Every failure mode folds into
/// `ProbeOutcome::Rejected`; nothing propagates and nothing is retried.
pub async fn run_upload_rotate(client: &Client, config: &ProbeConfig) -> ProbeOutcome {
    let request = match build_upload_request(config, &RotatePayload::zeroed()) {
        Ok(request) => request,
        Err(err) => {
            error!(error = %err, "failed to encode upload_rotate request");
            return ProbeOutcome::rejected(format!("request encoding failed: {err}"));
        }
    };

    info!(url = %request.url, user_id = %config.user_id, "uploading rotate document");

    let response = match client.execute(request).await {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "transport failure");
            return ProbeOutcome::rejected(format!("transport failure: {err}"));
        }
    };

    info!(status = response.status(), elapsed_ms = response.elapsed.as_millis() as u64, "response received");

    // Non-200 bodies are frequently HTML error pages; do not parse them.
    if response.status() != 200 {
        error!(status = response.status(), "http error");
        return ProbeOutcome::rejected(format!("http error: status {}", response.status()));
    }

    let reply: UploadReply = match response.json() {
        Ok(reply) => reply,
        Err(err) => {
            error!(error = %err, "response body is not json");
            return ProbeOutcome::rejected(format!("response is not json: {err}"));
        }
    };

    if reply.code == 0 {
        info!("upload accepted");
        return ProbeOutcome::Accepted;
    }

    let mut reason = reply
        .msg
        .unwrap_or_else(|| format!("service error code {}", reply.code));
    if let Some(exception) = reply.exception {
        reason.push_str(" (exception: ");
        reason.push_str(&exception);
        reason.push(')');
    }
    error!(code = reply.code, reason = %reason, "upload rejected by service");
    ProbeOutcome::rejected(reason)
}
