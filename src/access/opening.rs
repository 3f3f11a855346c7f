//! Direct gate opening through the on-site converter.
//!
//! Used by operators rather than chat users: no token, no eligibility check.
//! The converter opens the gate, then the opening is posted to the panel
//! ledger with the partition it targeted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::access::types::AuditEvent;
use crate::config::AccessConfig;
use crate::error::RemoteError;
use crate::panel::{ConverterClient, RemotePanelClient};

/// Ledger code for an operator opening.
pub const OPENING_EVENT_CODE: &str = "H417";

/// Body of `POST /v1/create/opening`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningRequest {
    #[serde(default)]
    pub account: Option<String>,
    /// Number or string, forwarded to the ledger as received.
    #[serde(default)]
    pub company_id: Option<serde_json::Value>,
    #[serde(default)]
    pub complement: Option<String>,
    #[serde(default)]
    pub partition: Option<String>,
    #[serde(default)]
    pub server: Option<String>,
}

/// All five fields, present and non-empty.
#[derive(Debug, Clone, PartialEq)]
struct OpeningTarget {
    account: String,
    company_id: serde_json::Value,
    complement: String,
    partition: String,
    server: String,
}

impl OpeningRequest {
    fn target(&self) -> Option<OpeningTarget> {
        fn text(field: &Option<String>) -> Option<String> {
            field.as_deref().filter(|s| !s.is_empty()).map(str::to_string)
        }

        let company_id = match self.company_id.as_ref()? {
            serde_json::Value::Null => return None,
            serde_json::Value::String(s) if s.is_empty() => return None,
            serde_json::Value::Number(n) if n.as_f64() == Some(0.0) => return None,
            other => other.clone(),
        };

        Some(OpeningTarget {
            account: text(&self.account)?,
            company_id,
            complement: text(&self.complement)?,
            partition: text(&self.partition)?,
            server: text(&self.server)?,
        })
    }
}

/// How a direct opening ended.
#[derive(Debug, Clone, PartialEq)]
pub enum OpeningOutcome {
    /// Converter answered; carries its response.
    Opened { data: serde_json::Value },
    MissingFields,
    /// No converter base URL configured.
    Disabled,
    Failed { reason: String },
}

impl OpeningOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Opened { .. } => 200,
            Self::MissingFields => 400,
            Self::Disabled | Self::Failed { .. } => 500,
        }
    }

    pub fn response_body(&self) -> serde_json::Value {
        match self {
            Self::Opened { data } => json!({ "data": data }),
            Self::MissingFields => json!({
                "message": "Missing required fields.",
                "suggestion": "Please provide all required fields: account, companyId, complement, partition and server.",
            }),
            Self::Disabled => json!({
                "message": "Direct opening is not configured.",
                "suggestion": "Set OPENING_BASE_URL to enable this endpoint.",
            }),
            Self::Failed { .. } => json!({
                "message": "Something went wrong.",
                "suggestion": "Please try again later. If this issue persists, contact our support team for assistance.",
            }),
        }
    }
}

/// Opens gates directly and records the opening on the panel ledger.
pub struct OpeningService {
    converter: Option<Arc<dyn ConverterClient>>,
    panel: Arc<dyn RemotePanelClient>,
    config: Arc<AccessConfig>,
}

impl OpeningService {
    pub fn new(
        converter: Option<Arc<dyn ConverterClient>>,
        panel: Arc<dyn RemotePanelClient>,
        config: Arc<AccessConfig>,
    ) -> Self {
        Self {
            converter,
            panel,
            config,
        }
    }

    pub async fn open(&self, request: OpeningRequest) -> OpeningOutcome {
        let Some(target) = request.target() else {
            warn!(?request, "Opening request is missing fields");
            return OpeningOutcome::MissingFields;
        };
        let Some(converter) = self.converter.as_ref() else {
            warn!(account = %target.account, "Opening requested but no converter is configured");
            return OpeningOutcome::Disabled;
        };

        match self.run(converter.as_ref(), &target).await {
            Ok(data) => {
                info!(
                    account = %target.account,
                    partition = %target.partition,
                    server = %target.server,
                    "Gate opened"
                );
                OpeningOutcome::Opened { data }
            }
            Err(e) => {
                error!(error = %e, account = %target.account, "Gate opening failed");
                OpeningOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn run(
        &self,
        converter: &dyn ConverterClient,
        target: &OpeningTarget,
    ) -> Result<serde_json::Value, RemoteError> {
        let data = converter
            .open_gate(&target.server, &target.account, &target.partition)
            .await?;

        let event = AuditEvent {
            account: target.account.clone(),
            code: OPENING_EVENT_CODE.to_string(),
            company_id: target.company_id.clone(),
            complement: target.complement.clone(),
            event_id: self.config.whitelist_event.event_id.clone(),
            protocol_type: self.config.protocol_type.clone(),
            receiver_description: None,
            partition: Some(target.partition.clone()),
        };
        self.panel.submit_audit_event(&event).await?;

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::access::types::{AccountMetadata, ReceiverMetadata};

    #[derive(Default)]
    struct Recorder {
        opened: Mutex<Vec<(String, String, String)>>,
        events: Mutex<Vec<AuditEvent>>,
        converter_fails: bool,
    }

    #[async_trait]
    impl ConverterClient for Recorder {
        async fn open_gate(
            &self,
            server: &str,
            account: &str,
            partition: &str,
        ) -> Result<serde_json::Value, RemoteError> {
            if self.converter_fails {
                return Err(RemoteError::Status {
                    service: "converter".into(),
                    status: 502,
                    body: String::new(),
                });
            }
            self.opened.lock().unwrap().push((
                server.to_string(),
                account.to_string(),
                partition.to_string(),
            ));
            Ok(json!({ "status": "opened" }))
        }
    }

    #[async_trait]
    impl RemotePanelClient for Recorder {
        async fn issue_command(&self, _: &str, _: &str, _: &str) -> Result<(), RemoteError> {
            unimplemented!("not used by direct opening")
        }

        async fn get_account_metadata(
            &self,
            _: &str,
        ) -> Result<Option<AccountMetadata>, RemoteError> {
            unimplemented!("not used by direct opening")
        }

        async fn get_receiver_metadata(
            &self,
            _: &str,
            _: &str,
        ) -> Result<Option<ReceiverMetadata>, RemoteError> {
            unimplemented!("not used by direct opening")
        }

        async fn submit_audit_event(&self, event: &AuditEvent) -> Result<(), RemoteError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn full_request() -> OpeningRequest {
        serde_json::from_value(json!({
            "account": "0042",
            "companyId": 9,
            "complement": "Portaria",
            "partition": "01",
            "server": "9090",
        }))
        .unwrap()
    }

    fn service(recorder: &Arc<Recorder>, with_converter: bool) -> OpeningService {
        let converter: Option<Arc<dyn ConverterClient>> = if with_converter {
            Some(recorder.clone())
        } else {
            None
        };
        OpeningService::new(converter, recorder.clone(), Arc::new(AccessConfig::default()))
    }

    #[tokio::test]
    async fn opens_and_records_partition() {
        let recorder = Arc::new(Recorder::default());
        let outcome = service(&recorder, true).open(full_request()).await;

        assert_eq!(outcome.status_code(), 200);
        assert_eq!(
            outcome.response_body(),
            json!({ "data": { "status": "opened" } })
        );
        assert_eq!(
            recorder.opened.lock().unwrap()[0],
            ("9090".to_string(), "0042".to_string(), "01".to_string())
        );

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].code, "H417");
        assert_eq!(events[0].event_id, "167618000");
        assert_eq!(events[0].partition.as_deref(), Some("01"));
        assert_eq!(events[0].company_id, json!(9));
    }

    #[tokio::test]
    async fn missing_field_is_rejected_before_any_call() {
        let recorder = Arc::new(Recorder::default());
        let mut request = full_request();
        request.partition = Some(String::new());

        let outcome = service(&recorder, true).open(request).await;
        assert_eq!(outcome, OpeningOutcome::MissingFields);
        assert_eq!(outcome.status_code(), 400);
        assert!(recorder.opened.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_company_id_counts_as_missing() {
        let recorder = Arc::new(Recorder::default());
        let mut request = full_request();
        request.company_id = Some(json!(0));

        let outcome = service(&recorder, true).open(request).await;
        assert_eq!(outcome, OpeningOutcome::MissingFields);
    }

    #[tokio::test]
    async fn converter_failure_skips_ledger() {
        let recorder = Arc::new(Recorder {
            converter_fails: true,
            ..Recorder::default()
        });
        let outcome = service(&recorder, true).open(full_request()).await;

        assert!(matches!(outcome, OpeningOutcome::Failed { .. }));
        assert_eq!(outcome.status_code(), 500);
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn disabled_without_converter() {
        let recorder = Arc::new(Recorder::default());
        let outcome = service(&recorder, false).open(full_request()).await;
        assert_eq!(outcome, OpeningOutcome::Disabled);
    }
}
