use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
pub struct IpfsResponse {
    #[serde(rename = "metadataUri")]
    pub metadata_uri: String,
}

#[derive(Serialize, Debug)]
pub struct JitoRpcRequest<T> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    pub params: T,
}

impl<T> JitoRpcRequest<T> {
    pub fn new(method: &'static str, params: T) -> Self {
        JitoRpcRequest { jsonrpc: "2.0", id: 1, method, params }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct JitoRpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<JitoRpcError>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JitoRpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JitoContext {
    pub slot: u64,
}

// --- getBundleStatuses ---

#[derive(Debug, Deserialize, Clone)]
pub struct BundleStatusesResult {
    pub context: JitoContext,
    #[serde(default)]
    pub value: Vec<Option<BundleStatusInfo>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BundleStatusInfo {
    pub bundle_id: String,
    #[serde(default)]
    pub transactions: Vec<String>,
    pub slot: u64,
    #[serde(default)]
    pub confirmation_status: Option<String>,
    /// `{"Ok": null}` on success, `{"Err": ...}` otherwise.
    #[serde(default)]
    pub err: Option<Value>,
}

impl BundleStatusInfo {
    pub fn error_detail(&self) -> Option<String> {
        match &self.err {
            Some(Value::Object(map)) => map.get("Err").filter(|v| !v.is_null()).map(|v| v.to_string()),
            _ => None,
        }
    }
}

// --- simulateBundle ---

#[derive(Debug, Deserialize, Clone)]
pub struct SimulateBundleResult {
    pub context: JitoContext,
    pub value: SimulateBundleValue,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulateBundleValue {
    /// `"succeeded"`, or `{"failed": {"error": ..., "tx_signature": ...}}`.
    pub summary: Value,
    #[serde(default, rename = "transactionResults")]
    pub transaction_results: Vec<Value>,
}

impl SimulateBundleValue {
    pub fn failure_detail(&self) -> Option<String> {
        match &self.summary {
            Value::String(s) if s == "succeeded" => None,
            Value::Object(map) => Some(map.get("failed").unwrap_or(&self.summary).to_string()),
            other => Some(other.to_string()),
        }
    }
}

// --- getInflightBundleStatuses ---

#[derive(Debug, Deserialize, Clone)]
pub struct InflightStatusesResult {
    pub context: JitoContext,
    #[serde(default)]
    pub value: Vec<InflightBundleStatus>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InflightBundleStatus {
    pub bundle_id: String,
    /// "Invalid", "Pending", "Failed" or "Landed".
    pub status: String,
    #[serde(default)]
    pub landed_slot: Option<u64>,
}

/// Relay-reported state of a submitted bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayBundleStatus {
    /// Not yet visible to the relay, or not yet landed.
    Pending,
    Landed { slot: u64, confirmation: String },
    Finalized { slot: u64 },
    Failed(String),
}

impl RelayBundleStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RelayBundleStatus::Finalized { .. } | RelayBundleStatus::Failed(_))
    }

    pub fn label(&self) -> &str {
        match self {
            RelayBundleStatus::Pending => "pending",
            RelayBundleStatus::Landed { confirmation, .. } => confirmation.as_str(),
            RelayBundleStatus::Finalized { .. } => "finalized",
            RelayBundleStatus::Failed(_) => "failed",
        }
    }
}

impl From<&BundleStatusInfo> for RelayBundleStatus {
    fn from(info: &BundleStatusInfo) -> Self {
        if let Some(detail) = info.error_detail() {
            return RelayBundleStatus::Failed(detail);
        }
        match info.confirmation_status.as_deref() {
            Some("finalized") => RelayBundleStatus::Finalized { slot: info.slot },
            Some(other) => RelayBundleStatus::Landed { slot: info.slot, confirmation: other.to_string() },
            None => RelayBundleStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn historical_status_maps_to_relay_status() {
        let body = r#"{
            "jsonrpc": "2.0",
            "result": {
                "context": { "slot": 242806119 },
                "value": [{
                    "bundle_id": "892b79ed49138bfb3aa5441f0df6e06ef34f9ee8f3976c15b323605bae0cf51d",
                    "transactions": ["3bC2M9fiACSjkTXZDgeNAuQ4ScTsdKGwR42ytFdhUvikqTmBheUxfsR1fDVsM5ADCMMspuwGkdm1uKbU246x5aE3"],
                    "slot": 242804011,
                    "confirmation_status": "finalized",
                    "err": { "Ok": null }
                }]
            },
            "id": 1
        }"#;
        let resp: JitoRpcResponse<BundleStatusesResult> = serde_json::from_str(body).unwrap();
        let result = resp.result.unwrap();
        let info = result.value[0].as_ref().unwrap();
        assert_eq!(RelayBundleStatus::from(info), RelayBundleStatus::Finalized { slot: 242804011 });
    }

    #[test]
    fn err_payload_means_failed() {
        let info: BundleStatusInfo = serde_json::from_str(
            r#"{"bundle_id":"b","transactions":[],"slot":1,"confirmation_status":"processed","err":{"Err":"BundleDropped"}}"#,
        )
        .unwrap();
        assert!(matches!(RelayBundleStatus::from(&info), RelayBundleStatus::Failed(_)));
    }

    #[test]
    fn simulation_summary_reports_failures() {
        let ok: SimulateBundleResult = serde_json::from_str(
            r#"{"context":{"slot":9},"value":{"summary":"succeeded","transactionResults":[{},{}]}}"#,
        )
        .unwrap();
        assert_eq!(ok.value.failure_detail(), None);
        assert_eq!(ok.value.transaction_results.len(), 2);

        let failed: SimulateBundleResult = serde_json::from_str(
            r#"{"context":{"slot":9},"value":{"summary":{"failed":{"error":{"TransactionFailure":[[1],"custom program error: 0x1771"]},"tx_signature":"abc"}}}}"#,
        )
        .unwrap();
        assert!(failed.value.failure_detail().unwrap().contains("0x1771"));
    }

    #[test]
    fn error_only_response_has_no_result() {
        let resp: JitoRpcResponse<SimulateBundleResult> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"bundle exceeds max length"},"id":1}"#,
        )
        .unwrap();
        assert!(resp.result.is_none());
        assert_eq!(resp.error.unwrap().code, -32602);
    }

    #[test]
    fn unknown_bundle_is_null_entry() {
        let resp: JitoRpcResponse<BundleStatusesResult> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","result":{"context":{"slot":5},"value":[null]},"id":1}"#).unwrap();
        assert!(resp.result.unwrap().value[0].is_none());
    }
}
