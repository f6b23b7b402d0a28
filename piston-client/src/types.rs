use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub language: String,
    pub version: String,
    pub files: Vec<SourceFile>,
    #[serde(default)]
    pub stdin: String,
    /// Memory ceiling for the run stage in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_memory_limit: Option<u64>,
}

/// Output of one compile or run stage. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutput {
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub signal: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteResponse {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub compile: Option<StageOutput>,
    #[serde(default)]
    pub run: Option<StageOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runtime {
    pub language: String,
    pub version: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_tolerates_missing_stages() {
        let response: ExecuteResponse =
            serde_json::from_value(json!({ "language": "python", "version": "3.10.0" })).unwrap();
        assert!(response.run.is_none());
        assert!(response.compile.is_none());
    }

    #[test]
    fn test_stage_accepts_null_code_and_signal() {
        let stage: StageOutput = serde_json::from_value(json!({
            "stdout": "",
            "stderr": "Killed",
            "code": null,
            "signal": "SIGKILL"
        }))
        .unwrap();
        assert_eq!(stage.code, None);
        assert_eq!(stage.signal.as_deref(), Some("SIGKILL"));
    }

    #[test]
    fn test_request_omits_unset_memory_limit() {
        let request = ExecuteRequest {
            language: "c".into(),
            version: "10.2.0".into(),
            files: vec![SourceFile {
                name: "main.c".into(),
                content: "int main(){}".into(),
            }],
            stdin: String::new(),
            run_memory_limit: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("run_memory_limit").is_none());
        assert_eq!(value["files"][0]["name"], "main.c");
    }
}
