//! Envelope and operation types.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{OP_ERROR, OP_OK};

/// One message exchanged over the connection, request or reply.
///
/// Requests carry an [`Operation`] tag in `op`; replies carry [`OP_OK`] or
/// [`OP_ERROR`] and echo the request's `nonce`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Correlation token chosen by the requester.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub nonce: String,
    /// Operation tag or reply outcome.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub op: String,
    /// Operation-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Diagnostic text, set on error replies only. Requests never use it,
    /// so a non-string value is dropped rather than rejected.
    #[serde(
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub message: Option<String>,
}

/// Treats an explicit `null` like a missing string.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(Some(text)),
        _ => Ok(None),
    }
}

impl Envelope {
    /// Creates a success reply carrying `data` (which may be `null`).
    pub fn ok(nonce: impl Into<String>, data: Value) -> Self {
        Self {
            nonce: nonce.into(),
            op: OP_OK.to_string(),
            data: Some(data),
            message: None,
        }
    }

    /// Creates an error reply. Error replies never carry `data`.
    pub fn error(nonce: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            nonce: nonce.into(),
            op: OP_ERROR.to_string(),
            data: None,
            message: Some(message.into()),
        }
    }

    /// Parses the `op` tag, if it names a known operation.
    pub fn operation(&self) -> Option<Operation> {
        Operation::parse(&self.op)
    }

    /// Returns true for a success reply.
    pub fn is_ok(&self) -> bool {
        self.op == OP_OK
    }

    /// Returns the payload if it is a JSON string.
    pub fn string_payload(&self) -> Option<&str> {
        self.data.as_ref().and_then(Value::as_str)
    }
}

/// Operations a client may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// List discovered installations.
    ListInstalls,
    /// Patch an installation.
    Patch,
    /// Remove the patch from an installation.
    Unpatch,
    /// Download fresh build artifacts, then patch.
    Repair,
    /// Install the OpenAsar loader.
    InstallOpenAsar,
    /// Remove the OpenAsar loader.
    UninstallOpenAsar,
}

impl Operation {
    /// All operations, in wire order.
    pub const ALL: [Operation; 6] = [
        Operation::ListInstalls,
        Operation::Patch,
        Operation::Unpatch,
        Operation::Repair,
        Operation::InstallOpenAsar,
        Operation::UninstallOpenAsar,
    ];

    /// Returns the wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListInstalls => "LIST_INSTALLS",
            Self::Patch => "PATCH",
            Self::Unpatch => "UNPATCH",
            Self::Repair => "REPAIR",
            Self::InstallOpenAsar => "INSTALL_OPENASAR",
            Self::UninstallOpenAsar => "UNINSTALL_OPENASAR",
        }
    }

    /// Parses a wire tag. Matching is exact and case-sensitive.
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == tag)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discovered installation, as listed by `LIST_INSTALLS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstallRecord {
    /// Release branch (`stable`, `ptb`, ...).
    pub branch: String,
    /// Installation path; the handle clients pass back to other operations.
    pub path: String,
    /// Whether the installation is currently patched.
    pub is_patched: bool,
    /// Whether OpenAsar is installed.
    pub is_open_asar: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operation_tags_roundtrip() {
        for op in Operation::ALL {
            assert_eq!(Operation::parse(op.as_str()), Some(op));
        }
    }

    #[test]
    fn operation_parse_is_exact() {
        assert_eq!(Operation::parse("patch"), None);
        assert_eq!(Operation::parse(" PATCH"), None);
        assert_eq!(Operation::parse("OK"), None);
        assert_eq!(Operation::parse(""), None);
    }

    #[test]
    fn ok_reply_keeps_null_data() {
        let reply = Envelope::ok("7", Value::Null);
        let json = serde_json::to_string(&reply).unwrap();
        assert_eq!(json, r#"{"nonce":"7","op":"OK","data":null}"#);
        assert!(reply.is_ok());
    }

    #[test]
    fn error_reply_has_no_data() {
        let reply = Envelope::error("7", "boom");
        let json = serde_json::to_string(&reply).unwrap();
        assert_eq!(json, r#"{"nonce":"7","op":"ERROR","message":"boom"}"#);
        assert!(!reply.is_ok());
    }

    #[test]
    fn list_reply_wire_shape() {
        let records = vec![InstallRecord {
            branch: "canary".to_string(),
            path: "/opt/discord-canary".to_string(),
            is_patched: true,
            is_open_asar: false,
        }];
        let reply = Envelope::ok("1", serde_json::to_value(&records).unwrap());

        insta::assert_json_snapshot!(reply, @r#"
        {
          "nonce": "1",
          "op": "OK",
          "data": [
            {
              "Branch": "canary",
              "Path": "/opt/discord-canary",
              "IsPatched": true,
              "IsOpenAsar": false
            }
          ]
        }
        "#);
    }

    #[test]
    fn string_payload_only_for_strings() {
        let patch = |data| Envelope {
            nonce: "1".to_string(),
            op: "PATCH".to_string(),
            data,
            message: None,
        };
        assert_eq!(patch(Some(json!("/opt/discord"))).string_payload(), Some("/opt/discord"));
        assert_eq!(patch(Some(json!(42))).string_payload(), None);
        assert_eq!(patch(Some(Value::Null)).string_payload(), None);
        assert_eq!(patch(None).string_payload(), None);
    }
}
