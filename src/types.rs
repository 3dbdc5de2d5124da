//! Core types for xcat-web

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{Error, Result};

/// Query parameters of a command request
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct CmdParams {
    /// xCAT command, e.g. `rinv`
    pub cmd: Option<String>,
    /// Target node or group
    pub tgt: Option<String>,
    /// Command arguments, separated by semicolons
    pub args: Option<String>,
    /// Opaque message echoed back in the reply
    pub msg: Option<String>,
}

/// A command ready to be handed to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub command: String,
    pub noderange: Option<String>,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            noderange: None,
            args: Vec::new(),
        }
    }

    /// Build a request from raw query parameters.
    ///
    /// A blank `tgt` (empty or `"0"`) means no target. A missing `args` is
    /// sent as one empty argument, the way the web UI has always sent it.
    pub fn from_params(params: &CmdParams) -> Result<Self> {
        let command = params
            .cmd
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(Error::MissingCommand)?;

        Ok(Self {
            command: command.to_string(),
            noderange: present(params.tgt.as_deref()).map(str::to_string),
            args: split_args(params.args.as_deref().unwrap_or_default()),
        })
    }

    pub fn with_noderange(mut self, noderange: impl Into<String>) -> Self {
        self.noderange = Some(noderange.into());
        self
    }

    pub fn with_args(mut self, args: &str) -> Self {
        self.args = split_args(args);
        self
    }
}

/// Split a semicolon-separated argument string.
///
/// Splitting only happens when the first `;` is past the start of the
/// string; `";a"` stays a single argument. Empty pieces are kept.
pub fn split_args(args: &str) -> Vec<String> {
    match args.find(';') {
        Some(pos) if pos > 0 => args.split(';').map(str::to_string).collect(),
        _ => vec![args.to_string()],
    }
}

/// `None` for values the web UI uses to mean "not set": empty and `"0"`
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && *v != "0")
}

/// One line of command output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RspEntry {
    /// Plain output text
    Text(String),
    /// Node name and its status
    Pair(String, String),
}

/// JSON reply sent back to the browser
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CmdResponse {
    /// Flattened command output: strings, or `[name, status]` pairs
    #[schema(value_type = Vec<Object>)]
    pub rsp: Vec<RspEntry>,
    /// The request's `msg`, passed through
    pub msg: Option<String>,
}

impl CmdResponse {
    pub fn new(rsp: Vec<RspEntry>, msg: Option<&str>) -> Self {
        Self {
            rsp,
            msg: present(msg).map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(cmd: &str, tgt: &str, args: &str) -> CmdParams {
        CmdParams {
            cmd: Some(cmd.into()),
            tgt: Some(tgt.into()),
            args: Some(args.into()),
            msg: None,
        }
    }

    #[test]
    fn test_from_params_splits_args() {
        let req = CommandRequest::from_params(&params("rinv", "gpok123", "all;-V")).unwrap();

        assert_eq!(req.command, "rinv");
        assert_eq!(req.noderange.as_deref(), Some("gpok123"));
        assert_eq!(req.args, vec!["all", "-V"]);
    }

    #[test]
    fn test_single_arg_is_not_split() {
        let req = CommandRequest::from_params(&params("rpower", "node1", "stat")).unwrap();
        assert_eq!(req.args, vec!["stat"]);
    }

    #[test]
    fn test_empty_pieces_kept() {
        let req = CommandRequest::from_params(&params("chdef", "n1", "a;;b;")).unwrap();
        assert_eq!(req.args, vec!["a", "", "b", ""]);
    }

    #[test]
    fn test_empty_target_and_args() {
        let req = CommandRequest::from_params(&params("lsdef", "", "")).unwrap();

        assert!(req.noderange.is_none());
        assert_eq!(req.args, vec![""]);
    }

    #[test]
    fn test_missing_args_is_one_empty_arg() {
        let req = CommandRequest::from_params(&CmdParams {
            cmd: Some("tabdump".into()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(req.args, vec![""]);
    }

    #[test]
    fn test_leading_semicolon_not_split() {
        let req = CommandRequest::from_params(&params("xdsh", "n1", ";uptime")).unwrap();
        assert_eq!(req.args, vec![";uptime"]);

        let req = CommandRequest::from_params(&params("xdsh", "n1", "-t;5;uptime;")).unwrap();
        assert_eq!(req.args, vec!["-t", "5", "uptime", ""]);
    }

    #[test]
    fn test_zero_target_is_unset() {
        let req = CommandRequest::from_params(&params("nodels", "0", "groups")).unwrap();
        assert!(req.noderange.is_none());

        let req = CommandRequest::from_params(&params("nodels", "node0", "groups")).unwrap();
        assert_eq!(req.noderange.as_deref(), Some("node0"));
    }

    #[test]
    fn test_missing_command() {
        let err = CommandRequest::from_params(&CmdParams::default()).unwrap_err();
        assert!(matches!(err, Error::MissingCommand));

        let err = CommandRequest::from_params(&params("", "n1", "")).unwrap_err();
        assert!(matches!(err, Error::MissingCommand));
    }

    #[test]
    fn test_response_serialization() {
        let rsp = CmdResponse::new(
            vec![
                RspEntry::Text("node1: on".into()),
                RspEntry::Pair("node2".into(), "noping".into()),
            ],
            Some("status"),
        );

        let json = serde_json::to_value(&rsp).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "rsp": ["node1: on", ["node2", "noping"]],
                "msg": "status"
            })
        );
    }

    #[test]
    fn test_empty_msg_is_null() {
        let json = serde_json::to_value(CmdResponse::new(Vec::new(), Some(""))).unwrap();
        assert_eq!(json, serde_json::json!({ "rsp": [], "msg": null }));

        let json = serde_json::to_value(CmdResponse::new(Vec::new(), Some("0"))).unwrap();
        assert_eq!(json["msg"], serde_json::Value::Null);
    }
}
