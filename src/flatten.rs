//! Reshaping of dispatcher replies into the flat lists the web UI expects

use crate::dispatch::{Dispatcher, Element, XcatResponse};
use crate::error::Result;
use crate::types::{CmdParams, CmdResponse, CommandRequest, RspEntry};

/// Run one command end to end: dispatch it, pick the shape, flatten the reply
pub async fn run(dispatcher: &dyn Dispatcher, params: &CmdParams) -> Result<CmdResponse> {
    let req = CommandRequest::from_params(params)?;

    let reply = dispatcher.dispatch(&req).await.map_err(|e| {
        tracing::warn!("{} failed: {}", req.command, e);
        e
    })?;

    for error in reply.errors() {
        tracing::debug!("{} reported: {}", req.command, error);
    }

    let shape = OutputShape::select(&req.command, &req.args);
    Ok(CmdResponse::new(flatten(shape, &reply), params.msg.as_deref()))
}

/// How a command's reply is flattened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    /// `[node name, status]` pairs (`webrun pping`, `nodels`)
    NodeStatus,
    /// Group names from `extnoderange`
    NodeRange,
    /// Text of every reply item
    Plain,
}

impl OutputShape {
    pub fn select(command: &str, args: &[String]) -> Self {
        if starts_with_ignore_case(command, "webrun")
            && args.iter().any(|a| a.to_ascii_lowercase().contains("pping"))
        {
            OutputShape::NodeStatus
        } else if starts_with_ignore_case(command, "nodels") {
            OutputShape::NodeStatus
        } else if starts_with_ignore_case(command, "extnoderange") {
            OutputShape::NodeRange
        } else {
            OutputShape::Plain
        }
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

pub fn flatten(shape: OutputShape, rsp: &XcatResponse) -> Vec<RspEntry> {
    match shape {
        OutputShape::NodeStatus => node_status(rsp),
        OutputShape::NodeRange => node_range(rsp),
        OutputShape::Plain => plain(rsp),
    }
}

fn items(rsp: &XcatResponse) -> impl Iterator<Item = &Element> {
    rsp.responses().flat_map(|r| r.children.iter())
}

fn node_status(rsp: &XcatResponse) -> Vec<RspEntry> {
    items(rsp)
        .map(|node| {
            RspEntry::Pair(
                node.text_at(&["name"]).to_string(),
                node.text_at(&["data", "contents"]).to_string(),
            )
        })
        .collect()
}

/// Only the first response carries the group list
fn node_range(rsp: &XcatResponse) -> Vec<RspEntry> {
    rsp.responses()
        .next()
        .map(|first| {
            first
                .children_named("intersectinggroups")
                .map(|g| RspEntry::Text(g.text.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn plain(rsp: &XcatResponse) -> Vec<RspEntry> {
    items(rsp).map(|item| RspEntry::Text(item.text.clone())).collect()
}
