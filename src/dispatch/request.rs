//! Encoding of xcatd request documents

use quick_xml::escape::escape;

use crate::types::CommandRequest;

/// Render a command as an `<xcatrequest>` document
pub fn encode_request(req: &CommandRequest) -> String {
    let mut xml = String::from("<xcatrequest>");
    push_element(&mut xml, "command", &req.command);

    if let Some(noderange) = &req.noderange {
        push_element(&mut xml, "noderange", noderange);
    }

    for arg in &req.args {
        push_element(&mut xml, "arg", arg);
    }

    xml.push_str("</xcatrequest>");
    xml
}

fn push_element(xml: &mut String, name: &str, text: &str) {
    xml.push('<');
    xml.push_str(name);
    xml.push('>');
    xml.push_str(&escape(text));
    xml.push_str("</");
    xml.push_str(name);
    xml.push('>');
}
