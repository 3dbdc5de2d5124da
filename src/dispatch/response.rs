//! Decoding of xcatd response streams into an element tree

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Error, Result};

/// Element carrying the end-of-stream marker
const SERVER_DONE: &str = "serverdone";

/// A node of the response tree.
///
/// `text` holds only the element's own character data; text that belongs to
/// descendants stays with them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// First child with the given name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given name, in document order
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text at a child path, or an empty string when any step is missing
    pub fn text_at(&self, path: &[&str]) -> &str {
        let mut current = self;
        for name in path {
            match current.child(name) {
                Some(child) => current = child,
                None => return "",
            }
        }
        &current.text
    }
}

/// The full reply of one dispatcher exchange.
///
/// The root is a synthetic `<xcat>` element whose children are the
/// individual `<xcatresponse>` documents, with the `serverdone` marker
/// removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XcatResponse {
    root: Element,
}

impl XcatResponse {
    /// Parse the raw stream of `<xcatresponse>` documents
    pub fn parse(stream: &str) -> Result<Self> {
        let wrapped = format!("<xcat>{}</xcat>", strip_declarations(stream));
        let mut root = parse_document(&wrapped)?;

        root.children.retain_mut(|response| {
            let before = response.children.len();
            response.children.retain(|c| c.name != SERVER_DONE);
            !(response.children.len() < before && response.children.is_empty())
        });

        Ok(Self { root })
    }

    /// The `<xcatresponse>` elements, in arrival order
    pub fn responses(&self) -> impl Iterator<Item = &Element> {
        self.root.children.iter()
    }

    /// Text of every `<error>` element the dispatcher reported
    pub fn errors(&self) -> Vec<&str> {
        self.responses()
            .flat_map(|r| r.children_named("error"))
            .map(|e| e.text.as_str())
            .collect()
    }
}

/// Opening of the end-of-stream marker tag; `<` never occurs unescaped in text
const SERVER_DONE_TAG: &[u8] = b"<serverdone";
const RESPONSE_CLOSE: &[u8] = b"</xcatresponse>";

/// Watches a growing reply buffer for the end of the `serverdone` response.
///
/// Each call only looks at bytes added since the previous call, plus enough
/// overlap to catch a tag split across reads.
#[derive(Debug, Default)]
pub(crate) struct DoneScanner {
    scanned: usize,
    done_at: Option<usize>,
}

impl DoneScanner {
    const OVERLAP: usize = RESPONSE_CLOSE.len() - 1;

    /// True once `buf` holds the complete `serverdone` response
    pub(crate) fn feed(&mut self, buf: &[u8]) -> bool {
        let from = self.scanned.saturating_sub(Self::OVERLAP);
        self.scanned = buf.len();

        let done_at = match self.done_at {
            Some(pos) => pos,
            None => match find(&buf[from..], SERVER_DONE_TAG) {
                Some(pos) => {
                    let end = from + pos + SERVER_DONE_TAG.len();
                    self.done_at = Some(end);
                    end
                }
                None => return false,
            },
        };

        find(&buf[from.max(done_at)..], RESPONSE_CLOSE).is_some()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn strip_declarations(stream: &str) -> String {
    let mut out = String::with_capacity(stream.len());
    let mut rest = stream;

    while let Some(start) = rest.find("<?xml") {
        out.push_str(&rest[..start]);
        match rest[start..].find("?>") {
            Some(end) => rest = &rest[start + end + 2..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Parse a single-rooted XML document into an element tree
pub(crate) fn parse_document(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                stack.push(Element::new(String::from_utf8_lossy(e.name().as_ref())));
            }
            Event::Empty(e) => {
                let element = Element::new(String::from_utf8_lossy(e.name().as_ref()));
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| Error::InvalidResponse("unbalanced closing tag".into()))?;
                // Indentation between child tags; leaf text is kept as sent
                if !element.children.is_empty() && element.text.trim().is_empty() {
                    element.text.clear();
                }
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                match stack.last_mut() {
                    Some(parent) => parent.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(Error::InvalidResponse("text outside of root element".into()))
                    }
                }
            }
            Event::CData(c) => {
                if let Some(parent) = stack.last_mut() {
                    parent.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::InvalidResponse(format!("unclosed element <{}>", open.name)));
    }

    root.ok_or_else(|| Error::InvalidResponse("empty document".into()))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(Error::InvalidResponse("multiple root elements".into())),
    }
    Ok(())
}
