use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;

use crate::config::XmlSchema;
use crate::error::{MubinGraphError, Result};
use crate::graph::{Link, Object, UNKNOWN};
use crate::ident::{normalize, HashId};

/// Objects pulled from one document plus counts of what was dropped.
#[derive(Debug, Default)]
pub struct Extraction {
    pub objects: Vec<Object>,
    /// Objects with a missing or unparseable id attribute
    pub skipped_objects: usize,
    /// Links with a missing or unparseable target attribute
    pub skipped_links: usize,
}

#[derive(Default)]
struct PendingLink {
    target: Option<HashId>,
    link_type: String,
}

#[derive(Default)]
struct PendingObject {
    id: Option<HashId>,
    name: String,
    links: Vec<Link>,
    link: Option<PendingLink>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Role {
    Object,
    Name,
    Link,
    LinkType,
    Other,
}

fn non_empty_or_unknown(text: String) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        UNKNOWN.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Read and validate an id attribute. `None` when absent or invalid.
fn id_attribute(e: &BytesStart, key: &str, path: &str) -> Option<HashId> {
    let attr = e
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key.as_bytes())?;
    let raw = String::from_utf8_lossy(&attr.value);
    match normalize(&raw) {
        Ok(id) => Some(id),
        Err(err) => {
            log::warn!("{}: ignoring {}={:?}: {}", path, key, raw, err);
            None
        }
    }
}

/// Expand an entity reference (`&amp;`, `&#38;`, `&#x26;`). Unknown entities are kept verbatim.
fn resolve_reference(e: &BytesRef, path: &str) -> String {
    if let Ok(Some(ch)) = e.resolve_char_ref() {
        return ch.to_string();
    }
    let name = String::from_utf8_lossy(e);
    match resolve_predefined_entity(&name) {
        Some(value) => value.to_string(),
        None => {
            log::debug!("{}: leaving unknown entity &{}; as-is", path, name);
            format!("&{};", name)
        }
    }
}

/// Walks the element tree with a name stack; positions are relative to the root.
struct Extractor<'s> {
    schema: &'s XmlSchema,
    path: &'s str,
    stack: Vec<String>,
    current: Option<PendingObject>,
    out: Extraction,
}

impl<'s> Extractor<'s> {
    fn new(schema: &'s XmlSchema, path: &'s str) -> Self {
        Self {
            schema,
            path,
            stack: Vec::new(),
            current: None,
            out: Extraction::default(),
        }
    }

    /// Role of the element on top of the stack.
    fn role(&self) -> Role {
        let s = self.schema;
        let names: Vec<&str> = self.stack.iter().map(String::as_str).collect();
        match names.as_slice() {
            [_, list, item] if *list == s.object_list && *item == s.item => Role::Object,
            [_, list, item, name] if *list == s.object_list && *item == s.item && *name == s.object_name => {
                Role::Name
            }
            [_, list, item, links, link]
                if *list == s.object_list && *item == s.item && *links == s.link_list && *link == s.item =>
            {
                Role::Link
            }
            [_, list, item, links, link, ty]
                if *list == s.object_list
                    && *item == s.item
                    && *links == s.link_list
                    && *link == s.item
                    && *ty == s.link_type =>
            {
                Role::LinkType
            }
            _ => Role::Other,
        }
    }

    fn open(&mut self, e: &BytesStart) {
        self.stack
            .push(String::from_utf8_lossy(e.name().as_ref()).to_string());
        match self.role() {
            Role::Object => {
                self.current = Some(PendingObject {
                    id: id_attribute(e, &self.schema.object_id, self.path),
                    ..PendingObject::default()
                });
            }
            Role::Link => {
                let target = id_attribute(e, &self.schema.link_target, self.path);
                if let Some(obj) = self.current.as_mut() {
                    obj.link = Some(PendingLink { target, link_type: String::new() });
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        let role = self.role();
        let Some(obj) = self.current.as_mut() else {
            return;
        };
        match role {
            Role::Name => obj.name.push_str(text),
            Role::LinkType => {
                if let Some(link) = obj.link.as_mut() {
                    link.link_type.push_str(text);
                }
            }
            _ => {}
        }
    }

    fn close(&mut self) {
        match self.role() {
            Role::Object => {
                if let Some(obj) = self.current.take() {
                    self.finish_object(obj);
                }
            }
            Role::Link => {
                if let Some(obj) = self.current.as_mut() {
                    if let Some(link) = obj.link.take() {
                        match link.target {
                            Some(target) => obj
                                .links
                                .push(Link::new(target, non_empty_or_unknown(link.link_type))),
                            None => self.out.skipped_links += 1,
                        }
                    }
                }
            }
            _ => {}
        }
        self.stack.pop();
    }

    fn finish_object(&mut self, obj: PendingObject) {
        match obj.id {
            Some(id) => self.out.objects.push(Object {
                id,
                name: non_empty_or_unknown(obj.name),
                links: obj.links,
            }),
            None => {
                log::debug!("{}: skipping object without a usable {}", self.path, self.schema.object_id);
                self.out.skipped_objects += 1;
            }
        }
    }
}

/// Extract every object (and its links) from one map unit XML document.
///
/// Records missing their id, and links missing their target, are skipped and
/// counted; only a document that is not well-formed XML is an error.
pub fn extract_objects(content: &str, path: &str, schema: &XmlSchema) -> Result<Extraction> {
    let mut reader = Reader::from_str(content);
    let mut buf = Vec::new();
    let mut extractor = Extractor::new(schema, path);

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => extractor.open(&e),
            Ok(Event::Empty(e)) => {
                extractor.open(&e);
                extractor.close();
            }
            Ok(Event::End(_)) => extractor.close(),
            Ok(Event::Text(e)) => {
                let text = e
                    .decode()
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                extractor.text(&text);
            }
            Ok(Event::GeneralRef(e)) => {
                let text = resolve_reference(&e, path);
                extractor.text(&text);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e);
                extractor.text(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(MubinGraphError::Parse(format!(
                    "XML parse error in {}: {}",
                    path, e
                )));
            }
        }
        buf.clear();
    }

    Ok(extractor.out)
}
