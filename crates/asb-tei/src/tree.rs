//! Owned element tree and the small query vocabulary the resolver needs.
//!
//! Element names are stored without their namespace prefix; attribute names
//! keep theirs, so the XML id attribute is looked up as `xml:id`.

use std::fmt;

// ─── Nodes ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
  Element(Element),
  Text(String),
  /// Placeholder for content owned outside the tree. Writers ask a
  /// [`crate::SlotRenderer`] to produce the element that stands here.
  Slot(usize),
  /// Raw comment content, written back unescaped.
  Comment(String),
  /// Processing instruction content: target and data, without `<?`/`?>`.
  Pi(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
  pub name:     String,
  pub attrs:    Vec<(String, String)>,
  pub children: Vec<Node>,
}

/// Child-index path from some element down to one of its descendants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct NodePath(Vec<usize>);

impl NodePath {
  pub fn root() -> Self { Self(Vec::new()) }

  pub fn child(&self, index: usize) -> Self {
    let mut steps = self.0.clone();
    steps.push(index);
    Self(steps)
  }

  pub fn join(&self, rest: &NodePath) -> Self {
    let mut steps = self.0.clone();
    steps.extend_from_slice(&rest.0);
    Self(steps)
  }

  pub fn steps(&self) -> &[usize] { &self.0 }
}

impl fmt::Display for NodePath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("/")?;
    let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
    f.write_str(&parts.join("/"))
  }
}

// ─── Element ─────────────────────────────────────────────────────────────────

impl Element {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name:     name.into(),
      attrs:    Vec::new(),
      children: Vec::new(),
    }
  }

  /// Builder-style attribute setter.
  pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
    self.set_attr(name, value);
    self
  }

  /// Builder-style text child.
  pub fn with_text(mut self, text: impl Into<String>) -> Self {
    self.children.push(Node::Text(text.into()));
    self
  }

  pub fn with_child(mut self, child: Element) -> Self {
    self.children.push(Node::Element(child));
    self
  }

  pub fn attr(&self, name: &str) -> Option<&str> {
    self
      .attrs
      .iter()
      .find(|(k, _)| k == name)
      .map(|(_, v)| v.as_str())
  }

  pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
    let value = value.into();
    match self.attrs.iter_mut().find(|(k, _)| k == name) {
      Some((_, v)) => *v = value,
      None => self.attrs.push((name.to_string(), value)),
    }
  }

  pub fn remove_attr(&mut self, name: &str) -> Option<String> {
    let pos = self.attrs.iter().position(|(k, _)| k == name)?;
    Some(self.attrs.remove(pos).1)
  }

  pub fn push(&mut self, node: Node) { self.children.push(node); }

  /// Direct child elements.
  pub fn elements(&self) -> impl Iterator<Item = &Element> {
    self.children.iter().filter_map(|n| match n {
      Node::Element(e) => Some(e),
      _ => None,
    })
  }

  pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
    self.children.iter_mut().filter_map(|n| match n {
      Node::Element(e) => Some(e),
      _ => None,
    })
  }

  /// Direct child elements called `name`.
  pub fn children_named<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Iterator<Item = &'a Element> + 'a {
    self.elements().filter(move |e| e.name == name)
  }

  pub fn child(&self, name: &str) -> Option<&Element> {
    self.elements().find(|e| e.name == name)
  }

  /// Follow a `/`-separated chain of child names. Every matching child is
  /// followed at each step, so `desc/list/item` yields all items of all
  /// lists of all descs.
  pub fn path(&self, path: &str) -> Vec<&Element> {
    let mut current = vec![self];
    for step in path.split('/').filter(|s| !s.is_empty()) {
      current = current
        .into_iter()
        .flat_map(|e| e.elements().filter(move |c| c.name == step))
        .collect();
    }
    current
  }

  /// All descendant elements in document order, excluding `self`.
  pub fn descendants(&self) -> Descendants<'_> {
    let mut stack: Vec<&Element> = self.elements().collect();
    stack.reverse();
    Descendants { stack }
  }

  /// Descendant elements called `name`, in document order.
  pub fn find_all<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Iterator<Item = &'a Element> + 'a {
    self.descendants().filter(move |e| e.name == name)
  }

  pub fn find(&self, name: &str) -> Option<&Element> {
    self.descendants().find(|e| e.name == name)
  }

  /// Descendant elements called `name` together with their paths relative
  /// to `self`, in document order.
  pub fn find_paths(&self, name: &str) -> Vec<(NodePath, &Element)> {
    let mut found = Vec::new();
    collect_paths(self, &NodePath::root(), name, &mut found);
    found
  }

  pub fn at_path(&self, path: &NodePath) -> Option<&Element> {
    let mut current = self;
    for &i in path.steps() {
      current = match current.children.get(i)? {
        Node::Element(e) => e,
        _ => return None,
      };
    }
    Some(current)
  }

  pub fn at_path_mut(&mut self, path: &NodePath) -> Option<&mut Element> {
    let mut current = self;
    for &i in path.steps() {
      current = match current.children.get_mut(i)? {
        Node::Element(e) => e,
        _ => return None,
      };
    }
    Some(current)
  }

  /// Swap the node at `path` for `node`, returning the old one. The root
  /// itself cannot be replaced.
  pub fn replace_at(&mut self, path: &NodePath, node: Node) -> Option<Node> {
    let (&last, parent_steps) = path.steps().split_last()?;
    let parent = self.at_path_mut(&NodePath(parent_steps.to_vec()))?;
    let slot = parent.children.get_mut(last)?;
    Some(std::mem::replace(slot, node))
  }

  /// Detach every descendant element called `name` and return them in
  /// document order. Matches nested inside an earlier match stay inside it.
  pub fn take_all(&mut self, name: &str) -> Vec<Element> {
    let mut taken = Vec::new();
    take_into(self, name, &mut taken);
    taken
  }

  /// Swap every descendant element called `name` for the node `f` makes of
  /// it. Matches nested inside an earlier match are not visited.
  pub fn replace_all<F>(&mut self, name: &str, f: &mut F)
  where
    F: FnMut(Element) -> Node,
  {
    for child in &mut self.children {
      let Node::Element(c) = child else { continue };
      if c.name == name {
        let el = std::mem::take(c);
        *child = f(el);
      } else {
        c.replace_all(name, f);
      }
    }
  }

  /// Call `f` on every descendant element, parents before children.
  pub fn visit_mut<F>(&mut self, f: &mut F)
  where
    F: FnMut(&mut Element),
  {
    for c in self.elements_mut() {
      f(c);
      c.visit_mut(f);
    }
  }

  /// Drop every slot below this element for which `keep` is false.
  pub fn retain_slots<F>(&mut self, keep: &mut F)
  where
    F: FnMut(usize) -> bool,
  {
    self.children.retain(|n| match n {
      Node::Slot(s) => keep(*s),
      _ => true,
    });
    for c in self.elements_mut() {
      c.retain_slots(keep);
    }
  }

  /// Concatenation of all descendant text.
  pub fn text(&self) -> String {
    let mut out = String::new();
    for t in self.texts() {
      out.push_str(t);
    }
    out
  }

  /// Every descendant text node, in document order.
  pub fn texts(&self) -> Vec<&str> {
    let mut out = Vec::new();
    collect_texts(self, &mut out);
    out
  }

  /// Concatenation of the direct text children only.
  pub fn own_text(&self) -> String {
    self
      .children
      .iter()
      .filter_map(|n| match n {
        Node::Text(t) => Some(t.as_str()),
        _ => None,
      })
      .collect()
  }

  /// The first direct text child, if any.
  pub fn first_text(&self) -> Option<&str> {
    self.children.iter().find_map(|n| match n {
      Node::Text(t) => Some(t.as_str()),
      _ => None,
    })
  }

  /// Slot ids placed anywhere below this element.
  pub fn slots(&self) -> Vec<usize> {
    let mut out = Vec::new();
    collect_slots(self, &mut out);
    out
  }
}

// ─── Traversal helpers ───────────────────────────────────────────────────────

pub struct Descendants<'a> {
  stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
  type Item = &'a Element;

  fn next(&mut self) -> Option<Self::Item> {
    let next = self.stack.pop()?;
    let len = self.stack.len();
    self.stack.extend(next.elements());
    self.stack[len..].reverse();
    Some(next)
  }
}

fn collect_paths<'a>(
  el: &'a Element,
  at: &NodePath,
  name: &str,
  out: &mut Vec<(NodePath, &'a Element)>,
) {
  for (i, child) in el.children.iter().enumerate() {
    if let Node::Element(c) = child {
      let path = at.child(i);
      if c.name == name {
        out.push((path.clone(), c));
      }
      collect_paths(c, &path, name, out);
    }
  }
}

fn take_into(el: &mut Element, name: &str, out: &mut Vec<Element>) {
  let children = std::mem::take(&mut el.children);
  for child in children {
    match child {
      Node::Element(c) if c.name == name => out.push(c),
      Node::Element(mut c) => {
        take_into(&mut c, name, out);
        el.children.push(Node::Element(c));
      }
      other => el.children.push(other),
    }
  }
}

fn collect_texts<'a>(el: &'a Element, out: &mut Vec<&'a str>) {
  for child in &el.children {
    match child {
      Node::Text(t) => out.push(t),
      Node::Element(c) => collect_texts(c, out),
      _ => {}
    }
  }
}

fn collect_slots(el: &Element, out: &mut Vec<usize>) {
  for child in &el.children {
    match child {
      Node::Slot(s) => out.push(*s),
      Node::Element(c) => collect_slots(c, out),
      _ => {}
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parse;

  const SAMPLE: &str = r##"<TEI>
  <person xml:id="p1">
    <event type="offence" xml:id="o1"><desc><placeName>Wien</placeName></desc></event>
    <event type="execution"><desc><date when="1750-01-02"/></desc></event>
  </person>
  <relation active="#o1" passive="#execution"/>
</TEI>"##;

  #[test]
  fn descendants_are_in_document_order() {
    let root = parse(SAMPLE).unwrap();
    let names: Vec<&str> =
      root.descendants().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec![
      "person",
      "event",
      "desc",
      "placeName",
      "event",
      "desc",
      "date",
      "relation"
    ]);
  }

  #[test]
  fn path_follows_all_branches() {
    let root = parse(SAMPLE).unwrap();
    let person = root.child("person").unwrap();
    assert_eq!(person.path("event/desc").len(), 2);
    assert_eq!(person.path("event/desc/placeName")[0].text(), "Wien");
  }

  #[test]
  fn paths_resolve_back_to_the_same_element() {
    let root = parse(SAMPLE).unwrap();
    for (path, el) in root.find_paths("event") {
      assert_eq!(root.at_path(&path), Some(el));
    }
  }

  #[test]
  fn take_all_detaches_matches() {
    let mut root = parse(SAMPLE).unwrap();
    let taken = root.take_all("relation");
    assert_eq!(taken.len(), 1);
    assert_eq!(taken[0].attr("active"), Some("#o1"));
    assert!(root.find("relation").is_none());
  }

  #[test]
  fn replace_at_swaps_in_place() {
    let mut root = parse(SAMPLE).unwrap();
    let (path, _) = root.find_paths("event").remove(1);
    let old = root
      .replace_at(&path, Node::Element(Element::new("rs")))
      .unwrap();
    assert!(matches!(old, Node::Element(ref e) if e.name == "event"));
    assert_eq!(root.at_path(&path).map(|e| e.name.as_str()), Some("rs"));
  }

  #[test]
  fn set_attr_overwrites() {
    let mut el = Element::new("event").with_attr("xml:id", "a");
    el.set_attr("xml:id", "b");
    assert_eq!(el.attrs.len(), 1);
    assert_eq!(el.attr("xml:id"), Some("b"));
    assert_eq!(el.remove_attr("xml:id").as_deref(), Some("b"));
    assert!(el.attr("xml:id").is_none());
  }

  #[test]
  fn lookups_outlive_the_name_they_were_given() {
    let root = parse(SAMPLE).unwrap();
    let (person, place) = {
      let person = String::from("person");
      let place = String::from("placeName");
      (root.child(&person), root.find(&place))
    };
    assert_eq!(person.and_then(|p| p.attr("xml:id")), Some("p1"));
    assert_eq!(place.map(Element::text).as_deref(), Some("Wien"));
    let dates = {
      let chain = String::from("person/event/desc/date");
      root.path(&chain)
    };
    assert_eq!(dates.len(), 1);
  }

  #[test]
  fn replace_all_keeps_positions() {
    let mut root = parse(SAMPLE).unwrap();
    let mut n = 0;
    root.replace_all("relation", &mut |_| {
      n += 1;
      Node::Slot(n)
    });
    assert!(root.find("relation").is_none());
    assert_eq!(root.slots(), vec![1]);

    root.retain_slots(&mut |s| s != 1);
    assert!(root.slots().is_empty());
  }

  #[test]
  fn visit_mut_reaches_every_descendant() {
    let mut root = parse(SAMPLE).unwrap();
    let mut seen = 0;
    root.visit_mut(&mut |el| {
      seen += 1;
      if el.name == "event" {
        el.set_attr("seen", "yes");
      }
    });
    assert_eq!(seen, 8);
    assert!(root.find_all("event").all(|e| e.attr("seen") == Some("yes")));
  }
}
