use std::collections::HashMap;

/// Index into the [`Dom`] node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
}

/// Parsed response body. Read-only for the lifetime of a simulated page view;
/// every query below is a pure lookup over the arena.
#[derive(Debug, Clone)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    id_index: HashMap<String, NodeId>,
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        let id_attr = attrs.get("id").cloned();
        let element = Element { tag_name, attrs };
        let id = self.create_node(Some(parent), NodeType::Element(element));
        if let Some(id_attr) = id_attr {
            self.id_index.insert(id_attr, id);
        }
        id
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes[node_id.0].node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub(crate) fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)
            .and_then(|element| element.attrs.get(name).cloned())
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes[node_id.0].parent
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    pub(crate) fn is_descendant_of(&self, node_id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.parent(node_id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub(crate) fn find_ancestor_by_tag(&self, node_id: NodeId, tag: &str) -> Option<NodeId> {
        let mut cursor = self.parent(node_id);
        while let Some(current) = cursor {
            if self
                .tag_name(current)
                .map(|name| name.eq_ignore_ascii_case(tag))
                .unwrap_or(false)
            {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        match &self.nodes[node_id.0].node_type {
            NodeType::Document | NodeType::Element(_) => {
                let mut out = String::new();
                for child in &self.nodes[node_id.0].children {
                    out.push_str(&self.text_content(*child));
                }
                out
            }
            NodeType::Text(text) => text.clone(),
        }
    }

    /// Text content with runs of whitespace collapsed to single spaces and the
    /// ends trimmed, matching how a browser renders label and option text.
    pub(crate) fn normalized_text(&self, node_id: NodeId) -> String {
        self.text_content(node_id)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// All element nodes in document order (depth-first, pre-order).
    pub(crate) fn all_element_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements_dfs(self.root, &mut out);
        out
    }

    fn collect_elements_dfs(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        for child in &self.nodes[node_id.0].children {
            if self.element(*child).is_some() {
                out.push(*child);
            }
            self.collect_elements_dfs(*child, out);
        }
    }

    /// Descendant elements of `ancestor` matching `tag`, in document order.
    pub(crate) fn descendants_by_tag(&self, ancestor: NodeId, tag: &str) -> Vec<NodeId> {
        self.all_element_nodes()
            .into_iter()
            .filter(|node| {
                self.is_descendant_of(*node, ancestor)
                    && self
                        .tag_name(*node)
                        .map(|name| name.eq_ignore_ascii_case(tag))
                        .unwrap_or(false)
            })
            .collect()
    }
}
