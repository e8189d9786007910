//! Graph document serialization.
//!
//! The on-disk format is plain JSON: a name, a node list with positions and
//! parameter values, and a connection list of endpoint pairs. Operators are
//! referenced by id and resolved against a registry on load; parameter values
//! round-trip as raw JSON values.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use anyhow::{Context, Result};

use crate::graph::{Graph, Node, NodeId};
use crate::operator::flatten_params;
use crate::registry::Registry;

#[derive(Debug, Serialize, Deserialize)]
pub struct GraphDoc {
    pub name: String,
    pub nodes: Vec<NodeDoc>,
    #[serde(default)]
    pub connections: Vec<ConnectionDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeDoc {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub operator: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionDoc {
    pub source: EndpointDoc,
    pub destination: EndpointDoc,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EndpointDoc {
    pub node: NodeId,
    pub terminal: String,
}

impl Graph {
    /// Serialize to the document form. Deterministic: nodes in insertion
    /// order, connections enumerated per node, per output, in connection
    /// order.
    pub fn to_doc(&self) -> GraphDoc {
        let nodes = self
            .nodes
            .iter()
            .map(|node| {
                let mut params = Map::new();
                for param in flatten_params(node.operator.params()) {
                    if let Some(value) = node.param_values.get(param.id) {
                        params.insert(param.id.to_string(), value.clone());
                    }
                }
                NodeDoc {
                    id: node.id,
                    x: node.x,
                    y: node.y,
                    operator: node.operator.id().to_string(),
                    params,
                }
            })
            .collect();
        let mut connections = Vec::new();
        for node in &self.nodes {
            for output in &node.outputs {
                for connection in &output.connections {
                    connections.push(ConnectionDoc {
                        source: EndpointDoc {
                            node: connection.source.node,
                            terminal: connection.source.terminal.clone(),
                        },
                        destination: EndpointDoc {
                            node: connection.dest.node,
                            terminal: connection.dest.terminal.clone(),
                        },
                    });
                }
            }
        }
        GraphDoc {
            name: self.name.clone(),
            nodes,
            connections,
        }
    }

    pub fn to_js(&self) -> Result<Value> {
        serde_json::to_value(self.to_doc()).context("serializing graph document")
    }

    /// Rebuild a graph from its document form.
    ///
    /// An operator id the registry does not know is fatal for the whole
    /// document. Parameter ids the operator does not declare are dropped.
    /// Connections whose endpoints do not resolve are skipped. The loaded
    /// graph starts unmodified with no pending change marks.
    pub fn from_doc(doc: &GraphDoc, registry: &Registry) -> Result<Graph> {
        let mut graph = Graph::new();
        graph.name = doc.name.clone();
        for node_doc in &doc.nodes {
            let operator = registry
                .get(&node_doc.operator)
                .with_context(|| format!("loading node {}", node_doc.id))?;
            let declared = flatten_params(operator.params());
            let mut node = Node::new(operator.clone());
            node.id = node_doc.id;
            node.x = node_doc.x;
            node.y = node_doc.y;
            for param in declared {
                if let Some(value) = node_doc.params.get(param.id) {
                    node.param_values
                        .insert(param.id.to_string(), value.clone());
                }
            }
            graph.add(node);
        }
        for connection in &doc.connections {
            let connected = graph.connect(
                connection.source.node,
                &connection.source.terminal,
                connection.destination.node,
                &connection.destination.terminal,
            )?;
            if !connected {
                eprintln!(
                    "[document] skipping connection with unresolved endpoint: {}:{} -> {}:{}",
                    connection.source.node,
                    connection.source.terminal,
                    connection.destination.node,
                    connection.destination.terminal
                );
            }
        }
        graph.modified = false;
        graph.clear_pending();
        Ok(graph)
    }

    pub fn from_js(value: Value, registry: &Registry) -> Result<Graph> {
        let doc: GraphDoc =
            serde_json::from_value(value).context("parsing graph document")?;
        Self::from_doc(&doc, registry)
    }
}
