//! Per-vertex message boundary.

use crate::error::Result;
use graphwalk_structure::{Direction, Graph, VertexId};

/// Where a message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageScope {
    /// Vertices adjacent to the sender, one target per traversed edge
    Local {
        direction: Direction,
        labels: Vec<String>,
    },
    /// An explicit set of vertices, independent of adjacency
    Global(Vec<VertexId>),
}

impl MessageScope {
    /// Out-neighbors over edges with any of `labels` (all edges when empty).
    pub fn out(labels: &[&str]) -> Self {
        Self::local(Direction::Out, labels)
    }

    pub fn local(direction: Direction, labels: &[&str]) -> Self {
        Self::Local {
            direction,
            labels: labels.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn global(targets: impl IntoIterator<Item = VertexId>) -> Self {
        Self::Global(targets.into_iter().collect())
    }
}

/// Receives the messages sent to one vertex in the previous superstep and
/// buffers the ones it sends until the barrier.
#[derive(Debug)]
pub struct Messenger<'a, M> {
    vertex: VertexId,
    graph: &'a dyn Graph,
    incoming: &'a [M],
    outgoing: Vec<(VertexId, M)>,
}

impl<'a, M: Clone> Messenger<'a, M> {
    pub(crate) fn new(vertex: VertexId, graph: &'a dyn Graph, incoming: &'a [M]) -> Self {
        Self {
            vertex,
            graph,
            incoming,
            outgoing: Vec::new(),
        }
    }

    /// Messages addressed to this vertex in the previous superstep.
    ///
    /// Their order is unspecified.
    pub fn receive_messages(&self) -> &[M] {
        self.incoming
    }

    /// Queue `message` for every target of `scope`.
    ///
    /// Nothing is delivered before the next barrier.
    pub fn send_message(&mut self, scope: &MessageScope, message: M) -> Result<()> {
        let targets = match scope {
            MessageScope::Local { direction, labels } => {
                self.graph.adjacent_vertices(self.vertex, *direction, labels)?
            }
            MessageScope::Global(targets) => targets.clone(),
        };
        for target in targets {
            self.outgoing.push((target, message.clone()));
        }
        Ok(())
    }

    /// Number of messages queued so far.
    pub fn sent(&self) -> usize {
        self.outgoing.len()
    }

    pub(crate) fn into_outgoing(self) -> Vec<(VertexId, M)> {
        self.outgoing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphwalk_structure::tinker;

    #[test]
    fn test_local_scope_resolves_adjacency() {
        let graph = tinker::modern().unwrap();
        let incoming = [7u32];
        let mut messenger = Messenger::new(VertexId::new(1), &graph, &incoming);
        assert_eq!(messenger.receive_messages(), &[7]);

        messenger.send_message(&MessageScope::out(&["knows"]), 1).unwrap();
        messenger
            .send_message(&MessageScope::global([VertexId::new(6)]), 2)
            .unwrap();
        assert_eq!(messenger.sent(), 3);
        assert_eq!(
            messenger.into_outgoing(),
            vec![
                (VertexId::new(2), 1),
                (VertexId::new(4), 1),
                (VertexId::new(6), 2)
            ]
        );
    }
}
