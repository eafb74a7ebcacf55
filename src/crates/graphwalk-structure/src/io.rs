//! Reader/writer boundary for detached elements.
//!
//! Elements leave a graph only as [`DetachedElement`]s. The bundled format is
//! JSON lines: one element per line, vertices before the edges that reference
//! them.
//!
//! ```text
//! {"kind":"vertex","id":1,"label":"person","properties":{...}}
//! {"kind":"edge","id":7,"label":"knows","out_vertex":1,"in_vertex":2,"properties":{...}}
//! ```

use crate::detached::{DetachedEdge, DetachedVertex};
use crate::error::{Result, StructureError};
use crate::graph::Graph;
use crate::value::VertexId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{BufRead, Write};

/// A vertex or an edge detached from its graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetachedElement {
    Vertex(DetachedVertex),
    Edge(DetachedEdge),
}

impl From<DetachedVertex> for DetachedElement {
    fn from(vertex: DetachedVertex) -> Self {
        Self::Vertex(vertex)
    }
}

impl From<DetachedEdge> for DetachedElement {
    fn from(edge: DetachedEdge) -> Self {
        Self::Edge(edge)
    }
}

/// Writes detached elements to a byte stream.
pub trait GraphWriter {
    fn write_element(&mut self, element: &DetachedElement) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    /// Write every vertex, then every edge, of `graph`.
    fn write_graph(&mut self, graph: &dyn Graph) -> Result<usize> {
        let mut written = 0;
        for id in graph.vertex_ids() {
            self.write_element(&graph.vertex(id)?.into())?;
            written += 1;
        }
        for id in graph.edge_ids() {
            self.write_element(&graph.edge(id)?.into())?;
            written += 1;
        }
        self.flush()?;
        tracing::debug!(elements = written, "Wrote graph");
        Ok(written)
    }
}

/// Reads detached elements from a byte stream.
pub trait GraphReader {
    /// Next element, or `None` at end of stream.
    fn read_element(&mut self) -> Result<Option<DetachedElement>>;

    /// Rehydrate every element of the stream into `graph`.
    ///
    /// Edge endpoints are remapped when the target graph assigned new ids to
    /// the vertices read earlier. Returns the number of elements added.
    fn read_into(&mut self, graph: &dyn Graph) -> Result<usize> {
        let mut ids: HashMap<VertexId, VertexId> = HashMap::new();
        let mut added = 0;
        while let Some(element) = self.read_element()? {
            match element {
                DetachedElement::Vertex(vertex) => {
                    let id = vertex.add_to(graph)?;
                    ids.insert(vertex.id(), id);
                }
                DetachedElement::Edge(edge) => {
                    let out = ids.get(&edge.out_vertex()).copied().unwrap_or(edge.out_vertex());
                    let inv = ids.get(&edge.in_vertex()).copied().unwrap_or(edge.in_vertex());
                    edge.add_to_between(graph, out, inv)?;
                }
            }
            added += 1;
        }
        tracing::debug!(elements = added, "Read graph");
        Ok(added)
    }
}

/// JSON-lines writer.
#[derive(Debug)]
pub struct JsonLinesWriter<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> GraphWriter for JsonLinesWriter<W> {
    fn write_element(&mut self, element: &DetachedElement) -> Result<()> {
        serde_json::to_writer(&mut self.out, element)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// JSON-lines reader. Blank lines are skipped.
#[derive(Debug)]
pub struct JsonLinesReader<R: BufRead> {
    input: R,
    line: String,
    line_number: usize,
}

impl<R: BufRead> JsonLinesReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            line: String::new(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> GraphReader for JsonLinesReader<R> {
    fn read_element(&mut self) -> Result<Option<DetachedElement>> {
        loop {
            self.line.clear();
            if self.input.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return serde_json::from_str(trimmed).map(Some).map_err(|e| {
                tracing::warn!(line = self.line_number, error = %e, "Malformed element");
                StructureError::Serialization(e)
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{EdgeId, Properties, Value};

    #[test]
    fn test_element_tagging() {
        let element: DetachedElement =
            DetachedVertex::new(VertexId::new(1), "person", Properties::new()).into();
        let json = serde_json::to_string(&element).unwrap();
        assert!(json.starts_with(r#"{"kind":"vertex","id":1"#));
    }

    #[test]
    fn test_reader_skips_blank_lines() {
        let input = "\n{\"kind\":\"edge\",\"id\":7,\"label\":\"knows\",\"out_vertex\":1,\"in_vertex\":2}\n\n";
        let mut reader = JsonLinesReader::new(input.as_bytes());
        match reader.read_element().unwrap() {
            Some(DetachedElement::Edge(edge)) => {
                assert_eq!(edge.id(), EdgeId::new(7));
                assert!(edge.properties().is_empty());
            }
            other => panic!("unexpected element: {:?}", other),
        }
        assert!(reader.read_element().unwrap().is_none());
    }

    #[test]
    fn test_reader_reports_malformed_line() {
        let mut reader = JsonLinesReader::new("{not json}\n".as_bytes());
        assert!(matches!(
            reader.read_element(),
            Err(StructureError::Serialization(_))
        ));
    }

    #[test]
    fn test_writer_one_element_per_line() {
        let mut writer = JsonLinesWriter::new(Vec::new());
        let mut properties = Properties::new();
        properties.insert("name".to_string(), Value::from("lop"));
        writer
            .write_element(&DetachedVertex::new(VertexId::new(3), "software", properties).into())
            .unwrap();
        writer
            .write_element(&DetachedVertex::new(VertexId::new(4), "person", Properties::new()).into())
            .unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
