//! Small sample graphs.

use super::TinkerGraph;
use crate::error::Result;
use crate::graph::Graph;
use crate::value::{Properties, Value, VertexId};

fn props(pairs: Vec<(&str, Value)>) -> Properties {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// The six-vertex "modern" graph.
///
/// ```text
/// marko(1) -knows(0.5)-> vadas(2)
/// marko(1) -knows(1.0)-> josh(4)
/// marko(1) -created(0.4)-> lop(3)
/// josh(4)  -created(1.0)-> ripple(5)
/// josh(4)  -created(0.4)-> lop(3)
/// peter(6) -created(0.2)-> lop(3)
/// ```
///
/// Vertex ids are 1 through 6 and edge ids 7 through 12.
pub fn modern() -> Result<TinkerGraph> {
    let graph = TinkerGraph::new();
    let person = |id: u64, name: &str, age: i64| -> Result<VertexId> {
        graph.add_vertex(
            Some(VertexId::new(id)),
            "person",
            props(vec![("name", Value::from(name)), ("age", Value::Int(age))]),
        )
    };
    let marko = person(1, "marko", 29)?;
    let vadas = person(2, "vadas", 27)?;
    let lop = graph.add_vertex(
        Some(VertexId::new(3)),
        "software",
        props(vec![("name", Value::from("lop")), ("lang", Value::from("java"))]),
    )?;
    let josh = person(4, "josh", 32)?;
    let ripple = graph.add_vertex(
        Some(VertexId::new(5)),
        "software",
        props(vec![("name", Value::from("ripple")), ("lang", Value::from("java"))]),
    )?;
    let peter = person(6, "peter", 35)?;

    let weight = |w: f64| props(vec![("weight", Value::Float(w))]);
    graph.add_edge(marko, "knows", vadas, weight(0.5))?;
    graph.add_edge(marko, "knows", josh, weight(1.0))?;
    graph.add_edge(marko, "created", lop, weight(0.4))?;
    graph.add_edge(josh, "created", ripple, weight(1.0))?;
    graph.add_edge(josh, "created", lop, weight(0.4))?;
    graph.add_edge(peter, "created", lop, weight(0.2))?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Direction, EdgeId};

    #[test]
    fn test_modern_shape() {
        let graph = modern().unwrap();
        assert_eq!(graph.vertex_count(), 6);
        assert_eq!(graph.edge_count(), 6);
        assert_eq!(graph.edge_ids().first(), Some(&EdgeId::new(7)));
        assert_eq!(
            graph
                .adjacent_vertices(VertexId::new(1), Direction::Out, &[])
                .unwrap()
                .len(),
            3
        );
        assert_eq!(
            graph.vertex_property(VertexId::new(4), "name").unwrap(),
            Some(Value::from("josh"))
        );
    }
}
