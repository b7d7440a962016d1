use rdf_geopackage_model::BlankNode;

/// How fresh blank nodes are named.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlankNodeMode {
    /// Random identifiers. Blank nodes of different runs never collide.
    #[default]
    Random,
    /// Sequential identifiers (`b0`, `b1`, ...). Two runs over the same data produce the same
    /// output.
    Sequential,
}

/// Mints fresh blank nodes according to a [BlankNodeMode].
#[derive(Clone, Debug, Default)]
pub struct BlankNodeFactory {
    mode: BlankNodeMode,
    next: u64,
}

impl BlankNodeFactory {
    pub fn new(mode: BlankNodeMode) -> Self {
        Self { mode, next: 0 }
    }

    pub fn mode(&self) -> BlankNodeMode {
        self.mode
    }

    pub fn fresh(&mut self) -> BlankNode {
        match self.mode {
            BlankNodeMode::Random => BlankNode::default(),
            BlankNodeMode::Sequential => {
                let node = BlankNode::new_unchecked(format!("b{}", self.next));
                self.next += 1;
                node
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_nodes_are_deterministic() {
        let mut first = BlankNodeFactory::new(BlankNodeMode::Sequential);
        let mut second = BlankNodeFactory::new(BlankNodeMode::Sequential);
        assert_eq!(first.fresh(), second.fresh());
        assert_eq!(first.fresh().as_str(), "b1");
    }

    #[test]
    fn random_nodes_differ() {
        let mut factory = BlankNodeFactory::new(BlankNodeMode::Random);
        assert_ne!(factory.fresh(), factory.fresh());
    }
}
