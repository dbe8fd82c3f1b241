use std::fmt;

/// A weighted link to the network node at index `node`.
/// Whether `node` is the source or the target depends
/// on which node stores the connection.
#[derive(Clone, Copy, PartialEq)]
pub struct Connection {
    pub node: usize,
    pub weight: f32,
}

impl Connection {
    pub fn new(node: usize, weight: f32) -> Connection {
        Connection { node, weight }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.9}", self.node, self.weight)
    }
}
