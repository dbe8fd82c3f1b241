use crate::Innovation;

use std::error::Error;
use std::fmt;

/// An error type indicating the connection being
/// added would break a genome invariant.
#[derive(Debug)]
pub(crate) enum ConnectionValidityError {
    /// The connection's marker is already present in the genome.
    DuplicateMarker(Innovation),
    /// The connection's endpoints do not exist.
    NonexistentEndpoints(Innovation, Innovation),
    /// The connection has the same endpoints as another with a different marker.
    DuplicateEndpoints(Innovation, (Innovation, Innovation)),
    /// The connection targets an input node.
    InputTarget(Innovation),
}

/// An error type indicating the node being
/// added would break a genome invariant.
#[derive(Debug)]
pub(crate) enum NodeValidityError {
    /// The node's id is a duplicate.
    DuplicateNodeID(Innovation),
}

/// An error type describing a broken invariant
/// found while checking a genome's integrity.
#[derive(Debug)]
pub(crate) enum IntegrityError {
    /// A connection references a node absent from the genome.
    DanglingConnection(Innovation, (Innovation, Innovation)),
    /// A connection is keyed under a marker different from its own.
    MisfiledConnection(Innovation, Innovation),
    /// Two connections share the same endpoints.
    DuplicateEndpoints(Innovation, (Innovation, Innovation)),
    /// The genome is missing one of its fixed input or output nodes.
    MissingFixedNode(Innovation),
    /// Enabled connections form a cycle in a genome that forbids them.
    Cycle,
}

impl fmt::Display for ConnectionValidityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateMarker(marker) => {
                write!(f, "duplicate connection insertion with marker {}", marker)
            }
            Self::NonexistentEndpoints(source, target) => write!(
                f,
                "connection insertion between nonexistent endpoint(s) {} -> {}",
                source, target
            ),
            Self::DuplicateEndpoints(marker, (source, target)) => write!(
                f,
                "connection insertion with endpoints {} -> {} and marker {} shadows connection with same endpoints",
                source, target, marker,
            ),
            Self::InputTarget(id) => {
                write!(f, "connection insertion targeting input node {}", id)
            }
        }
    }
}

impl fmt::Display for NodeValidityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNodeID(id) => write!(f, "duplicate node insertion with id {}", id),
        }
    }
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingConnection(marker, (source, target)) => write!(
                f,
                "connection {} references missing node(s) {} -> {}",
                marker, source, target
            ),
            Self::MisfiledConnection(key, marker) => {
                write!(f, "connection {} stored under marker {}", marker, key)
            }
            Self::DuplicateEndpoints(marker, (source, target)) => write!(
                f,
                "connection {} duplicates endpoints {} -> {}",
                marker, source, target
            ),
            Self::MissingFixedNode(id) => write!(f, "fixed input/output node {} is missing", id),
            Self::Cycle => write!(f, "enabled connections form a cycle"),
        }
    }
}

impl Error for ConnectionValidityError {}
impl Error for NodeValidityError {}
impl Error for IntegrityError {}
