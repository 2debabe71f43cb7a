//! In-memory FEA model: nodes, beams and beam property records.

use std::collections::BTreeMap;

use petgraph::graph::{EdgeIndex, Graph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::errors::ModelEditError;
use crate::geometry::Point;
use crate::section::SectionProperties;

/// 1-based ordinal position of a beam in the model.
///
/// Ordinals are contiguous from 1 to the beam count and are what every engine
/// call addresses. They are distinct from the external beam ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BeamIndex(usize);

impl BeamIndex {
    /// Wrap a 1-based ordinal.
    #[must_use]
    pub const fn new(ordinal: usize) -> Self {
        Self(ordinal)
    }

    /// The 1-based ordinal.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Graph edge holding this beam, if the ordinal is not zero.
    fn edge(self) -> Option<EdgeIndex> {
        self.0.checked_sub(1).map(EdgeIndex::new)
    }
}

/// Library material reference attached to a property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRef {
    /// Material library number.
    pub library: u32,
    /// Item number within the library.
    pub item: u32,
}

impl Default for MaterialRef {
    fn default() -> Self {
        Self {
            library: 16,
            item: 2,
        }
    }
}

/// Structural behaviour of a beam property.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeamType {
    /// Axial and torsional spring.
    Spring,
    /// Tension-only cable.
    Cable,
    /// Axial-only truss member.
    Truss,
    /// Bar with tension and compression cut-offs.
    CutOffBar,
    /// Pipe with internal pressure.
    Pipe,
    /// General beam with bending.
    #[default]
    Beam,
    /// Rigid or flexible connection.
    Connection,
    /// Contact element.
    Contact,
    /// User-defined element.
    User,
}

/// A named beam property record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// Display name as stored in the model.
    pub name: String,
    /// Structural behaviour.
    #[serde(default)]
    pub beam_type: BeamType,
    /// Library material, once assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<MaterialRef>,
    /// Cross-section, once assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<SectionProperties>,
}

impl PropertyRecord {
    /// Create a bare record with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            beam_type: BeamType::default(),
            material: None,
            section: None,
        }
    }
}

/// Internal representation of a model node.
#[derive(Clone, Debug)]
struct Node {
    /// Position of the node.
    position: Point,
}

/// Internal representation of a beam element.
#[derive(Clone, Debug)]
struct Beam {
    /// Stable external identifier.
    id: u64,
    /// Assigned property, if any.
    property: Option<u32>,
}

/// Serialised beam as stored in a model document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeamRecord {
    /// External identifier.
    pub id: u64,
    /// Zero-based node positions in [`ModelDocument::nodes`].
    pub nodes: [usize; 2],
    /// Assigned property identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<u32>,
}

/// On-disk form of a [`Model`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    /// Node positions.
    #[serde(default)]
    pub nodes: Vec<Point>,
    /// Beams in ordinal order.
    #[serde(default)]
    pub beams: Vec<BeamRecord>,
    /// Beam property records by identifier.
    #[serde(default)]
    pub properties: BTreeMap<u32, PropertyRecord>,
}

/// Container for a beam model.
#[derive(Debug, Default)]
pub struct Model {
    /// Underlying graph storage for nodes and beams.
    graph: Graph<Node, Beam>,
    /// Beam property records keyed by identifier; identifiers may be sparse.
    properties: BTreeMap<u32, PropertyRecord>,
}

impl Model {
    /// Create an empty model.
    ///
    /// # Examples
    /// ```
    /// use beamsec::Model;
    ///
    /// let model = Model::new();
    /// assert_eq!(model.beam_count(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Return the number of nodes in the model.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Return the number of beams in the model.
    #[must_use]
    pub fn beam_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Add a node to the model.
    pub fn add_node(&mut self, position: Point) -> NodeIndex {
        self.graph.add_node(Node { position })
    }

    /// Position of a node.
    #[must_use]
    pub fn node_position(&self, node: NodeIndex) -> Option<Point> {
        self.graph.node_weight(node).map(|node| node.position)
    }

    /// Connect two nodes with a new beam carrying the external `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelEditError::UnknownNode`] when either node is not part of this model.
    ///
    /// # Examples
    /// ```
    /// use beamsec::{point, Model};
    ///
    /// let mut model = Model::new();
    /// let a = model.add_node(point(0.0, 0.0, 0.0));
    /// let b = model.add_node(point(1.0, 0.0, 0.0));
    /// let beam = model.add_beam(a, b, 411).expect("nodes exist");
    /// assert_eq!(beam.get(), 1);
    /// assert_eq!(model.beam_id(beam), Ok(411));
    /// ```
    pub fn add_beam(
        &mut self,
        start: NodeIndex,
        end: NodeIndex,
        id: u64,
    ) -> Result<BeamIndex, ModelEditError> {
        for node in [start, end] {
            if self.graph.node_weight(node).is_none() {
                return Err(ModelEditError::UnknownNode(node.index()));
            }
        }
        let edge = self.graph.add_edge(start, end, Beam { id, property: None });
        Ok(BeamIndex::new(edge.index() + 1))
    }

    /// External identifier of a beam.
    ///
    /// # Errors
    ///
    /// Returns [`ModelEditError::UnknownBeam`] when `beam` is outside `1..=beam_count`.
    pub fn beam_id(&self, beam: BeamIndex) -> Result<u64, ModelEditError> {
        self.beam(beam).map(|beam| beam.id)
    }

    /// Property currently assigned to a beam.
    ///
    /// # Errors
    ///
    /// Returns [`ModelEditError::UnknownBeam`] when `beam` is outside `1..=beam_count`.
    pub fn beam_property(&self, beam: BeamIndex) -> Result<Option<u32>, ModelEditError> {
        self.beam(beam).map(|beam| beam.property)
    }

    /// Assign a property record to a beam.
    ///
    /// # Errors
    ///
    /// Returns [`ModelEditError::UnknownBeam`] when `beam` is not part of this model and
    /// [`ModelEditError::UnknownProperty`] when `property` has no record.
    pub fn set_beam_property(&mut self, beam: BeamIndex, property: u32) -> Result<(), ModelEditError> {
        let edge = beam
            .edge()
            .filter(|edge| self.graph.edge_weight(*edge).is_some())
            .ok_or(ModelEditError::UnknownBeam(beam.get()))?;
        if !self.properties.contains_key(&property) {
            return Err(ModelEditError::UnknownProperty(property));
        }
        if let Some(weight) = self.graph.edge_weight_mut(edge) {
            weight.property = Some(property);
        }
        Ok(())
    }

    /// Number of property records.
    #[must_use]
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Highest property identifier in use, or zero for none.
    #[must_use]
    pub fn highest_property(&self) -> u32 {
        self.properties.keys().next_back().copied().unwrap_or(0)
    }

    /// Look up a property record.
    #[must_use]
    pub fn property(&self, id: u32) -> Option<&PropertyRecord> {
        self.properties.get(&id)
    }

    /// Mutable access to a property record.
    ///
    /// # Errors
    ///
    /// Returns [`ModelEditError::UnknownProperty`] when `id` has no record.
    pub fn property_mut(&mut self, id: u32) -> Result<&mut PropertyRecord, ModelEditError> {
        self.properties
            .get_mut(&id)
            .ok_or(ModelEditError::UnknownProperty(id))
    }

    /// Insert a new property record under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelEditError::ZeroProperty`] for an identifier of zero and
    /// [`ModelEditError::DuplicateProperty`] when `id` is already taken.
    pub fn add_property(&mut self, id: u32, record: PropertyRecord) -> Result<(), ModelEditError> {
        if id == 0 {
            return Err(ModelEditError::ZeroProperty);
        }
        if self.properties.contains_key(&id) {
            return Err(ModelEditError::DuplicateProperty(id));
        }
        self.properties.insert(id, record);
        Ok(())
    }

    /// Remove a property record, leaving a gap in the numbering.
    ///
    /// Beams that referenced the property lose their assignment.
    ///
    /// # Errors
    ///
    /// Returns [`ModelEditError::UnknownProperty`] when `id` has no record.
    pub fn remove_property(&mut self, id: u32) -> Result<PropertyRecord, ModelEditError> {
        let record = self
            .properties
            .remove(&id)
            .ok_or(ModelEditError::UnknownProperty(id))?;
        for beam in self.graph.edge_weights_mut() {
            if beam.property == Some(id) {
                beam.property = None;
            }
        }
        Ok(record)
    }

    /// Iterate over property records in identifier order.
    pub fn properties(&self) -> impl Iterator<Item = (u32, &PropertyRecord)> {
        self.properties.iter().map(|(id, record)| (*id, record))
    }

    /// Convert the model into its on-disk form.
    #[must_use]
    pub fn to_document(&self) -> ModelDocument {
        let nodes = self
            .graph
            .node_indices()
            .map(|node| self.graph[node].position)
            .collect();
        let beams = self
            .graph
            .edge_indices()
            .filter_map(|edge| {
                let (start, end) = self.graph.edge_endpoints(edge)?;
                let beam = self.graph.edge_weight(edge)?;
                Some(BeamRecord {
                    id: beam.id,
                    nodes: [start.index(), end.index()],
                    property: beam.property,
                })
            })
            .collect();
        ModelDocument {
            nodes,
            beams,
            properties: self.properties.clone(),
        }
    }

    /// Rebuild a model from its on-disk form.
    ///
    /// # Errors
    ///
    /// Returns [`ModelEditError`] when a beam references a missing node or
    /// property, or a property uses identifier zero.
    pub fn from_document(document: ModelDocument) -> Result<Self, ModelEditError> {
        let mut model = Self::new();
        for (id, record) in document.properties {
            model.add_property(id, record)?;
        }
        let nodes: Vec<NodeIndex> = document
            .nodes
            .into_iter()
            .map(|position| model.add_node(position))
            .collect();
        for record in document.beams {
            let [start, end] = record.nodes;
            let start = *nodes.get(start).ok_or(ModelEditError::UnknownNode(start))?;
            let end = *nodes.get(end).ok_or(ModelEditError::UnknownNode(end))?;
            let beam = model.add_beam(start, end, record.id)?;
            if let Some(property) = record.property {
                model.set_beam_property(beam, property)?;
            }
        }
        Ok(model)
    }

    /// Internal beam lookup by ordinal.
    fn beam(&self, beam: BeamIndex) -> Result<&Beam, ModelEditError> {
        beam.edge()
            .and_then(|edge| self.graph.edge_weight(edge))
            .ok_or(ModelEditError::UnknownBeam(beam.get()))
    }
}
