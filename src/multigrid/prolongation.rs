//! Prolongation and restriction operators between refinement levels.

use crate::Real;
use log::debug;
use nalgebra::{convert, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Parent-vertex queries for vertex-based nodal spaces.
///
/// Vertices created by refinement have exactly two parent vertices (the
/// endpoints of the bisected edge); vertices of the coarsest mesh have none.
/// Parent indices always refer to vertices introduced at a strictly earlier
/// level.
pub trait VertexHierarchy {
    /// The number of refinement levels currently recorded.
    fn num_levels(&self) -> usize;

    /// The number of vertices on the finest level.
    fn num_vertices(&self) -> usize;

    /// The two parent vertices of the given vertex, or `None` if the vertex
    /// belongs to the coarsest mesh.
    fn parent_vertices(&self, vertex: usize) -> Option<[usize; 2]>;
}

impl<H: VertexHierarchy + ?Sized> VertexHierarchy for &H {
    fn num_levels(&self) -> usize {
        H::num_levels(self)
    }

    fn num_vertices(&self) -> usize {
        H::num_vertices(self)
    }

    fn parent_vertices(&self, vertex: usize) -> Option<[usize; 2]> {
        H::parent_vertices(self, vertex)
    }
}

/// Parent-element queries for piecewise-constant (element-based) spaces.
pub trait ElementHierarchy {
    fn num_levels(&self) -> usize;

    /// The number of elements on the finest level.
    fn num_elements(&self) -> usize;

    /// The parent element of the given element. Only queried for elements
    /// created by refinement.
    fn parent_element(&self, element: usize) -> usize;
}

impl<H: ElementHierarchy + ?Sized> ElementHierarchy for &H {
    fn num_levels(&self) -> usize {
        H::num_levels(self)
    }

    fn num_elements(&self) -> usize {
        H::num_elements(self)
    }

    fn parent_element(&self, element: usize) -> usize {
        H::parent_element(self, element)
    }
}

/// A signed parent-edge relation: the parent edge index together with the
/// relative orientation of child and parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentEdge {
    pub edge: usize,
    /// Whether the child edge is oriented along the parent edge. An aligned
    /// parent contributes `+1/2`, a reversed parent `-1/2`.
    pub aligned: bool,
}

/// Parent-edge queries for oriented edge-element spaces.
pub trait EdgeHierarchy {
    fn num_levels(&self) -> usize;

    /// The number of edges on the finest level.
    fn num_edges(&self) -> usize;

    /// Up to two signed parent edges of the given edge.
    fn parent_edges(&self, edge: usize) -> [Option<ParentEdge>; 2];

    /// The finest level on which the given edge is part of the mesh. Edges with
    /// `fine_level_of_edge(e) < level` are stale on `level` and carry no degree
    /// of freedom there.
    fn fine_level_of_edge(&self, edge: usize) -> usize;
}

impl<H: EdgeHierarchy + ?Sized> EdgeHierarchy for &H {
    fn num_levels(&self) -> usize {
        H::num_levels(self)
    }

    fn num_edges(&self) -> usize {
        H::num_edges(self)
    }

    fn parent_edges(&self, edge: usize) -> [Option<ParentEdge>; 2] {
        H::parent_edges(self, edge)
    }

    fn fine_level_of_edge(&self, edge: usize) -> usize {
        H::fine_level_of_edge(self, edge)
    }
}

/// A grid-transfer operator between consecutive levels of a refinement
/// hierarchy.
///
/// `update` must be called once after every refinement of the underlying mesh;
/// it records the degree-of-freedom count of the newly created finest level.
/// The inline transfer operations mutate one global vector in place and are
/// intended to run serially, once per level transition; out-of-range level
/// arguments are a caller contract violation and panic.
pub trait Prolongation<T: Real> {
    /// Records the DOF count of the newly created finest level.
    fn update(&mut self);

    /// The number of levels recorded so far.
    fn num_levels(&self) -> usize;

    /// The number of degrees of freedom on the given level.
    fn num_dofs_at_level(&self, level: usize) -> usize;

    /// Given a vector valid on `fine_level - 1`, extends it to `fine_level` by
    /// interpolation, in place. Entries above the fine level's DOF range are
    /// zeroed.
    fn prolongate_inline(&self, fine_level: usize, vector: &mut DVector<T>);

    /// The adjoint of [`prolongate_inline`](Prolongation::prolongate_inline):
    /// scatters fine-level values onto their coarse parents, then zeroes the
    /// fine range.
    fn restrict_inline(&self, fine_level: usize, vector: &mut DVector<T>);

    /// The explicit sparse matrix form of the prolongation to `fine_level`, or
    /// `None` for operators that exist only in inline form.
    fn prolongation_matrix(&self, fine_level: usize) -> Option<CsrMatrix<T>>;
}

fn check_level_range(fine_level: usize, num_levels: usize) {
    assert!(
        fine_level >= 1 && fine_level < num_levels,
        "fine level {fine_level} out of range: {num_levels} levels recorded"
    );
}

/// Standard prolongation for vertex-based nodal spaces: each refined vertex
/// interpolates the average of its two parent vertices.
#[derive(Debug, Clone)]
pub struct LinearProlongation<H> {
    hierarchy: H,
    num_dofs_per_level: Vec<usize>,
}

impl<H: VertexHierarchy> LinearProlongation<H> {
    pub fn new(hierarchy: H) -> Self {
        Self {
            hierarchy,
            num_dofs_per_level: Vec::new(),
        }
    }
}

impl<T, H> Prolongation<T> for LinearProlongation<H>
where
    T: Real,
    H: VertexHierarchy,
{
    fn update(&mut self) {
        if self.hierarchy.num_levels() > self.num_dofs_per_level.len() {
            let num_dofs = self.hierarchy.num_vertices();
            debug!(
                "linear prolongation: recorded level {} with {} dofs",
                self.num_dofs_per_level.len(),
                num_dofs
            );
            self.num_dofs_per_level.push(num_dofs);
        }
    }

    fn num_levels(&self) -> usize {
        self.num_dofs_per_level.len()
    }

    fn num_dofs_at_level(&self, level: usize) -> usize {
        self.num_dofs_per_level[level]
    }

    fn prolongate_inline(&self, fine_level: usize, vector: &mut DVector<T>) {
        check_level_range(fine_level, self.num_dofs_per_level.len());
        let nc = self.num_dofs_per_level[fine_level - 1];
        let nf = self.num_dofs_per_level[fine_level];
        let half: T = convert(0.5);

        for i in nf..vector.len() {
            vector[i] = T::zero();
        }
        for i in nc..nf {
            let [p0, p1] = self
                .hierarchy
                .parent_vertices(i)
                .expect("refined vertex must have parent vertices");
            vector[i] = half * (vector[p0] + vector[p1]);
        }
    }

    fn restrict_inline(&self, fine_level: usize, vector: &mut DVector<T>) {
        check_level_range(fine_level, self.num_dofs_per_level.len());
        let nc = self.num_dofs_per_level[fine_level - 1];
        let nf = self.num_dofs_per_level[fine_level];
        let half: T = convert(0.5);

        for i in (nc..nf).rev() {
            let [p0, p1] = self
                .hierarchy
                .parent_vertices(i)
                .expect("refined vertex must have parent vertices");
            let contribution = half * vector[i];
            vector[p0] += contribution;
            vector[p1] += contribution;
        }
        for i in nc..vector.len() {
            vector[i] = T::zero();
        }
    }

    fn prolongation_matrix(&self, fine_level: usize) -> Option<CsrMatrix<T>> {
        check_level_range(fine_level, self.num_dofs_per_level.len());
        let nc = self.num_dofs_per_level[fine_level - 1];
        let nf = self.num_dofs_per_level[fine_level];
        let half: T = convert(0.5);

        let mut triplets = CooMatrix::new(nf, nc);
        for i in 0..nc {
            triplets.push(i, i, T::one());
        }
        for i in nc..nf {
            let [p0, p1] = self
                .hierarchy
                .parent_vertices(i)
                .expect("refined vertex must have parent vertices");
            triplets.push(i, p0, half);
            triplets.push(i, p1, half);
        }
        Some(CsrMatrix::from(&triplets))
    }
}

/// Piecewise-constant prolongation: each refined element inherits its parent
/// element's value unchanged; restriction sums children into their parent.
#[derive(Debug, Clone)]
pub struct ElementProlongation<H> {
    hierarchy: H,
    num_dofs_per_level: Vec<usize>,
}

impl<H: ElementHierarchy> ElementProlongation<H> {
    pub fn new(hierarchy: H) -> Self {
        Self {
            hierarchy,
            num_dofs_per_level: Vec::new(),
        }
    }
}

impl<T, H> Prolongation<T> for ElementProlongation<H>
where
    T: Real,
    H: ElementHierarchy,
{
    fn update(&mut self) {
        if self.hierarchy.num_levels() > self.num_dofs_per_level.len() {
            let num_dofs = self.hierarchy.num_elements();
            debug!(
                "element prolongation: recorded level {} with {} dofs",
                self.num_dofs_per_level.len(),
                num_dofs
            );
            self.num_dofs_per_level.push(num_dofs);
        }
    }

    fn num_levels(&self) -> usize {
        self.num_dofs_per_level.len()
    }

    fn num_dofs_at_level(&self, level: usize) -> usize {
        self.num_dofs_per_level[level]
    }

    fn prolongate_inline(&self, fine_level: usize, vector: &mut DVector<T>) {
        check_level_range(fine_level, self.num_dofs_per_level.len());
        let nc = self.num_dofs_per_level[fine_level - 1];
        let nf = self.num_dofs_per_level[fine_level];

        for i in nc..nf {
            let parent = self.hierarchy.parent_element(i);
            vector[i] = vector[parent];
        }
        for i in nf..vector.len() {
            vector[i] = T::zero();
        }
    }

    fn restrict_inline(&self, fine_level: usize, vector: &mut DVector<T>) {
        check_level_range(fine_level, self.num_dofs_per_level.len());
        let nc = self.num_dofs_per_level[fine_level - 1];
        let nf = self.num_dofs_per_level[fine_level];

        for i in (nc..nf).rev() {
            let parent = self.hierarchy.parent_element(i);
            let contribution = vector[i];
            vector[parent] += contribution;
            vector[i] = T::zero();
        }
        for i in nf..vector.len() {
            vector[i] = T::zero();
        }
    }

    fn prolongation_matrix(&self, _fine_level: usize) -> Option<CsrMatrix<T>> {
        None
    }
}

/// The number of relaxation sweeps applied by the edge prolongation.
///
/// A fine edge may not be a simple combination of only its immediate parents:
/// parent chains can span several tree levels within one refinement step, and
/// one sweep resolves one tree level. The count bounds the supported tree
/// depth; it is not a convergence criterion.
const PARENT_SWEEP_COUNT: usize = 10;

/// Prolongation for oriented edge elements: each fine edge receives `±1/2` of
/// up to two parent edges, the sign given by the stored relative orientation.
#[derive(Debug, Clone)]
pub struct EdgeProlongation<H> {
    hierarchy: H,
    num_dofs_per_level: Vec<usize>,
}

impl<H: EdgeHierarchy> EdgeProlongation<H> {
    pub fn new(hierarchy: H) -> Self {
        Self {
            hierarchy,
            num_dofs_per_level: Vec::new(),
        }
    }

    fn signed_contribution<T: Real>(parent: ParentEdge, value: T) -> T {
        let half: T = convert(0.5);
        if parent.aligned {
            half * value
        } else {
            -half * value
        }
    }
}

impl<T, H> Prolongation<T> for EdgeProlongation<H>
where
    T: Real,
    H: EdgeHierarchy,
{
    fn update(&mut self) {
        if self.hierarchy.num_levels() > self.num_dofs_per_level.len() {
            let num_dofs = self.hierarchy.num_edges();
            debug!(
                "edge prolongation: recorded level {} with {} dofs",
                self.num_dofs_per_level.len(),
                num_dofs
            );
            self.num_dofs_per_level.push(num_dofs);
        }
    }

    fn num_levels(&self) -> usize {
        self.num_dofs_per_level.len()
    }

    fn num_dofs_at_level(&self, level: usize) -> usize {
        self.num_dofs_per_level[level]
    }

    fn prolongate_inline(&self, fine_level: usize, vector: &mut DVector<T>) {
        check_level_range(fine_level, self.num_dofs_per_level.len());
        let nc = self.num_dofs_per_level[fine_level - 1];
        let nf = self.num_dofs_per_level[fine_level];

        for i in nf..vector.len() {
            vector[i] = T::zero();
        }
        for _ in 0..PARENT_SWEEP_COUNT {
            for i in nc..nf {
                let mut value = T::zero();
                for parent in self.hierarchy.parent_edges(i).into_iter().flatten() {
                    value += Self::signed_contribution(parent, vector[parent.edge]);
                }
                vector[i] = value;
            }
        }
        for i in 0..nf {
            if self.hierarchy.fine_level_of_edge(i) < fine_level {
                vector[i] = T::zero();
            }
        }
    }

    fn restrict_inline(&self, fine_level: usize, vector: &mut DVector<T>) {
        check_level_range(fine_level, self.num_dofs_per_level.len());
        let nc = self.num_dofs_per_level[fine_level - 1];
        let nf = self.num_dofs_per_level[fine_level];

        for i in 0..nf {
            if self.hierarchy.fine_level_of_edge(i) < fine_level {
                vector[i] = T::zero();
            }
        }
        for _ in 0..PARENT_SWEEP_COUNT {
            for i in (nc..nf).rev() {
                let value = vector[i];
                for parent in self.hierarchy.parent_edges(i).into_iter().flatten() {
                    vector[parent.edge] += Self::signed_contribution(parent, value);
                }
                vector[i] = T::zero();
            }
        }
        for i in nf..vector.len() {
            vector[i] = T::zero();
        }
    }

    fn prolongation_matrix(&self, _fine_level: usize) -> Option<CsrMatrix<T>> {
        None
    }
}

/// Product-space prolongation, delegating to one sub-prolongation per subspace.
///
/// On every level the combined DOF range is partitioned into consecutive
/// blocks, one per subspace, in the order the sub-prolongations were added;
/// each sub-prolongation acts only on its own block.
pub struct CompoundProlongation<T> {
    components: Vec<Box<dyn Prolongation<T>>>,
}

impl<T: Real> CompoundProlongation<T> {
    pub fn new() -> Self {
        Self { components: Vec::new() }
    }

    pub fn add_prolongation(&mut self, prolongation: Box<dyn Prolongation<T>>) {
        self.components.push(prolongation);
    }

    /// DOF offsets of each component's block at the given level, plus the total
    /// as the final entry.
    fn level_offsets(&self, level: usize) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.components.len() + 1);
        let mut total = 0;
        offsets.push(0);
        for component in &self.components {
            total += component.num_dofs_at_level(level);
            offsets.push(total);
        }
        offsets
    }
}

impl<T: Real> Default for CompoundProlongation<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Real> Prolongation<T> for CompoundProlongation<T> {
    fn update(&mut self) {
        for component in &mut self.components {
            component.update();
        }
    }

    fn num_levels(&self) -> usize {
        self.components
            .iter()
            .map(|component| component.num_levels())
            .min()
            .unwrap_or(0)
    }

    fn num_dofs_at_level(&self, level: usize) -> usize {
        self.components
            .iter()
            .map(|component| component.num_dofs_at_level(level))
            .sum()
    }

    fn prolongate_inline(&self, fine_level: usize, vector: &mut DVector<T>) {
        check_level_range(fine_level, Prolongation::<T>::num_levels(self));
        let coarse_offsets = self.level_offsets(fine_level - 1);
        let fine_offsets = self.level_offsets(fine_level);
        let total_fine = *fine_offsets.last().expect("offsets are never empty");

        // Components are processed back to front: a component's fine block
        // never overlaps the (still unread) coarse blocks of components that
        // precede it.
        for (k, component) in self.components.iter().enumerate().rev() {
            let nc = coarse_offsets[k + 1] - coarse_offsets[k];
            let nf = fine_offsets[k + 1] - fine_offsets[k];
            let mut block = DVector::zeros(nf);
            for j in 0..nc {
                block[j] = vector[coarse_offsets[k] + j];
            }
            component.prolongate_inline(fine_level, &mut block);
            for j in 0..nf {
                vector[fine_offsets[k] + j] = block[j];
            }
        }
        for i in total_fine..vector.len() {
            vector[i] = T::zero();
        }
    }

    fn restrict_inline(&self, fine_level: usize, vector: &mut DVector<T>) {
        check_level_range(fine_level, Prolongation::<T>::num_levels(self));
        let coarse_offsets = self.level_offsets(fine_level - 1);
        let fine_offsets = self.level_offsets(fine_level);
        let total_coarse = *coarse_offsets.last().expect("offsets are never empty");

        // Front to back: a component's coarse block never overlaps the (still
        // unread) fine blocks of components that follow it.
        for (k, component) in self.components.iter().enumerate() {
            let nc = coarse_offsets[k + 1] - coarse_offsets[k];
            let nf = fine_offsets[k + 1] - fine_offsets[k];
            let mut block = DVector::zeros(nf);
            for j in 0..nf {
                block[j] = vector[fine_offsets[k] + j];
            }
            component.restrict_inline(fine_level, &mut block);
            for j in 0..nc {
                vector[coarse_offsets[k] + j] = block[j];
            }
        }
        for i in total_coarse..vector.len() {
            vector[i] = T::zero();
        }
    }

    fn prolongation_matrix(&self, _fine_level: usize) -> Option<CsrMatrix<T>> {
        None
    }
}
