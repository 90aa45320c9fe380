//! Boundary to the orientation-fitting pipeline
//!
//! The fitting itself lives elsewhere. This module only fixes the shape of the
//! hand-off: a reconstructor takes a voxel and returns a fitted copy plus a
//! convergence code, and [`reconstruct_in_place`] runs one over the sequence a
//! grid exposes through `voxels_mut`.

/// Pipeline-defined classification of how a fit ended.
pub type ConvergenceCode = i32;

/// Anything that can fit a single voxel.
pub trait VoxelReconstructor<V> {
    fn reconstruct_voxel(&self, voxel: &V) -> (V, ConvergenceCode);
}

/// A global reconstructor that also offers a local refinement pass.
pub trait LocalOptimizer<V> {
    /// Refine `voxel` in place starting from its current attributes.
    fn local_optimization(&self, voxel: &mut V);

    /// Judge the refined voxel against the full local search parameters.
    fn classify_convergence(&self, voxel: &V) -> ConvergenceCode;
}

/// Turns a [`LocalOptimizer`] into a reconstructor that only refines locally.
#[derive(Debug, Clone)]
pub struct LocalReconstructionAdaptor<R> {
    inner: R,
}

impl<R> LocalReconstructionAdaptor<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<V: Clone, R: LocalOptimizer<V>> VoxelReconstructor<V> for LocalReconstructionAdaptor<R> {
    fn reconstruct_voxel(&self, voxel: &V) -> (V, ConvergenceCode) {
        let mut result = voxel.clone();
        self.inner.local_optimization(&mut result);
        let code = self.inner.classify_convergence(&result);
        (result, code)
    }
}

/// Replace every voxel with its reconstruction; returns the codes in voxel order.
pub fn reconstruct_in_place<V, R>(voxels: &mut [V], reconstructor: &R) -> Vec<ConvergenceCode>
where
    R: VoxelReconstructor<V> + ?Sized,
{
    voxels
        .iter_mut()
        .map(|voxel| {
            let (fitted, code) = reconstructor.reconstruct_voxel(voxel);
            *voxel = fitted;
            code
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TriangleGrid;

    /// Bumps confidence toward 1 and reports convergence above a threshold.
    struct Nudge {
        step: f64,
    }

    impl LocalOptimizer<crate::TriangleVoxel> for Nudge {
        fn local_optimization(&self, voxel: &mut crate::TriangleVoxel) {
            voxel.confidence = (voxel.confidence + self.step).min(1.0);
        }

        fn classify_convergence(&self, voxel: &crate::TriangleVoxel) -> ConvergenceCode {
            if voxel.confidence >= 0.9 {
                0
            } else {
                1
            }
        }
    }

    #[test]
    fn test_adaptor_refines_a_copy() {
        let adaptor = LocalReconstructionAdaptor::new(Nudge { step: 0.25 });
        let input = crate::TriangleVoxel {
            confidence: 0.5,
            ..Default::default()
        };
        let (fitted, code) = adaptor.reconstruct_voxel(&input);
        assert_eq!(input.confidence, 0.5);
        assert_eq!(fitted.confidence, 0.75);
        assert_eq!(code, 1);
    }

    #[test]
    fn test_reconstruct_grid_in_place() {
        let mut grid = TriangleGrid::new();
        grid.parse("1\n0 0 0 1 0 1 0 0 0 0.25\n1 0 0 1 0 1 0 0 0 0.875\n")
            .unwrap();

        let adaptor = LocalReconstructionAdaptor::new(Nudge { step: 0.25 });
        let codes = reconstruct_in_place(grid.voxels_mut(), &adaptor);

        assert_eq!(codes, vec![1, 0]);
        assert_eq!(grid.voxels()[0].confidence, 0.5);
        assert_eq!(grid.voxels()[1].confidence, 1.0);
    }
}
